//! Capture trigger: the process-wide capture tool and decision provider,
//! and the per-frame start/stop protocol built on them.

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::binding::DevicePointer;
use crate::capture::{CaptureTool, RenderDocTool, configure_tool};
use crate::config::LayerConfig;
use crate::decision::{AlwaysProceed, DecisionProvider, load_provider};
use crate::registry::SessionRecord;
use crate::xr::Session;

/// The optional collaborators a context drives captures with.
#[derive(Clone)]
pub struct CaptureTrigger {
    tool: Option<Arc<dyn CaptureTool>>,
    provider: Arc<dyn DecisionProvider>,
    launch_viewer: bool,
}

impl CaptureTrigger {
    pub fn new(
        tool: Option<Arc<dyn CaptureTool>>,
        provider: Arc<dyn DecisionProvider>,
        launch_viewer: bool,
    ) -> Self {
        Self {
            tool,
            provider,
            launch_viewer,
        }
    }

    /// A trigger with no capture tool; frames are counted but never captured.
    pub fn disabled() -> Self {
        Self::new(None, Arc::new(AlwaysProceed), false)
    }

    /// Load the capture tool and decision provider named by `config`.
    ///
    /// Either may be missing; that is logged and the trigger degrades.
    pub fn load(config: &LayerConfig) -> Self {
        let tool: Option<Arc<dyn CaptureTool>> = match RenderDocTool::load(&config.capture) {
            Ok(tool) => {
                configure_tool(&tool, &config.capture);
                Some(Arc::new(tool))
            }
            Err(e) => {
                info!("capture disabled: {e}");
                None
            }
        };
        let provider = load_provider(&config.decision);
        Self::new(tool, provider, config.capture.launch_viewer)
    }

    pub fn tool(&self) -> Option<&Arc<dyn CaptureTool>> {
        self.tool.as_ref()
    }

    pub fn provider(&self) -> &Arc<dyn DecisionProvider> {
        &self.provider
    }

    pub fn has_tool(&self) -> bool {
        self.tool.is_some()
    }

    /// Frame-begin half: ask the provider and start a capture on proceed.
    ///
    /// Returns `true` if a capture was started. A record without a device
    /// never captures and the provider is not consulted.
    pub fn on_frame_begin(&self, session: Session, record: &SessionRecord) -> bool {
        let Some(tool) = &self.tool else {
            return false;
        };
        if !record.has_device() {
            return false;
        }

        let decision = self.provider.decide(session, record.frame);
        if !decision.is_proceed() {
            trace!("session {session} frame {}: {decision:?}", record.frame);
            return false;
        }

        debug!("capturing session {session} frame {} on {}", record.frame, record.device);
        tool.start_capture(record.device);
        true
    }

    /// Frame-end half: finish an in-progress capture and open the viewer if
    /// nothing is attached yet.
    ///
    /// Returns `true` if a capture was ended.
    pub fn on_frame_end(&self, session: Session, record: &SessionRecord) -> bool {
        let Some(tool) = &self.tool else {
            return false;
        };
        if !tool.is_capturing() {
            return false;
        }

        let written = tool.end_capture(record.device);
        debug!("session {session} frame {}: capture ended (written: {written})", record.frame);

        if self.launch_viewer && !tool.is_ui_attached() {
            if tool.launch_viewer() {
                info!("launched capture viewer");
            } else {
                debug!("capture viewer could not be launched");
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::capture::CaptureKey;
    use crate::decision::Decision;
    use crate::error::LayerError;

    #[derive(Default)]
    struct RecordingTool {
        calls: Mutex<Vec<String>>,
        capturing: Mutex<bool>,
        ui_attached: bool,
    }

    impl CaptureTool for RecordingTool {
        fn start_capture(&self, device: DevicePointer) {
            *self.capturing.lock().unwrap() = true;
            self.calls.lock().unwrap().push(format!("start {device}"));
        }
        fn end_capture(&self, device: DevicePointer) -> bool {
            *self.capturing.lock().unwrap() = false;
            self.calls.lock().unwrap().push(format!("end {device}"));
            true
        }
        fn is_capturing(&self) -> bool {
            *self.capturing.lock().unwrap()
        }
        fn is_ui_attached(&self) -> bool {
            self.ui_attached
        }
        fn launch_viewer(&self) -> bool {
            self.calls.lock().unwrap().push("viewer".into());
            true
        }
        fn set_capture_keys(&self, _keys: &[CaptureKey]) {}
        fn set_capture_title(&self, _title: &str) {}
    }

    struct Fixed(Decision);

    impl DecisionProvider for Fixed {
        fn decide(&self, _session: Session, _frame: u64) -> Decision {
            self.0
        }
        fn set_option(&self, index: u32, _value: bool) -> Result<(), LayerError> {
            Err(LayerError::InvalidOption(index))
        }
    }

    fn record(device: usize, frame: u64) -> SessionRecord {
        SessionRecord {
            device: DevicePointer::from_ptr(device as *const std::ffi::c_void),
            frame,
        }
    }

    fn trigger(tool: &Arc<RecordingTool>, decision: Decision, launch: bool) -> CaptureTrigger {
        CaptureTrigger::new(Some(tool.clone() as Arc<dyn CaptureTool>), Arc::new(Fixed(decision)), launch)
    }

    #[test]
    fn proceed_starts_capture_on_device() {
        let tool = Arc::new(RecordingTool::default());
        let t = trigger(&tool, Decision::Proceed, true);
        assert!(t.on_frame_begin(Session::from_raw(1), &record(0x1000, 0)));
        assert_eq!(*tool.calls.lock().unwrap(), vec!["start 0x1000".to_string()]);
    }

    #[test]
    fn skip_and_cancel_start_nothing() {
        for decision in [Decision::Skip, Decision::Cancelled] {
            let tool = Arc::new(RecordingTool::default());
            let t = trigger(&tool, decision, true);
            assert!(!t.on_frame_begin(Session::from_raw(1), &record(0x1000, 3)));
            assert!(tool.calls.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn null_device_never_captures() {
        let tool = Arc::new(RecordingTool::default());
        let t = trigger(&tool, Decision::Proceed, true);
        assert!(!t.on_frame_begin(Session::from_raw(1), &record(0, 0)));
        assert!(tool.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn end_launches_viewer_without_ui() {
        let tool = Arc::new(RecordingTool::default());
        let t = trigger(&tool, Decision::Proceed, true);
        let rec = record(0x2000, 0);
        t.on_frame_begin(Session::from_raw(1), &rec);
        assert!(t.on_frame_end(Session::from_raw(1), &rec));
        assert_eq!(
            *tool.calls.lock().unwrap(),
            vec!["start 0x2000".to_string(), "end 0x2000".into(), "viewer".into()]
        );
    }

    #[test]
    fn end_skips_viewer_when_attached_or_disabled() {
        let attached = Arc::new(RecordingTool {
            ui_attached: true,
            ..RecordingTool::default()
        });
        let t = trigger(&attached, Decision::Proceed, true);
        let rec = record(0x2000, 0);
        t.on_frame_begin(Session::from_raw(1), &rec);
        t.on_frame_end(Session::from_raw(1), &rec);
        assert!(!attached.calls.lock().unwrap().contains(&"viewer".to_string()));

        let tool = Arc::new(RecordingTool::default());
        let t = trigger(&tool, Decision::Proceed, false);
        t.on_frame_begin(Session::from_raw(1), &rec);
        t.on_frame_end(Session::from_raw(1), &rec);
        assert!(!tool.calls.lock().unwrap().contains(&"viewer".to_string()));
    }

    #[test]
    fn end_without_capture_does_nothing() {
        let tool = Arc::new(RecordingTool::default());
        let t = trigger(&tool, Decision::Proceed, true);
        assert!(!t.on_frame_end(Session::from_raw(1), &record(0x2000, 0)));
        assert!(tool.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn disabled_trigger_is_inert() {
        let t = CaptureTrigger::disabled();
        assert!(!t.has_tool());
        assert!(!t.on_frame_begin(Session::from_raw(1), &record(0x1000, 0)));
        assert!(!t.on_frame_end(Session::from_raw(1), &record(0x1000, 0)));
    }
}
