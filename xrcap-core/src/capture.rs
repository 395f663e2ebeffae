//! Capture-tool contract and its RenderDoc implementation.
//!
//! The layer only ever talks to the tool through [`CaptureTool`]; the
//! RenderDoc in-application API is one implementation, resolved once per
//! process from `RENDERDOC_GetAPI`. Tests substitute their own.

use std::ffi::{CString, c_int, c_void};
use std::ptr::{self, NonNull};

use libloading::Library;
use renderdoc_sys as rd;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::binding::DevicePointer;
use crate::config::CaptureConfig;
use crate::error::LayerError;
use crate::library;

/// Operations the capture trigger needs from a frame-capture tool.
pub trait CaptureTool: Send + Sync {
    /// Begin capturing on `device` (all windows).
    fn start_capture(&self, device: DevicePointer);

    /// Finish the capture on `device`. Returns `true` if a capture was written.
    fn end_capture(&self, device: DevicePointer) -> bool;

    /// Whether a frame capture is in progress.
    fn is_capturing(&self) -> bool;

    /// Whether an external UI is connected to this process.
    fn is_ui_attached(&self) -> bool;

    /// Launch the viewer asynchronously, connected back to this process.
    fn launch_viewer(&self) -> bool;

    fn set_capture_keys(&self, keys: &[CaptureKey]);

    fn set_capture_title(&self, title: &str);
}

/// Apply the configured hotkeys and title to a freshly loaded tool.
pub fn configure_tool(tool: &dyn CaptureTool, config: &CaptureConfig) {
    if !config.hotkeys.is_empty() {
        tool.set_capture_keys(&config.hotkeys);
    }
    if !config.title.is_empty() {
        tool.set_capture_title(&config.title);
    }
}

// ── CaptureKey ───────────────────────────────────────────────────

/// Keys that can be bound as in-application capture triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureKey {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDn,
    Backspace,
    Tab,
    PrtScrn,
    Pause,
}

impl CaptureKey {
    /// The `RENDERDOC_InputButton` code for this key.
    pub fn renderdoc_code(self) -> rd::RENDERDOC_InputButton {
        match self {
            Self::F1 => rd::eRENDERDOC_Key_F1,
            Self::F2 => rd::eRENDERDOC_Key_F2,
            Self::F3 => rd::eRENDERDOC_Key_F3,
            Self::F4 => rd::eRENDERDOC_Key_F4,
            Self::F5 => rd::eRENDERDOC_Key_F5,
            Self::F6 => rd::eRENDERDOC_Key_F6,
            Self::F7 => rd::eRENDERDOC_Key_F7,
            Self::F8 => rd::eRENDERDOC_Key_F8,
            Self::F9 => rd::eRENDERDOC_Key_F9,
            Self::F10 => rd::eRENDERDOC_Key_F10,
            Self::F11 => rd::eRENDERDOC_Key_F11,
            Self::F12 => rd::eRENDERDOC_Key_F12,
            Self::Home => rd::eRENDERDOC_Key_Home,
            Self::End => rd::eRENDERDOC_Key_End,
            Self::Insert => rd::eRENDERDOC_Key_Insert,
            Self::Delete => rd::eRENDERDOC_Key_Delete,
            Self::PageUp => rd::eRENDERDOC_Key_PageUp,
            Self::PageDn => rd::eRENDERDOC_Key_PageDn,
            Self::Backspace => rd::eRENDERDOC_Key_Backspace,
            Self::Tab => rd::eRENDERDOC_Key_Tab,
            Self::PrtScrn => rd::eRENDERDOC_Key_PrtScrn,
            Self::Pause => rd::eRENDERDOC_Key_Pause,
        }
    }
}

// ── RenderDoc ────────────────────────────────────────────────────

const RENDERDOC_GET_API: &str = "RENDERDOC_GetAPI";

/// Signature of `RENDERDOC_GetAPI`.
pub type GetApiFn =
    unsafe extern "C" fn(version: rd::RENDERDOC_Version, out_api: *mut *mut c_void) -> c_int;

/// RenderDoc's in-application API, loaded from `renderdoc.dll` /
/// `librenderdoc.so`.
///
/// The table is requested at version 1.0.0, so only 1.0.0 fields are read
/// unconditionally. `SetCaptureTitle` is used only when the library reports
/// 1.6 or newer.
pub struct RenderDocTool {
    api: NonNull<rd::RENDERDOC_API_1_6_0>,
    version: (i32, i32, i32),
    // Keeps the table's code mapped; never unloaded.
    _library: Library,
}

// SAFETY: the table is immutable static data inside the RenderDoc module,
// and RenderDoc's in-application API is callable from any thread.
unsafe impl Send for RenderDocTool {}
unsafe impl Sync for RenderDocTool {}

impl RenderDocTool {
    /// Locate RenderDoc and fetch its API table.
    pub fn load(config: &CaptureConfig) -> Result<Self, LayerError> {
        let library = library::open_library(&config.library_name, &config.library_path)?;
        let get_api: GetApiFn =
            unsafe { library::resolve(&library, &config.library_name, RENDERDOC_GET_API)? };
        unsafe { Self::from_get_api(get_api, &config.library_name, library) }
    }

    /// Fetch the 1.0.0 table from an already resolved `RENDERDOC_GetAPI`.
    ///
    /// # Safety
    ///
    /// `get_api` must stay callable while `library` is alive, and a table it
    /// hands out must remain valid for as long, with every field beyond the
    /// reported version either absent or callable.
    pub unsafe fn from_get_api(
        get_api: GetApiFn,
        label: &str,
        library: Library,
    ) -> Result<Self, LayerError> {
        let mut table: *mut c_void = ptr::null_mut();
        let ret = unsafe { get_api(rd::eRENDERDOC_API_Version_1_0_0, &mut table) };
        let api = match NonNull::new(table.cast::<rd::RENDERDOC_API_1_6_0>()) {
            Some(api) if ret == 1 => api,
            _ => {
                return Err(LayerError::ApiVersionRejected {
                    library: label.to_string(),
                    version: rd::eRENDERDOC_API_Version_1_0_0,
                });
            }
        };

        let mut tool = Self {
            api,
            version: (1, 0, 0),
            _library: library,
        };
        tool.version = tool.query_version();
        let (major, minor, patch) = tool.version;
        info!("RenderDoc API {major}.{minor}.{patch} available");
        Ok(tool)
    }

    /// Version reported by the loaded library.
    pub fn api_version(&self) -> (i32, i32, i32) {
        self.version
    }

    fn table(&self) -> &rd::RENDERDOC_API_1_6_0 {
        // SAFETY: RenderDoc hands out a pointer to a static table; callers
        // only read fields present in the version checked for them.
        unsafe { self.api.as_ref() }
    }

    fn query_version(&self) -> (i32, i32, i32) {
        let (mut major, mut minor, mut patch) = (1, 0, 0);
        if let Some(get_version) = self.table().GetAPIVersion {
            unsafe { get_version(&mut major, &mut minor, &mut patch) };
        }
        (major, minor, patch)
    }

    fn supports(&self, major: i32, minor: i32) -> bool {
        (self.version.0, self.version.1) >= (major, minor)
    }
}

impl CaptureTool for RenderDocTool {
    fn start_capture(&self, device: DevicePointer) {
        if let Some(start) = self.table().StartFrameCapture {
            unsafe { start(device.as_ptr(), ptr::null_mut()) };
        }
    }

    fn end_capture(&self, device: DevicePointer) -> bool {
        match self.table().EndFrameCapture {
            Some(end) => unsafe { end(device.as_ptr(), ptr::null_mut()) == 1 },
            None => false,
        }
    }

    fn is_capturing(&self) -> bool {
        match self.table().IsFrameCapturing {
            Some(is_capturing) => unsafe { is_capturing() == 1 },
            None => false,
        }
    }

    fn is_ui_attached(&self) -> bool {
        // SAFETY: both union members share one signature.
        match unsafe { self.table().__bindgen_anon_4.IsTargetControlConnected } {
            Some(connected) => unsafe { connected() == 1 },
            None => false,
        }
    }

    fn launch_viewer(&self) -> bool {
        let Some(launch) = self.table().LaunchReplayUI else {
            return false;
        };
        let pid = unsafe { launch(1, c"".as_ptr()) };
        debug!("replay UI launched (pid {pid})");
        pid != 0
    }

    fn set_capture_keys(&self, keys: &[CaptureKey]) {
        let Some(set_keys) = self.table().SetCaptureKeys else {
            return;
        };
        let mut codes: Vec<rd::RENDERDOC_InputButton> =
            keys.iter().map(|k| k.renderdoc_code()).collect();
        unsafe { set_keys(codes.as_mut_ptr(), codes.len() as c_int) };
        info!("capture keys: {keys:?}");
    }

    fn set_capture_title(&self, title: &str) {
        if !self.supports(1, 6) {
            debug!("RenderDoc API too old for capture titles");
            return;
        }
        let Some(set_title) = self.table().SetCaptureTitle else {
            return;
        };
        match CString::new(title) {
            Ok(title) => unsafe { set_title(title.as_ptr()) },
            Err(_) => warn!("capture title contains a NUL byte; not set"),
        }
    }
}
