//! Per-instance layer state and the behaviour behind each hook.
//!
//! A [`LayerContext`] is built once `xrCreateApiLayerInstance` succeeds. It
//! owns everything a hook needs: the interceptor, the runtime's entry
//! points, the session registry and the capture trigger. The exported
//! trampolines only look the active context up and call into it.

use std::ffi::c_char;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::binding::device_from_chain;
use crate::instance::RuntimeDispatch;
use crate::interceptor::Interceptor;
use crate::registry::{SessionRecord, SessionRegistry};
use crate::trigger::CaptureTrigger;
use crate::xr::{
    FrameBeginInfo, FrameEndInfo, Instance, Session, SessionCreateInfo, XrResult, pfn,
};

pub struct LayerContext {
    instance: Instance,
    interceptor: Interceptor,
    dispatch: RuntimeDispatch,
    registry: Mutex<SessionRegistry>,
    trigger: CaptureTrigger,
}

impl LayerContext {
    pub fn new(
        instance: Instance,
        interceptor: Interceptor,
        dispatch: RuntimeDispatch,
        trigger: CaptureTrigger,
    ) -> Self {
        info!(
            "layer active for instance {instance} (capture tool: {})",
            if trigger.has_tool() { "loaded" } else { "absent" }
        );
        Self {
            instance,
            interceptor,
            dispatch,
            registry: Mutex::new(SessionRegistry::new()),
            trigger,
        }
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn trigger(&self) -> &CaptureTrigger {
        &self.trigger
    }

    /// Snapshot of a session's record.
    pub fn session(&self, session: Session) -> Option<SessionRecord> {
        self.registry().get(session).copied()
    }

    pub fn session_count(&self) -> usize {
        self.registry().len()
    }

    /// Take over the sessions `previous` tracks, so they keep counting
    /// frames once this context is the active one.
    pub fn adopt_sessions(&self, previous: &LayerContext) -> usize {
        let mut taken = std::mem::take(&mut *previous.registry());
        self.registry().absorb(&mut taken)
    }

    fn registry(&self) -> MutexGuard<'_, SessionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Hooks ────────────────────────────────────────────────────

    /// `xrGetInstanceProcAddr`.
    ///
    /// # Safety
    ///
    /// See [`Interceptor::get_instance_proc_addr`].
    pub unsafe fn get_instance_proc_addr(
        &self,
        instance: Instance,
        name: *const c_char,
        function: *mut Option<pfn::VoidFunction>,
    ) -> XrResult {
        unsafe { self.interceptor.get_instance_proc_addr(instance, name, function) }
    }

    /// `xrCreateSession`: delegate, then record the session's device.
    ///
    /// # Safety
    ///
    /// Arguments are the application's and must satisfy the OpenXR contract
    /// for `xrCreateSession`.
    pub unsafe fn create_session(
        &self,
        instance: Instance,
        create_info: *const SessionCreateInfo,
        session: *mut Session,
    ) -> XrResult {
        let create = match self.dispatch.create_session() {
            Ok(create) => create,
            Err(e) => return e.xr_result(),
        };

        let result = unsafe { create(instance, create_info, session) };
        if result != XrResult::SUCCESS || session.is_null() || create_info.is_null() {
            return result;
        }

        let chain = unsafe { (*create_info).next };
        if chain.is_null() {
            debug!("session created without a graphics binding; not tracked");
            return result;
        }

        let handle = unsafe { *session };
        let device = unsafe { device_from_chain(chain) };
        self.registry().register(handle, device);
        debug!("session {handle} registered (device {device})");
        result
    }

    /// `xrDestroySession`: forget the session, then delegate.
    pub fn destroy_session(&self, session: Session) -> XrResult {
        if self.registry().remove(session).is_some() {
            debug!("session {session} unregistered");
        }

        match self.dispatch.destroy_session() {
            Ok(destroy) => unsafe { destroy(session) },
            Err(e) => e.xr_result(),
        }
    }

    /// `xrBeginFrame`: maybe start a capture, count the frame, delegate.
    ///
    /// # Safety
    ///
    /// `frame_begin_info` is passed through to the runtime unchanged.
    pub unsafe fn begin_frame(
        &self,
        session: Session,
        frame_begin_info: *const FrameBeginInfo,
    ) -> XrResult {
        let begin = match self.dispatch.begin_frame() {
            Ok(begin) => begin,
            Err(e) => return e.xr_result(),
        };

        // The lock is released while the provider and the tool run.
        if let Some(record) = self.session(session) {
            self.trigger.on_frame_begin(session, &record);
            self.registry().advance_frame(session);
        }

        unsafe { begin(session, frame_begin_info) }
    }

    /// `xrEndFrame`: finish a capture in progress, delegate.
    ///
    /// # Safety
    ///
    /// `frame_end_info` is passed through to the runtime unchanged.
    pub unsafe fn end_frame(&self, session: Session, frame_end_info: *const FrameEndInfo) -> XrResult {
        let end = match self.dispatch.end_frame() {
            Ok(end) => end,
            Err(e) => return e.xr_result(),
        };

        if let Some(record) = self.session(session) {
            self.trigger.on_frame_end(session, &record);
        }

        unsafe { end(session, frame_end_info) }
    }
}
