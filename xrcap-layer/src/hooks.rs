//! `extern "system"` trampolines handed to the loader.
//!
//! Each one looks up the active context and forwards to it. Without a
//! context, instance creation has not completed: the resolver reports an
//! invalid handle and the hooks a runtime failure.

use std::ffi::c_char;

use tracing::warn;
use xrcap_core::loader::ApiLayerCreateInfo;
use xrcap_core::xr::{FrameBeginInfo, FrameEndInfo, InstanceCreateInfo, SessionCreateInfo, pfn};
use xrcap_core::{
    HookTable, Instance, Interceptor, LayerContext, LayerEntryPoints, RuntimeDispatch, Session,
    XrResult, create_down_chain,
};

use crate::state;

pub const HOOKS: HookTable = HookTable {
    create_session: xrcap_create_session,
    destroy_session: xrcap_destroy_session,
    begin_frame: xrcap_begin_frame,
    end_frame: xrcap_end_frame,
};

pub const ENTRY_POINTS: LayerEntryPoints = LayerEntryPoints {
    get_instance_proc_addr: xrcap_get_instance_proc_addr,
    create_api_layer_instance: xrcap_create_api_layer_instance,
};

// ── Loader-facing ────────────────────────────────────────────────

unsafe extern "system" fn xrcap_get_instance_proc_addr(
    instance: Instance,
    name: *const c_char,
    function: *mut Option<pfn::VoidFunction>,
) -> XrResult {
    match state::active() {
        Some(ctx) => unsafe { ctx.get_instance_proc_addr(instance, name, function) },
        None => XrResult::ERROR_HANDLE_INVALID,
    }
}

unsafe extern "system" fn xrcap_create_api_layer_instance(
    info: *const InstanceCreateInfo,
    layer_info: *const ApiLayerCreateInfo,
    instance: *mut Instance,
) -> XrResult {
    let chained = match unsafe { create_down_chain(info, layer_info, instance) } {
        Ok(chained) => chained,
        Err(e) => {
            warn!("xrCreateApiLayerInstance: {e}");
            return e.xr_result();
        }
    };
    if chained.result != XrResult::SUCCESS || instance.is_null() {
        return chained.result;
    }

    let instance = unsafe { *instance };
    let dispatch = unsafe { RuntimeDispatch::resolve(chained.next_resolver, instance) };
    let interceptor = Interceptor::new(HOOKS, Some(chained.next_resolver));
    state::publish(LayerContext::new(instance, interceptor, dispatch, state::trigger()));

    chained.result
}

// ── Hooks ────────────────────────────────────────────────────────

unsafe extern "system" fn xrcap_create_session(
    instance: Instance,
    create_info: *const SessionCreateInfo,
    session: *mut Session,
) -> XrResult {
    match state::active() {
        Some(ctx) => unsafe { ctx.create_session(instance, create_info, session) },
        None => XrResult::ERROR_RUNTIME_FAILURE,
    }
}

unsafe extern "system" fn xrcap_destroy_session(session: Session) -> XrResult {
    match state::active() {
        Some(ctx) => ctx.destroy_session(session),
        None => XrResult::ERROR_RUNTIME_FAILURE,
    }
}

unsafe extern "system" fn xrcap_begin_frame(
    session: Session,
    frame_begin_info: *const FrameBeginInfo,
) -> XrResult {
    match state::active() {
        Some(ctx) => unsafe { ctx.begin_frame(session, frame_begin_info) },
        None => XrResult::ERROR_RUNTIME_FAILURE,
    }
}

unsafe extern "system" fn xrcap_end_frame(
    session: Session,
    frame_end_info: *const FrameEndInfo,
) -> XrResult {
    match state::active() {
        Some(ctx) => unsafe { ctx.end_frame(session, frame_end_info) },
        None => XrResult::ERROR_RUNTIME_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_without_instance_is_invalid_handle() {
        let mut function = None;
        let result = unsafe {
            xrcap_get_instance_proc_addr(Instance::NULL, c"xrEndFrame".as_ptr(), &mut function)
        };
        assert_eq!(result, XrResult::ERROR_HANDLE_INVALID);
        assert!(function.is_none());
    }

    #[test]
    fn hooks_without_instance_fail() {
        assert_eq!(
            unsafe { xrcap_begin_frame(Session::from_raw(1), std::ptr::null()) },
            XrResult::ERROR_RUNTIME_FAILURE
        );
        assert_eq!(
            unsafe { xrcap_destroy_session(Session::from_raw(1)) },
            XrResult::ERROR_RUNTIME_FAILURE
        );
    }

    #[test]
    fn instance_creation_without_chain_fails() {
        let mut instance = Instance::NULL;
        let result = unsafe {
            xrcap_create_api_layer_instance(std::ptr::null(), std::ptr::null(), &mut instance)
        };
        assert_eq!(result, XrResult::ERROR_INITIALIZATION_FAILED);
        assert!(state::active().is_none());
    }
}
