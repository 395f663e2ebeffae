//! # xrcap-control
//!
//! Default decision provider for the xrcap layer, loaded by it at instance
//! creation through `LAYER_CONTROLL_GetAPI`.
//!
//! On Windows every capture is confirmed with a Yes/No/Cancel message box
//! (see [`xrcap_core::ConfirmationGate`]). Elsewhere there is no dialog and
//! every frame proceeds.

use std::ffi::c_void;
use std::sync::OnceLock;

use tracing::debug;
use xrcap_core::decision::{LayerControlApi, LayerOption, LayerResult, LayerVersion, session_from_ffi};
use xrcap_core::DecisionProvider;

pub mod prompt;

// ── Provider ─────────────────────────────────────────────────────

#[cfg(target_os = "windows")]
fn new_provider() -> Box<dyn DecisionProvider> {
    Box::new(xrcap_core::ConfirmationGate::new(prompt::MessageBoxPrompt))
}

#[cfg(not(target_os = "windows"))]
fn new_provider() -> Box<dyn DecisionProvider> {
    Box::new(xrcap_core::AlwaysProceed)
}

static PROVIDER: OnceLock<Box<dyn DecisionProvider>> = OnceLock::new();

fn provider() -> &'static dyn DecisionProvider {
    PROVIDER.get_or_init(new_provider).as_ref()
}

// ── Control table ────────────────────────────────────────────────

unsafe extern "C" fn should_capture_frame(session: *const c_void, frame: u64) -> LayerResult {
    provider()
        .decide(session_from_ffi(session), frame)
        .to_layer_result()
}

unsafe extern "C" fn set_option_bool(option: LayerOption, value: bool) -> LayerResult {
    match provider().set_option(option.0, value) {
        Ok(()) => {
            debug!("option {} = {value}", option.0);
            LayerResult::SUCCESS
        }
        Err(_) => LayerResult::INVALID_OPTION,
    }
}

static API: LayerControlApi = LayerControlApi {
    should_capture_frame,
    set_option_bool,
};

/// Hand out the control table for `version`.
///
/// # Safety
///
/// `out_api` must be null or valid for a pointer write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LAYER_CONTROLL_GetAPI(
    version: LayerVersion,
    out_api: *mut *mut c_void,
) -> LayerResult {
    if out_api.is_null() || version != LayerVersion::V1_0_0 {
        return LayerResult::INVALID_API_VERSION;
    }
    // The table is never written through this pointer.
    unsafe { *out_api = (&raw const API).cast_mut().cast() };
    LayerResult::SUCCESS
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;

    fn table() -> &'static LayerControlApi {
        let mut out: *mut c_void = ptr::null_mut();
        assert_eq!(
            unsafe { LAYER_CONTROLL_GetAPI(LayerVersion::V1_0_0, &mut out) },
            LayerResult::SUCCESS
        );
        unsafe { &*out.cast::<LayerControlApi>() }
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut out: *mut c_void = ptr::null_mut();
        let result = unsafe { LAYER_CONTROLL_GetAPI(LayerVersion(101), &mut out) };
        assert_eq!(result, LayerResult::INVALID_API_VERSION);
        assert!(out.is_null());

        let result = unsafe { LAYER_CONTROLL_GetAPI(LayerVersion::V1_0_0, ptr::null_mut()) };
        assert_eq!(result, LayerResult::INVALID_API_VERSION);
    }

    #[test]
    fn option_range_is_enforced() {
        let api = table();
        assert_eq!(
            unsafe { (api.set_option_bool)(LayerOption(LayerOption::COUNT), true) },
            LayerResult::INVALID_OPTION
        );
        assert_eq!(
            unsafe { (api.set_option_bool)(LayerOption::BLOCKING_CAPTURE, false) },
            LayerResult::SUCCESS
        );
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn every_frame_proceeds_without_a_dialog() {
        let api = table();
        for frame in 0..3 {
            assert_eq!(
                unsafe { (api.should_capture_frame)(0x10 as *const c_void, frame) },
                LayerResult::SUCCESS
            );
        }
    }
}
