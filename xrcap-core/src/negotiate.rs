//! Loader negotiation (`xrNegotiateLoaderApiLayerInterface`).
//!
//! The loader describes the interface and API version ranges it accepts;
//! the layer checks they contain its own versions and, if so, fills in the
//! request with its two entry points.

use std::ffi::{CStr, c_char};

use tracing::{info, warn};

use crate::error::LayerError;
use crate::loader::{
    CURRENT_LOADER_API_LAYER_VERSION, FnCreateApiLayerInstance, LoaderInterfaceStruct,
    NegotiateApiLayerRequest, NegotiateLoaderInfo,
};
use crate::xr::{CURRENT_API_VERSION, XrResult, pfn};

/// The name this layer is registered under in its manifest.
pub const LAYER_NAME: &CStr = c"XR_APILAYER_XRCAP_capture";

/// The entry points written into a successful negotiation request.
#[derive(Debug, Clone, Copy)]
pub struct LayerEntryPoints {
    pub get_instance_proc_addr: pfn::GetInstanceProcAddr,
    pub create_api_layer_instance: FnCreateApiLayerInstance,
}

/// Validate the loader's request and install `entry` on success.
///
/// Any failed check returns `XR_ERROR_INITIALIZATION_FAILED` and leaves the
/// request untouched.
///
/// # Safety
///
/// Each pointer must be null or valid for the structure it names; `layer_name`
/// must be NUL-terminated.
pub unsafe fn negotiate(
    loader_info: *const NegotiateLoaderInfo,
    layer_name: *const c_char,
    request: *mut NegotiateApiLayerRequest,
    entry: LayerEntryPoints,
) -> XrResult {
    if loader_info.is_null() || request.is_null() {
        warn!("negotiation rejected: null loader info or request");
        return XrResult::ERROR_INITIALIZATION_FAILED;
    }
    let (loader_info, request) = unsafe { (&*loader_info, &mut *request) };

    let name = (!layer_name.is_null()).then(|| unsafe { CStr::from_ptr(layer_name) });
    if let Err(e) = check(loader_info, request, name) {
        warn!("{e}");
        return e.xr_result();
    }

    request.layer_interface_version = CURRENT_LOADER_API_LAYER_VERSION;
    request.layer_api_version = CURRENT_API_VERSION;
    request.get_instance_proc_addr = Some(entry.get_instance_proc_addr);
    request.create_api_layer_instance = Some(entry.create_api_layer_instance);

    info!(
        "negotiated loader interface {CURRENT_LOADER_API_LAYER_VERSION}, API {CURRENT_API_VERSION}"
    );
    XrResult::SUCCESS
}

fn check(
    loader_info: &NegotiateLoaderInfo,
    request: &NegotiateApiLayerRequest,
    layer_name: Option<&CStr>,
) -> Result<(), LayerError> {
    if loader_info.ty != LoaderInterfaceStruct::LOADER_INFO
        || request.ty != LoaderInterfaceStruct::API_LAYER_REQUEST
    {
        return Err(LayerError::Negotiation("unexpected structure type"));
    }

    if loader_info.struct_size != size_of::<NegotiateLoaderInfo>()
        || request.struct_size != size_of::<NegotiateApiLayerRequest>()
    {
        return Err(LayerError::Negotiation("structure size mismatch"));
    }

    if !(loader_info.min_interface_version..=loader_info.max_interface_version)
        .contains(&CURRENT_LOADER_API_LAYER_VERSION)
    {
        return Err(LayerError::Negotiation("loader interface version out of range"));
    }

    if !(loader_info.min_api_version..=loader_info.max_api_version).contains(&CURRENT_API_VERSION) {
        return Err(LayerError::Negotiation("API version out of range"));
    }

    if layer_name.is_some_and(|name| name != LAYER_NAME) {
        return Err(LayerError::Negotiation("layer name does not match"));
    }

    Ok(())
}
