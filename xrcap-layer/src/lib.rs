//! # xrcap-layer
//!
//! OpenXR API layer that captures frames with RenderDoc.
//!
//! The loader finds this library through its layer manifest and calls
//! [`xrNegotiateLoaderApiLayerInterface`]. From there on every call goes
//! through the trampolines in [`hooks`], which run against the active
//! [`xrcap_core::LayerContext`].
//!
//! Configuration is read from `xrcap-layer.toml` (or the file named by
//! `XRCAP_LAYER_CONFIG`); logs go to stderr, filtered by `RUST_LOG` or the
//! configured level.

use std::ffi::c_char;

use xrcap_core::XrResult;
use xrcap_core::loader::{NegotiateApiLayerRequest, NegotiateLoaderInfo};

pub mod hooks;
pub mod state;

/// Loader entry point: validate the request and install the layer.
///
/// # Safety
///
/// Called by the OpenXR loader with pointers valid for the negotiation
/// structures (or null).
#[unsafe(no_mangle)]
pub unsafe extern "system" fn xrNegotiateLoaderApiLayerInterface(
    loader_info: *const NegotiateLoaderInfo,
    layer_name: *const c_char,
    request: *mut NegotiateApiLayerRequest,
) -> XrResult {
    state::init_logging();
    unsafe { xrcap_core::negotiate(loader_info, layer_name, request, hooks::ENTRY_POINTS) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrcap_core::loader::LoaderInterfaceStruct;
    use xrcap_core::{LAYER_NAME, Version};

    #[test]
    fn exported_entry_installs_trampolines() {
        let info = NegotiateLoaderInfo {
            ty: LoaderInterfaceStruct::LOADER_INFO,
            struct_version: 1,
            struct_size: size_of::<NegotiateLoaderInfo>(),
            min_interface_version: 1,
            max_interface_version: 1,
            min_api_version: Version::new(1, 0, 0),
            max_api_version: Version::new(1, 0, 0xffff),
        };
        let mut request = NegotiateApiLayerRequest {
            ty: LoaderInterfaceStruct::API_LAYER_REQUEST,
            struct_version: 1,
            struct_size: size_of::<NegotiateApiLayerRequest>(),
            layer_interface_version: 0,
            layer_api_version: Version::from_raw(0),
            get_instance_proc_addr: None,
            create_api_layer_instance: None,
        };

        let result =
            unsafe { xrNegotiateLoaderApiLayerInterface(&info, LAYER_NAME.as_ptr(), &mut request) };
        assert_eq!(result, XrResult::SUCCESS);
        assert_eq!(
            request.get_instance_proc_addr.map(|f| f as usize),
            Some(hooks::ENTRY_POINTS.get_instance_proc_addr as usize)
        );
    }
}
