//! Mirrors of the loader ↔ API-layer negotiation structures
//! (`openxr_loader_negotiation.h`).

use std::ffi::{c_char, c_void};

use crate::xr::{pfn, Instance, InstanceCreateInfo, Version, XrResult};

pub const CURRENT_LOADER_API_LAYER_VERSION: u32 = 1;
pub const LOADER_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_CREATE_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_NEXT_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_MAX_SETTINGS_PATH_SIZE: usize = 512;
pub const MAX_API_LAYER_NAME_SIZE: usize = 256;

/// `XrLoaderInterfaceStructs` tag.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderInterfaceStruct(pub i32);

impl LoaderInterfaceStruct {
    pub const UNINITIALIZED: Self = Self(0);
    pub const LOADER_INFO: Self = Self(1);
    pub const API_LAYER_REQUEST: Self = Self(2);
    pub const RUNTIME_REQUEST: Self = Self(3);
    pub const API_LAYER_CREATE_INFO: Self = Self(4);
    pub const API_LAYER_NEXT_INFO: Self = Self(5);
}

pub type FnCreateApiLayerInstance = unsafe extern "system" fn(
    info: *const InstanceCreateInfo,
    api_layer_info: *const ApiLayerCreateInfo,
    instance: *mut Instance,
) -> XrResult;

/// Filled by the loader: the interface and API version ranges it accepts.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NegotiateLoaderInfo {
    pub ty: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub min_interface_version: u32,
    pub max_interface_version: u32,
    pub min_api_version: Version,
    pub max_api_version: Version,
}

/// Filled by the layer on successful negotiation.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NegotiateApiLayerRequest {
    pub ty: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_interface_version: u32,
    pub layer_api_version: Version,
    pub get_instance_proc_addr: Option<pfn::GetInstanceProcAddr>,
    pub create_api_layer_instance: Option<FnCreateApiLayerInstance>,
}

/// Passed to `xrCreateApiLayerInstance`; `next_info` walks down the layer chain.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ApiLayerCreateInfo {
    pub ty: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub loader_instance: *mut c_void,
    pub settings_file_location: [c_char; API_LAYER_MAX_SETTINGS_PATH_SIZE],
    pub next_info: *mut ApiLayerNextInfo,
}

/// One link of the layer chain: how to reach the next layer (or the runtime).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ApiLayerNextInfo {
    pub ty: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_name: [c_char; MAX_API_LAYER_NAME_SIZE],
    pub next_get_instance_proc_addr: Option<pfn::GetInstanceProcAddr>,
    pub next_create_api_layer_instance: Option<FnCreateApiLayerInstance>,
    pub next: *mut ApiLayerNextInfo,
}
