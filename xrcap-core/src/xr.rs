//! Bit-exact mirrors of the OpenXR core types the layer touches.
//!
//! Only the handles, structures and entry-point signatures that the layer
//! reads or forwards are declared. Everything else flows through as opaque
//! pointers and is never dereferenced.

use std::ffi::{c_char, c_void};
use std::fmt;

// ── XrResult ─────────────────────────────────────────────────────

/// `XrResult`: negative values are errors, zero and positive values succeed.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XrResult(pub i32);

impl XrResult {
    pub const SUCCESS: Self = Self(0);
    pub const ERROR_VALIDATION_FAILURE: Self = Self(-1);
    pub const ERROR_RUNTIME_FAILURE: Self = Self(-2);
    pub const ERROR_INITIALIZATION_FAILED: Self = Self(-6);
    pub const ERROR_FUNCTION_UNSUPPORTED: Self = Self(-7);
    pub const ERROR_HANDLE_INVALID: Self = Self(-12);
}

impl fmt::Display for XrResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SUCCESS => write!(f, "XR_SUCCESS"),
            Self::ERROR_VALIDATION_FAILURE => write!(f, "XR_ERROR_VALIDATION_FAILURE"),
            Self::ERROR_RUNTIME_FAILURE => write!(f, "XR_ERROR_RUNTIME_FAILURE"),
            Self::ERROR_INITIALIZATION_FAILED => write!(f, "XR_ERROR_INITIALIZATION_FAILED"),
            Self::ERROR_FUNCTION_UNSUPPORTED => write!(f, "XR_ERROR_FUNCTION_UNSUPPORTED"),
            Self::ERROR_HANDLE_INVALID => write!(f, "XR_ERROR_HANDLE_INVALID"),
            Self(other) => write!(f, "XrResult({other})"),
        }
    }
}

// ── Handles ──────────────────────────────────────────────────────

macro_rules! xr_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            pub const NULL: Self = Self(0);

            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn into_raw(self) -> u64 {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

xr_handle!(
    /// `XrInstance`, owned by the loader and runtime.
    Instance
);
xr_handle!(
    /// `XrSession`, owned by the runtime. The layer only observes it.
    Session
);

// ── Versions ─────────────────────────────────────────────────────

/// `XrVersion`: major in bits 48..64, minor in 32..48, patch in 0..32.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u32) -> Self {
        Self(((major as u64) << 48) | ((minor as u64) << 32) | patch as u64)
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u64 {
        self.0
    }

    pub const fn major(self) -> u16 {
        (self.0 >> 48) as u16
    }

    pub const fn minor(self) -> u16 {
        (self.0 >> 32) as u16
    }

    pub const fn patch(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// The API version this layer is built against.
pub const CURRENT_API_VERSION: Version = Version::new(1, 0, 34);

// ── Structure types ──────────────────────────────────────────────

/// `XrStructureType` tag at the head of every chainable structure.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructureType(pub i32);

impl StructureType {
    pub const INSTANCE_CREATE_INFO: Self = Self(3);
    pub const SESSION_CREATE_INFO: Self = Self(8);
    pub const GRAPHICS_BINDING_OPENGL_WIN32_KHR: Self = Self(1000023000);
    pub const GRAPHICS_BINDING_VULKAN_KHR: Self = Self(1000025000);
    pub const GRAPHICS_BINDING_D3D11_KHR: Self = Self(1000027000);
    pub const GRAPHICS_BINDING_D3D12_KHR: Self = Self(1000028000);
}

// ── Structures ───────────────────────────────────────────────────

/// `XrBaseInStructure`: the `{type, next}` prefix shared by every chain node.
#[repr(C)]
#[derive(Debug)]
pub struct BaseInStructure {
    pub ty: StructureType,
    pub next: *const BaseInStructure,
}

#[repr(C)]
#[derive(Debug)]
pub struct SessionCreateInfo {
    pub ty: StructureType,
    pub next: *const c_void,
    pub create_flags: u64,
    pub system_id: u64,
}

/// Forwarded untouched; the layer never looks inside.
#[repr(C)]
pub struct InstanceCreateInfo {
    _opaque: [u8; 0],
}

/// Forwarded untouched; the layer never looks inside.
#[repr(C)]
pub struct FrameBeginInfo {
    _opaque: [u8; 0],
}

/// Forwarded untouched; the layer never looks inside.
#[repr(C)]
pub struct FrameEndInfo {
    _opaque: [u8; 0],
}

#[repr(C)]
#[derive(Debug)]
pub struct GraphicsBindingD3D11KHR {
    pub ty: StructureType,
    pub next: *const c_void,
    /// `ID3D11Device*`
    pub device: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct GraphicsBindingD3D12KHR {
    pub ty: StructureType,
    pub next: *const c_void,
    /// `ID3D12Device*`
    pub device: *mut c_void,
    /// `ID3D12CommandQueue*`
    pub queue: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct GraphicsBindingVulkanKHR {
    pub ty: StructureType,
    pub next: *const c_void,
    /// `VkInstance` (dispatchable handle)
    pub instance: *mut c_void,
    /// `VkPhysicalDevice`
    pub physical_device: *mut c_void,
    /// `VkDevice`
    pub device: *mut c_void,
    pub queue_family_index: u32,
    pub queue_index: u32,
}

#[repr(C)]
#[derive(Debug)]
pub struct GraphicsBindingOpenGLWin32KHR {
    pub ty: StructureType,
    pub next: *const c_void,
    /// `HDC`
    pub h_dc: *mut c_void,
    /// `HGLRC`
    pub h_glrc: *mut c_void,
}

// ── Entry points ─────────────────────────────────────────────────

/// Function-pointer types for the entry points the layer hooks or forwards.
pub mod pfn {
    use super::*;

    pub type VoidFunction = unsafe extern "system" fn();

    pub type GetInstanceProcAddr = unsafe extern "system" fn(
        instance: Instance,
        name: *const c_char,
        function: *mut Option<VoidFunction>,
    ) -> XrResult;

    pub type CreateSession = unsafe extern "system" fn(
        instance: Instance,
        create_info: *const SessionCreateInfo,
        session: *mut Session,
    ) -> XrResult;

    pub type DestroySession = unsafe extern "system" fn(session: Session) -> XrResult;

    pub type BeginFrame =
        unsafe extern "system" fn(session: Session, frame_begin_info: *const FrameBeginInfo) -> XrResult;

    pub type EndFrame =
        unsafe extern "system" fn(session: Session, frame_end_info: *const FrameEndInfo) -> XrResult;
}
