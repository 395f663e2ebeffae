//! Graphics-binding extraction from the `xrCreateSession` chain.
//!
//! The session create info carries a `next` chain of tagged structures. One
//! of them names the graphics API the application renders with; RenderDoc
//! wants the matching "device pointer" to bind a capture to.
//!
//! Only the **head** node of the chain is inspected. A binding that sits
//! behind some other extension struct is not found and the session gets no
//! device.

use std::ffi::c_void;
use std::fmt;

use tracing::debug;

use crate::xr::{
    BaseInStructure, GraphicsBindingD3D11KHR, GraphicsBindingD3D12KHR,
    GraphicsBindingOpenGLWin32KHR, GraphicsBindingVulkanKHR, StructureType,
};

// ── DevicePointer ────────────────────────────────────────────────

/// The opaque device handle a capture is bound to (`RENDERDOC_DevicePointer`).
///
/// Stored as an address so session records stay `Send`; the layer never
/// dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DevicePointer(usize);

impl DevicePointer {
    pub const NULL: Self = Self(0);

    pub fn from_ptr(ptr: *const c_void) -> Self {
        Self(ptr as usize)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DevicePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// ── GraphicsBinding ──────────────────────────────────────────────

/// The four graphics bindings the layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsBinding {
    D3D11 {
        device: *mut c_void,
    },
    D3D12 {
        device: *mut c_void,
        queue: *mut c_void,
    },
    Vulkan {
        instance: *mut c_void,
        physical_device: *mut c_void,
        device: *mut c_void,
    },
    OpenGlWin32 {
        h_dc: *mut c_void,
        h_glrc: *mut c_void,
    },
}

impl GraphicsBinding {
    /// Decode the head node of a session-create `next` chain.
    ///
    /// Returns `None` for a null chain or an unrecognised head tag.
    ///
    /// # Safety
    ///
    /// `head` must be null or point to a valid OpenXR structure whose layout
    /// matches its `type` tag, alive for the duration of the call.
    pub unsafe fn from_chain_head(head: *const c_void) -> Option<Self> {
        if head.is_null() {
            return None;
        }

        let ty = unsafe { (*head.cast::<BaseInStructure>()).ty };
        let binding = match ty {
            StructureType::GRAPHICS_BINDING_D3D11_KHR => {
                let b = unsafe { &*head.cast::<GraphicsBindingD3D11KHR>() };
                Self::D3D11 { device: b.device }
            }
            StructureType::GRAPHICS_BINDING_D3D12_KHR => {
                let b = unsafe { &*head.cast::<GraphicsBindingD3D12KHR>() };
                Self::D3D12 {
                    device: b.device,
                    queue: b.queue,
                }
            }
            StructureType::GRAPHICS_BINDING_VULKAN_KHR => {
                let b = unsafe { &*head.cast::<GraphicsBindingVulkanKHR>() };
                Self::Vulkan {
                    instance: b.instance,
                    physical_device: b.physical_device,
                    device: b.device,
                }
            }
            StructureType::GRAPHICS_BINDING_OPENGL_WIN32_KHR => {
                let b = unsafe { &*head.cast::<GraphicsBindingOpenGLWin32KHR>() };
                Self::OpenGlWin32 {
                    h_dc: b.h_dc,
                    h_glrc: b.h_glrc,
                }
            }
            StructureType(other) => {
                debug!("session chain head has unrecognised type {other}; no device bound");
                return None;
            }
        };
        Some(binding)
    }

    /// Short API name for logs.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::D3D11 { .. } => "D3D11",
            Self::D3D12 { .. } => "D3D12",
            Self::Vulkan { .. } => "Vulkan",
            Self::OpenGlWin32 { .. } => "OpenGL/Win32",
        }
    }

    /// The pointer RenderDoc identifies this API's device by.
    ///
    /// # Safety
    ///
    /// For Vulkan, `instance` must be a live dispatchable `VkInstance` (or
    /// null): RenderDoc keys Vulkan devices by the instance's dispatch-table
    /// pointer, which is read through it.
    pub unsafe fn device_pointer(&self) -> DevicePointer {
        match *self {
            Self::D3D11 { device } => DevicePointer::from_ptr(device),
            Self::D3D12 { device, .. } => DevicePointer::from_ptr(device),
            Self::Vulkan { instance, .. } => {
                if instance.is_null() {
                    DevicePointer::NULL
                } else {
                    // RENDERDOC_DEVICEPOINTER_FROM_VKINSTANCE: *(void **)inst
                    let dispatch = unsafe { *instance.cast::<*mut c_void>() };
                    DevicePointer::from_ptr(dispatch)
                }
            }
            Self::OpenGlWin32 { h_glrc, .. } => DevicePointer::from_ptr(h_glrc),
        }
    }
}

/// Decode the head of a session-create chain straight into a device pointer.
///
/// Unrecognised or absent bindings yield [`DevicePointer::NULL`].
///
/// # Safety
///
/// Same contract as [`GraphicsBinding::from_chain_head`] and
/// [`GraphicsBinding::device_pointer`].
pub unsafe fn device_from_chain(head: *const c_void) -> DevicePointer {
    match unsafe { GraphicsBinding::from_chain_head(head) } {
        Some(binding) => {
            let device = unsafe { binding.device_pointer() };
            debug!("session bound to {} device {device}", binding.api_name());
            device
        }
        None => DevicePointer::NULL,
    }
}

// ── Tests ────────────────────────────────────────────────────────
