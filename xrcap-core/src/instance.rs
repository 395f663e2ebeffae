//! Instance creation down the layer chain, and resolution of the runtime
//! entry points the hooks delegate to.

use std::ffi::CStr;

use tracing::{debug, warn};

use crate::error::LayerError;
use crate::interceptor::{BEGIN_FRAME, CREATE_SESSION, DESTROY_SESSION, END_FRAME};
use crate::loader::ApiLayerCreateInfo;
use crate::xr::{Instance, InstanceCreateInfo, XrResult, pfn};

/// Outcome of forwarding `xrCreateApiLayerInstance` to the next layer.
#[derive(Debug, Clone, Copy)]
pub struct ChainedInstance {
    /// Result returned by the next layer, reported to the caller verbatim.
    pub result: XrResult,
    /// The next layer's `xrGetInstanceProcAddr`.
    pub next_resolver: pfn::GetInstanceProcAddr,
}

/// Call the next layer's `xrCreateApiLayerInstance` with the chain advanced
/// by one link.
///
/// # Safety
///
/// `layer_info` must be null or point to a valid create info whose
/// `next_info` is null or valid; `info` and `instance` are passed through.
pub unsafe fn create_down_chain(
    info: *const InstanceCreateInfo,
    layer_info: *const ApiLayerCreateInfo,
    instance: *mut Instance,
) -> Result<ChainedInstance, LayerError> {
    let layer_info = unsafe { layer_info.as_ref() }.ok_or(LayerError::MissingChainInfo)?;
    let next_info = unsafe { layer_info.next_info.as_ref() }.ok_or(LayerError::MissingChainInfo)?;
    let next_resolver = next_info.next_get_instance_proc_addr.ok_or(LayerError::MissingChainInfo)?;
    let next_create = next_info
        .next_create_api_layer_instance
        .ok_or(LayerError::MissingChainInfo)?;

    let mut forwarded = *layer_info;
    forwarded.next_info = next_info.next;

    let result = unsafe { next_create(info, &forwarded, instance) };
    debug!("next xrCreateApiLayerInstance returned {result}");
    Ok(ChainedInstance {
        result,
        next_resolver,
    })
}

// ── RuntimeDispatch ──────────────────────────────────────────────

/// The next layer's implementations of the hooked entry points.
///
/// An entry point the runtime did not hand out stays `None`; the matching
/// hook then fails with `XR_ERROR_RUNTIME_FAILURE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeDispatch {
    pub create_session: Option<pfn::CreateSession>,
    pub destroy_session: Option<pfn::DestroySession>,
    pub begin_frame: Option<pfn::BeginFrame>,
    pub end_frame: Option<pfn::EndFrame>,
}

impl RuntimeDispatch {
    /// Look up the four hooked entry points through `resolver`.
    ///
    /// # Safety
    ///
    /// `resolver` must be callable for `instance`.
    pub unsafe fn resolve(resolver: pfn::GetInstanceProcAddr, instance: Instance) -> Self {
        let lookup = |name: &CStr| {
            let mut function = None;
            let result = unsafe { resolver(instance, name.as_ptr(), &mut function) };
            if result != XrResult::SUCCESS || function.is_none() {
                warn!("runtime did not provide {} ({result})", name.to_string_lossy());
                return None;
            }
            function
        };

        // SAFETY: the resolver returns each entry point under its own name,
        // so the casts restore the declared signatures.
        unsafe {
            Self {
                create_session: lookup(CREATE_SESSION)
                    .map(|f| std::mem::transmute::<pfn::VoidFunction, pfn::CreateSession>(f)),
                destroy_session: lookup(DESTROY_SESSION)
                    .map(|f| std::mem::transmute::<pfn::VoidFunction, pfn::DestroySession>(f)),
                begin_frame: lookup(BEGIN_FRAME)
                    .map(|f| std::mem::transmute::<pfn::VoidFunction, pfn::BeginFrame>(f)),
                end_frame: lookup(END_FRAME)
                    .map(|f| std::mem::transmute::<pfn::VoidFunction, pfn::EndFrame>(f)),
            }
        }
    }

    pub fn create_session(&self) -> Result<pfn::CreateSession, LayerError> {
        self.create_session
            .ok_or(LayerError::EntryPointUnresolved("xrCreateSession"))
    }

    pub fn destroy_session(&self) -> Result<pfn::DestroySession, LayerError> {
        self.destroy_session
            .ok_or(LayerError::EntryPointUnresolved("xrDestroySession"))
    }

    pub fn begin_frame(&self) -> Result<pfn::BeginFrame, LayerError> {
        self.begin_frame.ok_or(LayerError::EntryPointUnresolved("xrBeginFrame"))
    }

    pub fn end_frame(&self) -> Result<pfn::EndFrame, LayerError> {
        self.end_frame.ok_or(LayerError::EntryPointUnresolved("xrEndFrame"))
    }
}
