//! Decision providers: per-frame go/skip verdicts for the capture trigger.
//!
//! A provider is optional. When none is loaded the layer uses
//! [`AlwaysProceed`], so call sites never special-case its absence.
//!
//! Out-of-process providers are shared libraries exporting
//! `LAYER_CONTROLL_GetAPI`, which hands back a [`LayerControlApi`] table for
//! the requested [`LayerVersion`]. The ABI types live here so the default
//! provider (`xrcap-control`) and the layer agree on them.

use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use bitflags::bitflags;
use libloading::Library;
use tracing::{info, warn};

use crate::config::DecisionConfig;
use crate::error::LayerError;
use crate::library;
use crate::xr::Session;

// ── Control ABI ──────────────────────────────────────────────────

/// Exported symbol every decision-provider library must define.
pub const CONTROL_GET_API: &str = "LAYER_CONTROLL_GetAPI";

/// Result codes of the control ABI.
///
/// Providers are foreign code, so any `i32` may come back; values outside
/// the declared set are treated like any other failure.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerResult(pub i32);

impl LayerResult {
    pub const SUCCESS: Self = Self(0);
    pub const INVALID_API_VERSION: Self = Self(1);
    pub const INVALID_OPTION: Self = Self(2);
    pub const SHOULD_SKIP_FRAME: Self = Self(3);
    /// The user cancelled; no further frames will be offered.
    pub const CAPTURE_CANCELLED: Self = Self(4);

    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }
}

impl fmt::Display for LayerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SUCCESS => write!(f, "LR_SUCCESS"),
            Self::INVALID_API_VERSION => write!(f, "LR_INVALID_API_VERSION"),
            Self::INVALID_OPTION => write!(f, "LR_INVALID_OPTION"),
            Self::SHOULD_SKIP_FRAME => write!(f, "LR_SHOULD_SKIP_FRAME"),
            Self::CAPTURE_CANCELLED => write!(f, "LR_CAPTURE_CANCELLED"),
            Self(other) => write!(f, "LayerResult({other})"),
        }
    }
}

/// API version token passed to `LAYER_CONTROLL_GetAPI`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVersion(pub i32);

impl LayerVersion {
    pub const V1_0_0: Self = Self(100);
}

/// Option indices understood by `SetOptionBool`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerOption(pub u32);

impl LayerOption {
    /// Wait for the user's answer instead of skipping frames meanwhile.
    pub const BLOCKING_CAPTURE: Self = Self(0);
    /// Number of declared options; indices at or above are invalid.
    pub const COUNT: u32 = 1;
}

bitflags! {
    /// Option bitset held by a provider; bit `n` is option index `n`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LayerOptions: u32 {
        const BLOCKING_CAPTURE = 1 << LayerOption::BLOCKING_CAPTURE.0;
    }
}

impl LayerOptions {
    /// Set or clear option `index`.
    pub fn apply(&mut self, index: u32, value: bool) -> Result<(), LayerError> {
        if index >= LayerOption::COUNT {
            return Err(LayerError::InvalidOption(index));
        }
        self.set(LayerOptions::from_bits_retain(1 << index), value);
        Ok(())
    }
}

pub type FnShouldCaptureFrame = unsafe extern "C" fn(session: *const c_void, frame: u64) -> LayerResult;
pub type FnSetOptionBool = unsafe extern "C" fn(option: LayerOption, value: bool) -> LayerResult;
pub type FnControlGetApi =
    unsafe extern "C" fn(version: LayerVersion, out_api: *mut *mut c_void) -> LayerResult;

/// `RENDERDOC_OPENXR_LAYER_API_1_0_0`: the table a provider hands out.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LayerControlApi {
    pub should_capture_frame: FnShouldCaptureFrame,
    pub set_option_bool: FnSetOptionBool,
}

/// Session handles cross the control ABI as an opaque pointer-sized value.
///
/// The slot is `const void*`, so on 32-bit targets only the low 32 bits of
/// the 64-bit handle reach the provider, and [`session_from_ffi`] gives back
/// that truncated value. Providers there must not use the handle as a key
/// across sessions.
pub fn session_to_ffi(session: Session) -> *const c_void {
    session.into_raw() as usize as *const c_void
}

pub fn session_from_ffi(session: *const c_void) -> Session {
    Session::from_raw(session as usize as u64)
}

// ── Provider contract ────────────────────────────────────────────

/// A provider's verdict for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Capture this frame.
    Proceed,
    /// Do not capture this frame (declined, or an answer is still pending).
    Skip,
    /// Do not capture; the user has opted out for the rest of the process.
    Cancelled,
}

impl Decision {
    pub fn is_proceed(self) -> bool {
        matches!(self, Self::Proceed)
    }

    pub fn to_layer_result(self) -> LayerResult {
        match self {
            Self::Proceed => LayerResult::SUCCESS,
            Self::Skip => LayerResult::SHOULD_SKIP_FRAME,
            Self::Cancelled => LayerResult::CAPTURE_CANCELLED,
        }
    }

    /// Map a provider's result; anything but success or cancel skips.
    pub fn from_layer_result(result: LayerResult) -> Self {
        match result {
            LayerResult::SUCCESS => Self::Proceed,
            LayerResult::CAPTURE_CANCELLED => Self::Cancelled,
            _ => Self::Skip,
        }
    }
}

/// Decides, frame by frame, whether the trigger may start a capture.
pub trait DecisionProvider: Send + Sync {
    fn decide(&self, session: Session, frame: u64) -> Decision;

    /// Set option `index` to `value`. Out-of-range indices fail with
    /// [`LayerError::InvalidOption`] and change nothing.
    fn set_option(&self, index: u32, value: bool) -> Result<(), LayerError>;
}

/// The provider used when none is loaded: every frame proceeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysProceed;

impl DecisionProvider for AlwaysProceed {
    fn decide(&self, _session: Session, _frame: u64) -> Decision {
        Decision::Proceed
    }

    fn set_option(&self, index: u32, _value: bool) -> Result<(), LayerError> {
        if index >= LayerOption::COUNT {
            return Err(LayerError::InvalidOption(index));
        }
        Ok(())
    }
}

// ── PluginProvider ───────────────────────────────────────────────

/// A provider living in a shared library, reached through its control table.
pub struct PluginProvider {
    api: NonNull<LayerControlApi>,
    _library: Library,
}

// SAFETY: the table is static data in the provider module; the control ABI
// requires its entry points to be callable from the frame thread.
unsafe impl Send for PluginProvider {}
unsafe impl Sync for PluginProvider {}

impl PluginProvider {
    /// Load the configured provider and request the 1.0.0 table.
    ///
    /// A version mismatch is final: the caller keeps the null provider for
    /// the rest of the process.
    pub fn load(config: &DecisionConfig) -> Result<Self, LayerError> {
        let library = library::open_library(&config.library_name, &config.library_path)?;
        let get_api: FnControlGetApi =
            unsafe { library::resolve(&library, &config.library_name, CONTROL_GET_API)? };
        unsafe { Self::from_get_api(get_api, &config.library_name, library) }
    }

    /// Request the 1.0.0 table from an already resolved `LAYER_CONTROLL_GetAPI`.
    ///
    /// # Safety
    ///
    /// `get_api` must stay callable while `library` is alive, and a table it
    /// hands out must point at valid [`LayerControlApi`] data for as long.
    pub unsafe fn from_get_api(
        get_api: FnControlGetApi,
        label: &str,
        library: Library,
    ) -> Result<Self, LayerError> {
        let mut table: *mut c_void = ptr::null_mut();
        let result = unsafe { get_api(LayerVersion::V1_0_0, &mut table) };
        let api = match NonNull::new(table.cast::<LayerControlApi>()) {
            Some(api) if result.is_success() => api,
            _ => {
                warn!("{label} refused control API 1.0.0 ({result})");
                return Err(LayerError::ApiVersionRejected {
                    library: label.to_string(),
                    version: LayerVersion::V1_0_0.0 as u32,
                });
            }
        };

        info!("decision provider {label} available");
        Ok(Self {
            api,
            _library: library,
        })
    }

    fn table(&self) -> &LayerControlApi {
        unsafe { self.api.as_ref() }
    }
}

impl DecisionProvider for PluginProvider {
    fn decide(&self, session: Session, frame: u64) -> Decision {
        let result = unsafe { (self.table().should_capture_frame)(session_to_ffi(session), frame) };
        Decision::from_layer_result(result)
    }

    fn set_option(&self, index: u32, value: bool) -> Result<(), LayerError> {
        match unsafe { (self.table().set_option_bool)(LayerOption(index), value) } {
            LayerResult::SUCCESS => Ok(()),
            LayerResult::INVALID_OPTION => Err(LayerError::InvalidOption(index)),
            other => {
                warn!("provider returned {other} from SetOptionBool");
                Err(LayerError::InvalidOption(index))
            }
        }
    }
}

/// Load the configured provider, degrading to [`AlwaysProceed`] on any failure.
pub fn load_provider(config: &DecisionConfig) -> Arc<dyn DecisionProvider> {
    if !config.enabled {
        info!("decision provider disabled by config");
        return Arc::new(AlwaysProceed);
    }

    match PluginProvider::load(config) {
        Ok(provider) => apply_overrides(provider, config),
        Err(e) => {
            info!("no decision provider ({e}); every frame proceeds");
            Arc::new(AlwaysProceed)
        }
    }
}

/// Push config overrides into a freshly loaded provider.
fn apply_overrides(provider: PluginProvider, config: &DecisionConfig) -> Arc<dyn DecisionProvider> {
    if let Some(blocking) = config.blocking {
        if let Err(e) = provider.set_option(LayerOption::BLOCKING_CAPTURE.0, blocking) {
            warn!("could not set blocking={blocking} on decision provider: {e}");
        }
    }
    Arc::new(provider)
}
