//! Error types for the capture layer.
//!
//! Nothing in the layer is allowed to take the host process down: every
//! error either maps onto a fixed `XrResult` for one call, or degrades an
//! optional feature (capture tool, decision provider) for the process.

use std::path::PathBuf;

use thiserror::Error;

use crate::xr::XrResult;

/// The canonical error type for the capture layer.
#[derive(Debug, Error)]
pub enum LayerError {
    // ── Initialization ───────────────────────────────────────────
    /// The loader's negotiation request was malformed or incompatible.
    #[error("negotiation rejected: {0}")]
    Negotiation(&'static str),

    /// `xrCreateApiLayerInstance` was called without a usable layer chain.
    #[error("layer create info is missing the next-layer chain")]
    MissingChainInfo,

    // ── Runtime ──────────────────────────────────────────────────
    /// A runtime entry point the hook must delegate to was never resolved.
    #[error("runtime entry point {0} was never resolved")]
    EntryPointUnresolved(&'static str),

    /// The next `xrGetInstanceProcAddr` has not been captured yet.
    #[error("next xrGetInstanceProcAddr not captured; instance creation has not completed")]
    ResolverMissing,

    /// A required pointer argument was null.
    #[error("null argument: {0}")]
    NullArgument(&'static str),

    // ── Optional dependencies ────────────────────────────────────
    /// None of the candidate names or paths could be loaded.
    #[error("library {name} not found (also tried {path})")]
    LibraryNotFound { name: String, path: PathBuf },

    /// The library loaded but does not export the expected entry point.
    #[error("library {library} does not export {symbol}")]
    SymbolMissing { library: String, symbol: &'static str },

    /// The library refused the API version the layer asked for.
    #[error("{library} rejected API version {version}")]
    ApiVersionRejected { library: String, version: u32 },

    // ── Decision provider ────────────────────────────────────────
    /// An option index outside the declared option range.
    #[error("invalid option index {0}")]
    InvalidOption(u32),

    // ── Configuration ────────────────────────────────────────────
    /// The configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Filesystem access failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LayerError {
    /// The fixed result code reported to the caller of a hook when this
    /// error aborts the call.
    pub fn xr_result(&self) -> XrResult {
        match self {
            Self::Negotiation(_) | Self::MissingChainInfo => XrResult::ERROR_INITIALIZATION_FAILED,
            Self::EntryPointUnresolved(_) => XrResult::ERROR_RUNTIME_FAILURE,
            Self::ResolverMissing => XrResult::ERROR_HANDLE_INVALID,
            Self::NullArgument(_) => XrResult::ERROR_VALIDATION_FAILURE,
            _ => XrResult::ERROR_RUNTIME_FAILURE,
        }
    }
}

impl From<toml::de::Error> for LayerError {
    fn from(e: toml::de::Error) -> Self {
        LayerError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for LayerError {
    fn from(e: toml::ser::Error) -> Self {
        LayerError::Config(e.to_string())
    }
}
