//! # xrcap-core
//!
//! Core library for the xrcap OpenXR capture layer.
//!
//! This crate contains:
//! - **ABI mirrors**: `xr` (handles, results, session/binding structs) and
//!   `loader` (negotiation and layer-chain structs)
//! - **Negotiation**: `negotiate` validates the loader's request and installs the layer
//! - **Interception**: `Interceptor` hands out the four hooks, forwards the rest
//! - **Instance chaining**: `create_down_chain`, `RuntimeDispatch`
//! - **Sessions**: `SessionRegistry` plus `GraphicsBinding` device extraction
//! - **Capture**: `CaptureTool` contract, `RenderDocTool`, `CaptureTrigger`
//! - **Decisions**: `DecisionProvider` contract, plugin loading, `ConfirmationGate`
//! - **Context**: `LayerContext`, the per-instance state every hook runs against
//! - **Config**: `LayerConfig`, loaded from TOML
//! - **Error**: `LayerError`, typed, `thiserror`-based

pub mod binding;
pub mod capture;
pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod gate;
pub mod instance;
pub mod interceptor;
pub mod library;
pub mod loader;
pub mod negotiate;
pub mod registry;
pub mod trigger;
pub mod xr;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use binding::{DevicePointer, GraphicsBinding};
pub use capture::{CaptureKey, CaptureTool, RenderDocTool};
pub use config::{CaptureConfig, DecisionConfig, LayerConfig, LoggingConfig};
pub use context::LayerContext;
pub use decision::{
    AlwaysProceed, Decision, DecisionProvider, LayerControlApi, LayerOption, LayerOptions,
    LayerResult, LayerVersion, PluginProvider,
};
pub use error::LayerError;
pub use gate::{Answer, ConfirmRequest, ConfirmationGate, Prompt};
pub use instance::{ChainedInstance, RuntimeDispatch, create_down_chain};
pub use interceptor::{HookTable, Interceptor};
pub use negotiate::{LAYER_NAME, LayerEntryPoints, negotiate};
pub use registry::{SessionRecord, SessionRegistry};
pub use trigger::CaptureTrigger;
pub use xr::{Instance, Session, Version, XrResult};
