//! Process-wide layer state.
//!
//! The loader calls the layer through plain function pointers, so the
//! active [`LayerContext`] has to be reachable from statics. Everything
//! else lives inside the context.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::info;
use tracing_subscriber::EnvFilter;
use xrcap_core::{CaptureTrigger, LayerConfig, LayerContext};

// ── Globals (required by the loader's callback ABI) ─────────────

/// Context of the most recently created instance.
static ACTIVE: RwLock<Option<Arc<LayerContext>>> = RwLock::new(None);

/// Configuration, read once on first use.
static CONFIG: OnceLock<LayerConfig> = OnceLock::new();

/// Capture tool and decision provider, loaded once per process.
static TRIGGER: OnceLock<CaptureTrigger> = OnceLock::new();

pub fn config() -> &'static LayerConfig {
    CONFIG.get_or_init(|| LayerConfig::load(&LayerConfig::default_path()))
}

/// Install a `tracing` subscriber unless the host already has one.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config().logging.level));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    if installed {
        info!("xrcap-layer v{}", env!("CARGO_PKG_VERSION"));
    }
}

/// The capture trigger, loading its collaborators on first call.
pub fn trigger() -> CaptureTrigger {
    TRIGGER
        .get_or_init(|| CaptureTrigger::load(config()))
        .clone()
}

pub fn active() -> Option<Arc<LayerContext>> {
    ACTIVE.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Make `context` the one every hook runs against.
///
/// Sessions tracked by the context it replaces move over with their frame
/// counts, so a second instance does not orphan them.
pub fn publish(context: LayerContext) {
    let mut active = ACTIVE.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(previous) = active.as_ref() {
        let carried = context.adopt_sessions(previous);
        info!(
            "instance {} replaces instance {} as the active layer context ({carried} sessions carried over)",
            context.instance(),
            previous.instance()
        );
    }
    *active = Some(Arc::new(context));
}
