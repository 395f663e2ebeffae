//! Layer configuration loaded from a TOML file.
//!
//! The file is optional. Its path comes from `XRCAP_LAYER_CONFIG`, falling
//! back to `xrcap-layer.toml` in the working directory of the host process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capture::CaptureKey;
use crate::error::LayerError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "XRCAP_LAYER_CONFIG";

/// File name used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "xrcap-layer.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Capture tool (RenderDoc) settings.
    pub capture: CaptureConfig,
    /// Decision provider settings.
    pub decision: DecisionConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Capture tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Module name, also used for the already-loaded lookup.
    pub library_name: String,
    /// Full path tried when the module is not already loaded.
    pub library_path: PathBuf,
    /// Keys that trigger a capture from inside the application.
    pub hotkeys: Vec<CaptureKey>,
    /// Title stamped on captures (needs RenderDoc API 1.6).
    pub title: String,
    /// Launch the replay UI after a capture when none is attached.
    pub launch_viewer: bool,
}

/// Decision provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Look for a provider at all.
    pub enabled: bool,
    /// Module name of the provider.
    pub library_name: String,
    /// Full path tried when the module is not already loaded.
    pub library_path: PathBuf,
    /// Force blocking mode on or off; `None` keeps the provider's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

#[cfg(windows)]
const RENDERDOC_LIBRARY: &str = "renderdoc.dll";
#[cfg(target_os = "macos")]
const RENDERDOC_LIBRARY: &str = "librenderdoc.dylib";
#[cfg(not(any(windows, target_os = "macos")))]
const RENDERDOC_LIBRARY: &str = "librenderdoc.so";

#[cfg(windows)]
const CONTROL_LIBRARY: &str = "xrcap_control.dll";
#[cfg(target_os = "macos")]
const CONTROL_LIBRARY: &str = "libxrcap_control.dylib";
#[cfg(not(any(windows, target_os = "macos")))]
const CONTROL_LIBRARY: &str = "libxrcap_control.so";

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            decision: DecisionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            library_name: RENDERDOC_LIBRARY.into(),
            library_path: PathBuf::from(RENDERDOC_LIBRARY),
            hotkeys: vec![CaptureKey::F12, CaptureKey::PrtScrn],
            title: "OpenXR Layer Capture".into(),
            launch_viewer: true,
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            library_name: CONTROL_LIBRARY.into(),
            library_path: PathBuf::from(CONTROL_LIBRARY),
            blocking: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl LayerConfig {
    /// The configuration path for this process.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Parse a configuration document.
    pub fn from_toml(text: &str) -> Result<Self, LayerError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::debug!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, LayerError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> Result<(), LayerError> {
        std::fs::write(path, Self::default().to_toml()?)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = LayerConfig::default().to_toml().unwrap();
        assert!(text.contains("library_name"));
        assert!(text.contains("hotkeys"));
        assert!(text.contains("PrtScrn"));
    }

    #[test]
    fn roundtrip_config() {
        let text = LayerConfig::default().to_toml().unwrap();
        let parsed = LayerConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.capture.hotkeys, vec![CaptureKey::F12, CaptureKey::PrtScrn]);
        assert!(parsed.capture.launch_viewer);
        assert!(parsed.decision.blocking.is_none());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let cfg = LayerConfig::from_toml(
            r#"
            [decision]
            blocking = true

            [capture]
            hotkeys = ["F11"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.decision.blocking, Some(true));
        assert!(cfg.decision.enabled);
        assert_eq!(cfg.capture.hotkeys, vec![CaptureKey::F11]);
        assert_eq!(cfg.capture.title, "OpenXR Layer Capture");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn unknown_hotkey_is_rejected() {
        let err = LayerConfig::from_toml("[capture]\nhotkeys = [\"Hyper\"]").unwrap_err();
        assert!(matches!(err, LayerError::Config(_)));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = LayerConfig::load(Path::new("/nonexistent/xrcap-layer.toml"));
        assert_eq!(cfg.capture.library_name, RENDERDOC_LIBRARY);
    }
}
