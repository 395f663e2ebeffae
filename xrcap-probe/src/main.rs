//! xrcap probe: checks what the layer would load, outside any XR app.
//!
//! ```text
//! xrcap-probe                       Probe with xrcap-layer.toml (or $XRCAP_LAYER_CONFIG)
//! xrcap-probe --config <path>       Probe with a custom config TOML
//! xrcap-probe --json                Print the report as JSON
//! xrcap-probe --ask                 Also ask the decision provider about one frame
//! xrcap-probe --gen-config          Dump default config and exit
//! xrcap-probe --write-config <path> Write default config to a file and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use xrcap_core::decision::LayerOption;
use xrcap_core::{
    CaptureTool, DecisionProvider, LayerConfig, PluginProvider, RenderDocTool, Session,
};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "xrcap-probe", about = "Probe the xrcap capture tool and decision provider")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Ask the decision provider whether to capture one (blocking) frame.
    #[arg(long)]
    ask: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Write the default configuration to this file and exit.
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

// ── Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ProbeReport {
    config: PathBuf,
    capture_tool: ToolReport,
    provider: ProviderReport,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ToolReport {
    Loaded {
        version: String,
        capturing: bool,
        ui_attached: bool,
    },
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ProviderReport {
    Disabled,
    Loaded {
        library: String,
        decision: Option<String>,
    },
    Unavailable {
        reason: String,
    },
}

impl ProbeReport {
    fn print(&self) {
        println!("config       : {}", self.config.display());
        match &self.capture_tool {
            ToolReport::Loaded {
                version,
                capturing,
                ui_attached,
            } => {
                println!("capture tool : RenderDoc {version}");
                println!("  capturing  : {capturing}");
                println!("  UI attached: {ui_attached}");
            }
            ToolReport::Unavailable { reason } => println!("capture tool : unavailable ({reason})"),
        }
        match &self.provider {
            ProviderReport::Disabled => println!("provider     : disabled by config"),
            ProviderReport::Loaded { library, decision } => {
                println!("provider     : {library}");
                if let Some(decision) = decision {
                    println!("  decision   : {decision}");
                }
            }
            ProviderReport::Unavailable { reason } => {
                println!("provider     : unavailable ({reason}); every frame proceeds")
            }
        }
    }
}

// ── Probing ──────────────────────────────────────────────────────

fn probe_tool(config: &LayerConfig) -> ToolReport {
    match RenderDocTool::load(&config.capture) {
        Ok(tool) => {
            let (major, minor, patch) = tool.api_version();
            ToolReport::Loaded {
                version: format!("{major}.{minor}.{patch}"),
                capturing: tool.is_capturing(),
                ui_attached: tool.is_ui_attached(),
            }
        }
        Err(e) => ToolReport::Unavailable {
            reason: e.to_string(),
        },
    }
}

fn probe_provider(config: &LayerConfig, ask: bool) -> ProviderReport {
    if !config.decision.enabled {
        return ProviderReport::Disabled;
    }
    let provider = match PluginProvider::load(&config.decision) {
        Ok(provider) => provider,
        Err(e) => {
            return ProviderReport::Unavailable {
                reason: e.to_string(),
            };
        }
    };

    let decision = ask.then(|| {
        // Blocking, so the answer belongs to the frame asked about.
        if let Err(e) = provider.set_option(LayerOption::BLOCKING_CAPTURE.0, true) {
            warn!("provider refused blocking mode: {e}");
        }
        format!("{:?}", provider.decide(Session::from_raw(1), 0))
    });
    ProviderReport::Loaded {
        library: config.decision.library_name.clone(),
        decision,
    }
}

// ── Main ─────────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", LayerConfig::default().to_toml()?);
        return Ok(());
    }

    if let Some(path) = &cli.write_config {
        LayerConfig::write_default(path)?;
        println!("Default configuration written to {}", path.display());
        return Ok(());
    }

    let path = cli.config.unwrap_or_else(LayerConfig::default_path);
    let config = LayerConfig::load(&path);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("xrcap-probe v{}", env!("CARGO_PKG_VERSION"));

    let report = ProbeReport {
        capture_tool: probe_tool(&config),
        provider: probe_provider(&config, cli.ask),
        config: path,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_libraries_are_reported() {
        let mut config = LayerConfig::default();
        config.capture.library_name = "xrcap-probe-missing-renderdoc".into();
        config.capture.library_path = "/nonexistent/xrcap-probe-missing-renderdoc".into();
        config.decision.library_name = "xrcap-probe-missing-control".into();
        config.decision.library_path = "/nonexistent/xrcap-probe-missing-control".into();

        assert!(matches!(probe_tool(&config), ToolReport::Unavailable { .. }));
        assert!(matches!(probe_provider(&config, true), ProviderReport::Unavailable { .. }));
    }

    #[test]
    fn disabled_provider_is_reported() {
        let mut config = LayerConfig::default();
        config.decision.enabled = false;
        assert!(matches!(probe_provider(&config, false), ProviderReport::Disabled));
    }

    #[test]
    fn report_serializes_with_status_tags() {
        let report = ProbeReport {
            config: PathBuf::from("xrcap-layer.toml"),
            capture_tool: ToolReport::Unavailable {
                reason: "not found".into(),
            },
            provider: ProviderReport::Disabled,
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["capture_tool"]["status"], "unavailable");
        assert_eq!(json["provider"]["status"], "disabled");
    }
}
