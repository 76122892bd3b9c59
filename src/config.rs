//! Runtime configuration for ev-maintenance-api.
//!
//! Configuration can be loaded from a JSON file or constructed
//! programmatically. Server knobs (listen address, CORS origin) and model
//! artifact locations live here.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Version of the deployed model bundle, reported by every system endpoint.
pub const MODEL_VERSION: &str = "1.0.0";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "ev-maintenance-api", about = "EV battery predictive-maintenance API server")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Model configuration.
    pub model: ModelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,

    /// The single origin allowed by the CORS policy.
    ///
    /// Carried over verbatim from the upstream deployment, path segment
    /// included. Origins are normally scheme+host only; the value is kept
    /// as configured because the intent upstream is unclear.
    pub cors_allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            cors_allowed_origin:
                "https://ev-fleet-predictive-maintenance-backend.onrender.com/openapi.json"
                    .to_string(),
        }
    }
}

/// Model artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding serialized model coefficients
    /// (`soh_model.json`, `thermal_model.json`).
    ///
    /// When `None` or the directory does not exist, built-in default
    /// coefficients are used.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { artifact_dir: None }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file is absent.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }
}
