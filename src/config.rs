//! Configuration management for the churn prediction service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file location, overridable with `CHURN_CONFIG`
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub model_info: ModelInfoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Interval between metrics summaries in the log
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            metrics_interval_secs: default_metrics_interval(),
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Tried in order; the first existing file that loads wins
    pub candidate_paths: Vec<PathBuf>,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
    /// Exit when no candidate loads instead of serving 503s
    pub fail_fast: bool,
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            candidate_paths: vec![
                PathBuf::from("models/churn_model_fixed.onnx"),
                PathBuf::from("models/production/model.onnx"),
                PathBuf::from("models/churn_model.json"),
            ],
            onnx_threads: default_onnx_threads(),
            fail_fast: false,
        }
    }
}

/// Audit log location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub log_dir: PathBuf,
    pub file_name: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_name: "predictions.csv".to_string(),
        }
    }
}

/// Static model description reported by `GET /model/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInfoConfig {
    pub model_type: String,
    pub training_platform: String,
    pub accuracy: f64,
    pub f1_score: f64,
    pub training_cost: String,
    pub spot_savings: String,
}

impl Default for ModelInfoConfig {
    fn default() -> Self {
        Self {
            model_type: "XGBoost Classifier".to_string(),
            training_platform: "AWS SageMaker".to_string(),
            accuracy: 0.816,
            f1_score: 0.611,
            training_cost: "$0.0006".to_string(),
            spot_savings: "69%".to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from `CHURN_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var("CHURN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, with `CHURN__*` env overrides.
    /// A missing file falls back to defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("CHURN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.audit.log_dir.join(&self.audit.file_name)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            audit: AuditConfig::default(),
            model_info: ModelInfoConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
