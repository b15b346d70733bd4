//! Service configuration
//!
//! Settings come from an optional TOML file, then command-line flags
//! override individual fields. Every field has a default, so an empty
//! file (or no file) is a valid configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use courier_api::ServerConfig;
use serde::{Deserialize, Serialize};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unknown log format: {}. Use 'pretty' or 'json'.", s),
        }
    }
}

/// Configuration for the `courier` binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Socket address to listen on
    pub bind_addr: String,
    /// Largest accepted request body, in bytes
    pub max_body_size: usize,
    /// Directory uploaded files are written to
    pub upload_dir: PathBuf,
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub log_level: String,
    pub log_format: LogFormat,
    /// Log one line per request
    pub request_logging: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10MB
            upload_dir: PathBuf::from("uploads"),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            request_logging: true,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    /// Settings for the HTTP server
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.bind_addr.clone())
            .max_body_size(self.max_body_size)
            .logging(self.request_logging)
    }
}

/// Command-line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "courier")]
#[command(about = "Calculator and file upload example services")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g. 127.0.0.1:8080)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Directory uploaded files are written to
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Maximum request body size in bytes
    #[arg(long)]
    pub max_body_size: Option<usize>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Load the config file, if any, and apply flag overrides
    pub fn resolve(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::load(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(dir) = &self.upload_dir {
            config.upload_dir = dir.clone();
        }
        if let Some(size) = self.max_body_size {
            config.max_body_size = size;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }

        Ok(config)
    }
}
