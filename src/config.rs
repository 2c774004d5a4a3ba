//! Configuration module for the suggestion server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the suggestion server
#[derive(Parser, Debug)]
#[command(name = "suggest-server")]
#[command(author = "suggest-server authors")]
#[command(version = "0.1.0")]
#[command(about = "An HTTP suggestion lookup server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:8080)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Path to the suggestion dataset (JSON array of {"id", "name"} records)
    #[arg(short = 'd', long)]
    pub dataset: Option<PathBuf>,

    /// Maximum number of concurrent connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Maximum number of concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Per-read deadline in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout: u64,
    /// Per-write deadline in seconds
    #[serde(default = "default_write_timeout")]
    pub write_timeout: u64,
    /// Maximum size of a buffered request in bytes
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_connections: default_max_connections(),
            read_timeout: default_read_timeout(),
            write_timeout: default_write_timeout(),
            max_request_size: default_max_request_size(),
        }
    }
}

/// Dataset-related configuration
#[derive(Debug, Deserialize)]
pub struct DatasetConfig {
    /// Path to the suggestions file
    #[serde(default = "default_dataset")]
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_connections() -> usize {
    1024
}

fn default_read_timeout() -> u64 {
    30 // seconds
}

fn default_write_timeout() -> u64 {
    30 // seconds
}

fn default_max_request_size() -> usize {
    64 * 1024 // 64 KiB
}

fn default_dataset() -> PathBuf {
    PathBuf::from("suggestions.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub dataset: PathBuf,
    pub max_connections: usize,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_request_size: usize,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        // Merge CLI args with TOML config (CLI takes precedence)
        Ok(Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            dataset: cli.dataset.unwrap_or(toml_config.dataset.path),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            read_timeout: toml_config.server.read_timeout,
            write_timeout: toml_config.server.write_timeout,
            max_request_size: toml_config.server.max_request_size,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
