//! degov configuration file handling
//!
//! Provides default configuration generation and loading for the degov
//! operator CLI. Configuration files are TOML and live next to the data
//! directory by default:
//!
//! - Data: `~/.local/share/degov/data/`
//! - Config: `~/.local/share/degov/config.toml`
//! - Snapshot: `~/.local/share/degov/snapshot.cbor`
//!
//! Every section is optional; missing keys fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default periodic checkpoint interval
const DEFAULT_CHECKPOINT_INTERVAL: &str = "5m";

/// Interval value that disables periodic checkpoints
const CHECKPOINT_OFF: &str = "off";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid checkpoint interval '{value}': {reason}")]
    InvalidInterval { value: String, reason: String },
}

/// Operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegovConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where proposal records and snapshots live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for per-proposal record files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Checkpoint file (default: `snapshot.cbor` next to the data directory)
    pub snapshot_path: Option<PathBuf>,
}

/// Snapshot checkpoint schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Humantime duration ("30s", "5m", "1h") or "off"
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Restore from the snapshot when the data directory is empty
    #[serde(default = "default_restore_on_start")]
    pub restore_on_start: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_interval() -> String {
    DEFAULT_CHECKPOINT_INTERVAL.to_string()
}

fn default_restore_on_start() -> bool {
    true
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_path: None,
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            restore_on_start: default_restore_on_start(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl StorageConfig {
    /// Configured snapshot path, or the default next to `data_dir`.
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(|| default_snapshot_path(&self.data_dir))
    }
}

impl CheckpointConfig {
    /// Parsed periodic interval; `None` when checkpoints are off.
    pub fn interval(&self) -> Result<Option<Duration>, ConfigError> {
        let value = self.interval.trim();
        if value.eq_ignore_ascii_case(CHECKPOINT_OFF) {
            return Ok(None);
        }

        let interval =
            humantime::parse_duration(value).map_err(|e| ConfigError::InvalidInterval {
                value: self.interval.clone(),
                reason: e.to_string(),
            })?;

        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval {
                value: self.interval.clone(),
                reason: format!("must be non-zero (use \"{}\" to disable)", CHECKPOINT_OFF),
            });
        }

        Ok(Some(interval))
    }
}

impl DegovConfig {
    /// Create a new configuration with the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            storage: StorageConfig {
                data_dir,
                snapshot_path: None,
            },
            checkpoint: CheckpointConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        write_config(path, &contents)
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(data_dir: &Path) -> String {
        format!(
            r#"# degov Configuration (Operator Settings)
#
# Paths, checkpoint schedule and logging for the proposal store.
# Every key is optional; the values below are the defaults.

[storage]
# Directory holding one record file per proposal
data_dir = "{data_dir}"

# Sealed snapshot written by checkpoints and read on restore
# snapshot_path = "{snapshot_path}"

[checkpoint]
# How often `degov serve` writes a snapshot ("30s", "5m", "1h", or "off")
# A final snapshot is always written on shutdown.
interval = "{interval}"

# Restore from the snapshot when the data directory is empty
restore_on_start = true

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "{level}"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/degov/degov.log"
"#,
            data_dir = data_dir.display(),
            snapshot_path = default_snapshot_path(data_dir).display(),
            interval = DEFAULT_CHECKPOINT_INTERVAL,
            level = DEFAULT_LOG_LEVEL,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path, data_dir: &Path) -> Result<(), ConfigError> {
        write_config(config_path, &Self::generate_default_toml(data_dir))
    }

    /// Resolve the effective configuration for a command.
    ///
    /// Precedence for the config file: `--config`, then `config.toml` next
    /// to `--data-dir`, then the default location. A missing file yields
    /// defaults. `--data-dir` always wins over the file's `data_dir`.
    pub fn resolve(
        config_path: Option<&Path>,
        data_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let base_dir = data_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(default_data_dir);
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_config_path(&base_dir));

        let mut config = if config_path.exists() {
            Self::load(&config_path)?
        } else {
            Self::new(base_dir.clone())
        };

        if let Some(dir) = data_dir {
            config.storage.data_dir = dir.to_path_buf();
        }

        Ok(config)
    }
}

fn write_config(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    fs::write(path, contents).map_err(write_err)
}

/// Get the default config file path based on the data directory
///
/// - Data: /data/degov/proposals -> Config: /data/degov/config.toml
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.parent().unwrap_or(data_dir).join("config.toml")
}

/// Get the default snapshot path based on the data directory
pub fn default_snapshot_path(data_dir: &Path) -> PathBuf {
    data_dir.parent().unwrap_or(data_dir).join("snapshot.cbor")
}

/// Get the default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("degov")
        .join("data")
}
