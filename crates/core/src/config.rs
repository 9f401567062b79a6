//! Configuration management
//!
//! Settings live in `config.toml` inside the mineral configuration
//! directory. A missing file is not an error: every field has a default,
//! and the CLI layers flags and environment variables on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::RetryConfig;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "MINERAL_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Default bytes per multipart part
pub const DEFAULT_PART_SIZE: u64 = 6_000_000;

/// Retries beyond the first attempt for a single part
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Smallest part the S3 protocol accepts (except for the last part)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Largest part the S3 protocol accepts
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub transfer: TransferConfig,
}

/// How to reach the storage service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Service endpoint URL; `None` uses the SDK's default resolution
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    /// Bucket used when a command is given none
    #[serde(default)]
    pub default_bucket: Option<String>,

    /// Path-style addressing, needed by most S3-compatible servers
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_path_style() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            access_key: None,
            secret_key: None,
            default_bucket: None,
            path_style: default_path_style(),
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(Error::Config(format!(
                    "endpoint must use http or https: {endpoint}"
                )));
            }
        }

        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(Error::Config(
                "access key and secret key must be provided together".to_string(),
            ));
        }

        Ok(())
    }
}

/// Tuning for uploads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes per multipart part (the last part may be shorter)
    pub part_size: u64,

    /// Retries per part after the first attempt
    pub max_retries: u32,

    /// Parts in flight at once; 1 uploads strictly in order
    pub concurrency: usize,

    /// Files larger than this use a multipart upload
    pub multipart_threshold: u64,

    pub initial_backoff_ms: u64,

    pub max_backoff_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            concurrency: 1,
            multipart_threshold: DEFAULT_PART_SIZE,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

impl TransferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.part_size < MIN_PART_SIZE {
            return Err(Error::Config(format!(
                "part size {} is below the minimum of {MIN_PART_SIZE} bytes",
                self.part_size
            )));
        }
        if self.part_size > MAX_PART_SIZE {
            return Err(Error::Config(format!(
                "part size {} exceeds the maximum of {MAX_PART_SIZE} bytes",
                self.part_size
            )));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Retry policy for a single part: the first attempt plus `max_retries`
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retries.saturating_add(1),
            initial_backoff_ms: self.initial_backoff_ms,
            max_backoff_ms: self.max_backoff_ms,
        }
    }
}

/// Loads the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Locate the configuration file from `MINERAL_CONFIG_DIR` or the
    /// platform configuration directory
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("cannot determine config directory".to_string()))?
                .join("mineral"),
        };
        Ok(Self::with_path(dir.join(CONFIG_FILE)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the configuration, falling back to defaults when
    /// the file does not exist
    pub fn load(&self) -> Result<Config> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let config: Config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("failed to parse {}: {e}", self.path.display()))
        })?;

        config.connection.validate()?;
        config.transfer.validate()?;

        Ok(config)
    }
}
