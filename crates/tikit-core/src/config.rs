//! Endpoint configuration
//!
//! Everything the driver needs to know about the board it talks to. The
//! configuration is fixed once a [`BoardDriver`](crate::BoardDriver) is built.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::protocol::{
    DEFAULT_BAUD_RATE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, DEFAULT_TERMINATOR,
    DEFAULT_TIMEOUT_MS,
};

/// Default backing file for the persistent store
pub const DEFAULT_STORAGE_FILE: &str = "data.txt";

/// Errors raised while loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Endpoint descriptor for one board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Serial port name (e.g. "/dev/ttyACM0" or "COM3")
    pub port_name: String,
    /// Baud rate; must match the firmware
    pub baud_rate: u32,
    /// Connection attempts made by `connect_with_retries(None)`
    pub max_retries: u32,
    /// Bytes marking the end of every frame
    pub terminator: Vec<u8>,
    /// File mirroring the key/value store
    pub storage_file_path: PathBuf,
    /// Serial read timeout in milliseconds
    pub timeout_ms: u64,
    /// Pause after a failed connection attempt in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            max_retries: DEFAULT_MAX_RETRIES,
            terminator: DEFAULT_TERMINATOR.to_vec(),
            storage_file_path: PathBuf::from(DEFAULT_STORAGE_FILE),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl EndpointConfig {
    /// Defaults for the given port
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the default retry count
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the frame terminator
    pub fn with_terminator(mut self, terminator: impl Into<Vec<u8>>) -> Self {
        self.terminator = terminator.into();
        self
    }

    /// Set the backing file of the store
    pub fn with_storage_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_file_path = path.into();
        self
    }

    /// Set the pause between connection attempts
    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Check the values the driver relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terminator.is_empty() {
            return Err(ConfigError::Invalid("terminator must not be empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be non-zero".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be non-zero".into()));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: EndpointConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
