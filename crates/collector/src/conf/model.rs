//! Model: CollectorConfig and its validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::SaturationPolicy;
use crate::store::MissingFieldPolicy;

/// Largest UDP payload; a smaller buffer lets the OS truncate silently.
pub const MIN_DATAGRAM_BYTES: usize = 65_535;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// UDP address the appliance sends syslog to
    pub bind_address: String,
    pub database_path: String,
    /// Slots between the listener and the store writer
    pub queue_capacity: usize,
    pub saturation_policy: SaturationPolicy,
    pub missing_field_policy: MissingFieldPolicy,
    /// Receive buffer size, at least [`MIN_DATAGRAM_BYTES`]
    pub max_datagram_bytes: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:514".to_string(),
            database_path: "fg_log_db.sqlite".to_string(),
            queue_capacity: 1024,
            saturation_policy: SaturationPolicy::Block,
            missing_field_policy: MissingFieldPolicy::SubstituteEmpty,
            max_datagram_bytes: MIN_DATAGRAM_BYTES,
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::Invalid("bind_address must not be empty".to_string()));
        }
        if self.database_path.is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be > 0".to_string()));
        }
        if self.max_datagram_bytes < MIN_DATAGRAM_BYTES {
            return Err(ConfigError::Invalid(format!(
                "max_datagram_bytes must be >= {} (got {})",
                MIN_DATAGRAM_BYTES, self.max_datagram_bytes
            )));
        }
        Ok(())
    }
}
