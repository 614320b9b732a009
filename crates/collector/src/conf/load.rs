//! Load: config loading from file and environment variables.

use std::path::Path;

use serde::de::{value, DeserializeOwned, IntoDeserializer};

use super::model::{CollectorConfig, ConfigError};

const DEFAULT_CONFIG_PATH: &str = "/etc/fglog/collector.toml";

impl CollectorConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("COLLECTOR_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using environment variables", config_path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_string(),
            source,
        })
    }

    /// Overlay `COLLECTOR_*` variables. Unparsable values are ignored with a warning.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = var("COLLECTOR_BIND_ADDRESS") {
            self.bind_address = bind;
        }
        if let Some(path) = var("COLLECTOR_DATABASE") {
            self.database_path = path;
        }
        override_parsed(&var, "COLLECTOR_QUEUE_CAPACITY", &mut self.queue_capacity, |s| s.parse().ok());
        override_parsed(&var, "COLLECTOR_MAX_DATAGRAM_BYTES", &mut self.max_datagram_bytes, |s| s.parse().ok());
        override_parsed(&var, "COLLECTOR_SATURATION_POLICY", &mut self.saturation_policy, parse_variant);
        override_parsed(&var, "COLLECTOR_MISSING_FIELD_POLICY", &mut self.missing_field_policy, parse_variant);
    }
}

fn override_parsed<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
    parse: impl Fn(&str) -> Option<T>,
) {
    let Some(raw) = var(key) else { return };
    match parse(raw.trim()) {
        Some(value) => *slot = value,
        None => tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw),
    }
}

/// Parse a snake_case enum name the same way the TOML file spells it.
fn parse_variant<T: DeserializeOwned>(s: &str) -> Option<T> {
    let de: value::StrDeserializer<'_, value::Error> = s.into_deserializer();
    T::deserialize(de).ok()
}
