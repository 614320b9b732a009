//! Boot: logging init, config load, store open and provisioning.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::CollectorConfig;
use crate::store::LogStore;

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collector=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load config, open the database and make sure the log table exists.
///
/// If provisioning fails the store is closed before the error is returned.
pub fn boot() -> Result<(CollectorConfig, LogStore), Box<dyn std::error::Error>> {
    info!("Starting syslog collector v{}", env!("CARGO_PKG_VERSION"));

    let config = CollectorConfig::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    info!(
        "Loaded configuration: bind_address={}, database={}",
        config.bind_address, config.database_path
    );
    info!(
        "Queue: capacity={}, saturation={:?}, missing fields={:?}",
        config.queue_capacity, config.saturation_policy, config.missing_field_policy
    );

    let store = open_store(&config)?;
    Ok((config, store))
}

pub fn open_store(config: &CollectorConfig) -> Result<LogStore, Box<dyn std::error::Error>> {
    let store = LogStore::open(&config.database_path, config.missing_field_policy).map_err(|e| {
        error!("Failed to open database {}: {}", config.database_path, e);
        e
    })?;

    if let Err(e) = store.provision() {
        error!("Failed to provision log table: {}", e);
        if let Err(close_err) = store.close() {
            error!("Failed to close database after provisioning error: {}", close_err);
        }
        return Err(e.into());
    }

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Provisioned;

    #[test]
    fn test_open_store_provisions_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = CollectorConfig {
            database_path: dir.path().join("logs.sqlite").to_string_lossy().into_owned(),
            ..Default::default()
        };

        let store = open_store(&config).unwrap();
        assert_eq!(store.provision().unwrap(), Provisioned::AlreadyPresent);
        store.close().unwrap();
    }

    #[test]
    fn test_open_store_fails_on_bad_path() {
        let config = CollectorConfig {
            database_path: "/nonexistent-dir/for/sure/logs.sqlite".to_string(),
            ..Default::default()
        };
        assert!(open_store(&config).is_err());
    }
}
