//! Serve: bind the UDP socket, run listener and store writer, shut down in order.

use std::future::Future;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{error, info};

use crate::conf::CollectorConfig;
use crate::ingest::{self, IngestMetrics, Ingestor, MetricsSnapshot};
use crate::runtime::listen::listen;
use crate::runtime::stop::shutdown_signal;
use crate::store::LogStore;

/// Bind `config.bind_address` and ingest until a termination signal.
///
/// The store is closed exactly once on every path out of this function.
pub async fn serve(config: CollectorConfig, store: LogStore) -> Result<MetricsSnapshot, Box<dyn std::error::Error>> {
    let socket = match UdpSocket::bind(&config.bind_address).await {
        Ok(socket) => socket,
        Err(e) => {
            error!("Failed to bind UDP {}: {}", config.bind_address, e);
            if let Err(close_err) = store.close() {
                error!("Failed to close database: {}", close_err);
            }
            return Err(e.into());
        }
    };

    let metrics = Arc::new(IngestMetrics::new());
    run(socket, store, &config, metrics, shutdown_signal()).await
}

/// Wire listener → bounded queue → writer on an already-bound socket.
///
/// On `shutdown` the listener stops, the writer drains what was queued and
/// closes the store, then the final metrics are logged and returned.
pub async fn run<F>(
    socket: UdpSocket,
    store: LogStore,
    config: &CollectorConfig,
    metrics: Arc<IngestMetrics>,
    shutdown: F,
) -> Result<MetricsSnapshot, Box<dyn std::error::Error>>
where
    F: Future<Output = ()>,
{
    let (queue, pending) = ingest::bounded(
        config.queue_capacity,
        config.saturation_policy,
        Arc::clone(&metrics),
    );

    let ingestor = Ingestor::new(store, Arc::clone(&metrics));
    let writer = tokio::task::spawn_blocking(move || ingestor.run(pending));

    let local = socket
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| config.bind_address.clone());
    info!("========================================");
    info!("Syslog collector is ready!");
    info!("Listening on: udp://{}", local);
    info!("Writing to: {}", config.database_path);
    info!("Press Ctrl+C to shutdown gracefully");
    info!("========================================");

    listen(socket, queue, Arc::clone(&metrics), config.max_datagram_bytes, shutdown).await;
    info!("Listener stopped, waiting for store writer to drain");

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Failed to close database: {}", e);
            return Err(e.into());
        }
        Err(e) => {
            error!("Store writer task failed: {}", e);
            return Err(e.into());
        }
    }

    let snapshot = metrics.snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => info!("Final metrics: {}", json),
        Err(e) => error!("Failed to serialize metrics: {}", e),
    }
    info!("Collector shutdown complete");
    Ok(snapshot)
}
