//! Bounded FIFO between the datagram listener and the store writer.
//!
//! One producer, one consumer: lines come out in the order they went in.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

use super::metrics::IngestMetrics;

/// Behaviour when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationPolicy {
    /// Wait for the writer; the socket buffer absorbs the backlog.
    #[default]
    Block,
    /// Discard the incoming line and count it.
    DropNewest,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("ingest queue closed")]
pub struct QueueClosed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    Queued,
    Dropped,
}

pub struct QueueSender {
    tx: mpsc::Sender<String>,
    policy: SaturationPolicy,
    metrics: Arc<IngestMetrics>,
}

pub struct QueueReceiver {
    rx: mpsc::Receiver<String>,
}

/// `capacity` must be non-zero.
pub fn bounded(
    capacity: usize,
    policy: SaturationPolicy,
    metrics: Arc<IngestMetrics>,
) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (QueueSender { tx, policy, metrics }, QueueReceiver { rx })
}

impl QueueSender {
    pub async fn submit(&self, line: String) -> Result<Submitted, QueueClosed> {
        match self.policy {
            SaturationPolicy::Block => self
                .tx
                .send(line)
                .await
                .map(|_| Submitted::Queued)
                .map_err(|_| QueueClosed),
            SaturationPolicy::DropNewest => match self.tx.try_send(line) {
                Ok(()) => Ok(Submitted::Queued),
                Err(TrySendError::Full(line)) => {
                    let dropped = self.metrics.record_dropped();
                    if dropped == 1 || dropped % 1000 == 0 {
                        warn!(
                            "Ingest queue full ({} slots), {} datagrams dropped so far; latest: {:?}",
                            self.tx.max_capacity(),
                            dropped,
                            line
                        );
                    }
                    Ok(Submitted::Dropped)
                }
                Err(TrySendError::Closed(_)) => Err(QueueClosed),
            },
        }
    }
}

impl QueueReceiver {
    /// For the writer thread. Must not be called from async context.
    pub fn blocking_next(&mut self) -> Option<String> {
        self.rx.blocking_recv()
    }

    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
