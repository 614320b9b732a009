use std::sync::Arc;

use tracing::{error, info, warn};

use super::metrics::IngestMetrics;
use super::queue::QueueReceiver;
use crate::parser;
use crate::store::{Appended, LogStore, RowKind, StoreError, StoreResult};

#[derive(Debug)]
pub enum IngestOutcome {
    Stored(Appended),
    /// The row could not be written; the record is lost but reported.
    Failed(StoreError),
}

impl IngestOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, IngestOutcome::Stored(_))
    }
}

/// Decodes and persists one line at a time. Sole owner of the store handle.
pub struct Ingestor {
    store: LogStore,
    metrics: Arc<IngestMetrics>,
}

impl Ingestor {
    pub fn new(store: LogStore, metrics: Arc<IngestMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Handle one datagram's text. Never fails: decode and storage problems
    /// are logged, counted and reported through the outcome.
    pub fn ingest(&self, raw_text: &str) -> IngestOutcome {
        let record = parser::decode(raw_text);
        self.metrics.record_decode(!record.is_errored());
        if let Some(err) = record.decode_error() {
            warn!("Undecodable message ({}): {:?}", err, raw_text);
        }

        match self.store.append(&record) {
            Ok(appended) => {
                match &appended.kind {
                    RowKind::Substituted(missing) => {
                        self.metrics.record_missing_fields();
                        warn!(
                            "Row {} stored with empty values for missing fields: {}",
                            appended.id,
                            missing.join(", ")
                        );
                    }
                    RowKind::Errored(diagnostic) if !record.is_errored() => {
                        self.metrics.record_rejected();
                        warn!("Row {} stored as rejected: {}", appended.id, diagnostic);
                    }
                    _ => {}
                }
                self.metrics.record_row();
                IngestOutcome::Stored(appended)
            }
            Err(e) => {
                self.metrics.record_storage_error();
                error!("Failed to store message: {} (raw: {:?})", e, raw_text);
                IngestOutcome::Failed(e)
            }
        }
    }

    /// Drain `queue` in order until every sender is gone, then close the
    /// store. Intended for a dedicated blocking thread.
    pub fn run(self, mut queue: QueueReceiver) -> StoreResult<()> {
        info!("Store writer started");
        while let Some(line) = queue.blocking_next() {
            self.ingest(&line);
        }
        info!("Ingest queue drained");
        self.close()
    }

    pub fn close(self) -> StoreResult<()> {
        self.store.close()
    }
}
