//! Ingest: the per-datagram path from raw text to stored row.

pub mod handler;
pub mod metrics;
pub mod queue;

pub use handler::{IngestOutcome, Ingestor};
pub use metrics::{IngestMetrics, MetricsSnapshot, TransportErrorKind};
pub use queue::{bounded, QueueClosed, QueueReceiver, QueueSender, SaturationPolicy, Submitted};
