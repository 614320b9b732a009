use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Transport-level failures, counted before a datagram reaches the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Payload was not valid UTF-8
    NonUtf8,
    /// Payload was empty after trimming
    Empty,
    /// Socket receive failed
    Receive,
}

/// Forces the wrapped counters onto their own cache line.
///
/// The listener and the writer update different groups concurrently; keeping
/// them 64 bytes apart avoids false sharing between the two.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Updated by the listener, one per datagram.
#[derive(Debug, Default)]
pub struct TransportMetrics {
    pub datagrams: AtomicU64,
    pub non_utf8: AtomicU64,
    pub empty: AtomicU64,
    pub receive_errors: AtomicU64,
    /// Discarded because the queue was full under `drop_newest`
    pub dropped: AtomicU64,
}

/// Updated by the writer, one per record.
#[derive(Debug, Default)]
pub struct RecordMetrics {
    pub decoded: AtomicU64,
    pub decode_errors: AtomicU64,
    pub missing_fields: AtomicU64,
    pub rejected: AtomicU64,
}

#[derive(Debug, Default)]
pub struct StorageMetrics {
    pub rows_written: AtomicU64,
    pub storage_errors: AtomicU64,
}

/// Counters for the whole ingestion path. All operations use
/// `Ordering::Relaxed`; a snapshot is not transactional across fields.
#[derive(Debug)]
pub struct IngestMetrics {
    pub started_at: DateTime<Utc>,
    pub transport: CacheAligned<TransportMetrics>,
    pub records: CacheAligned<RecordMetrics>,
    pub storage: CacheAligned<StorageMetrics>,
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            transport: CacheAligned::default(),
            records: CacheAligned::default(),
            storage: CacheAligned::default(),
        }
    }

    #[inline]
    pub fn record_datagram(&self) {
        self.transport.0.datagrams.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_transport_error(&self, kind: TransportErrorKind) {
        let counter = match kind {
            TransportErrorKind::NonUtf8 => &self.transport.0.non_utf8,
            TransportErrorKind::Empty => &self.transport.0.empty,
            TransportErrorKind::Receive => &self.transport.0.receive_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total dropped so far, including this one.
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.transport.0.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn record_decode(&self, success: bool) {
        let counter = if success {
            &self.records.0.decoded
        } else {
            &self.records.0.decode_errors
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_missing_fields(&self) {
        self.records.0.missing_fields.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.records.0.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_row(&self) {
        self.storage.0.rows_written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_storage_error(&self) {
        self.storage.0.storage_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let t = &self.transport.0;
        let r = &self.records.0;
        let s = &self.storage.0;

        let rows_written = load(&s.rows_written);
        let storage_errors = load(&s.storage_errors);
        let attempts = rows_written + storage_errors;

        MetricsSnapshot {
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0),

            datagrams: load(&t.datagrams),
            non_utf8: load(&t.non_utf8),
            empty: load(&t.empty),
            receive_errors: load(&t.receive_errors),
            dropped: load(&t.dropped),

            decoded: load(&r.decoded),
            decode_errors: load(&r.decode_errors),
            missing_fields: load(&r.missing_fields),
            rejected: load(&r.rejected),

            rows_written,
            storage_errors,
            write_success_rate: if attempts > 0 {
                rows_written as f64 / attempts as f64
            } else {
                1.0
            },
        }
    }
}

/// A read-only, serializable view of [`IngestMetrics`].
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,

    pub datagrams: u64,
    pub non_utf8: u64,
    pub empty: u64,
    pub receive_errors: u64,
    pub dropped: u64,

    pub decoded: u64,
    pub decode_errors: u64,
    pub missing_fields: u64,
    pub rejected: u64,

    pub rows_written: u64,
    pub storage_errors: u64,
    pub write_success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_aligned_groups() {
        assert_eq!(std::mem::align_of::<CacheAligned<TransportMetrics>>(), 64);
        assert_eq!(std::mem::align_of::<CacheAligned<StorageMetrics>>(), 64);
    }

    #[test]
    fn test_counters_land_in_snapshot() {
        let metrics = IngestMetrics::new();
        metrics.record_datagram();
        metrics.record_datagram();
        metrics.record_transport_error(TransportErrorKind::NonUtf8);
        metrics.record_dropped();
        metrics.record_decode(true);
        metrics.record_decode(false);
        metrics.record_missing_fields();
        metrics.record_row();
        metrics.record_row();
        metrics.record_storage_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.datagrams, 2);
        assert_eq!(snap.non_utf8, 1);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.decoded, 1);
        assert_eq!(snap.decode_errors, 1);
        assert_eq!(snap.missing_fields, 1);
        assert_eq!(snap.rows_written, 2);
        assert_eq!(snap.storage_errors, 1);
        assert!((snap.write_success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot_success_rate() {
        let snap = IngestMetrics::new().snapshot();
        assert_eq!(snap.write_success_rate, 1.0);
        assert!(snap.uptime_secs >= 0);
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let metrics = IngestMetrics::new();
        metrics.record_row();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["rows_written"], 1);
        assert!(json["started_at"].is_string());
    }
}
