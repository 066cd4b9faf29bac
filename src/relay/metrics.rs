//! Process-wide relay counters.
//!
//! Plain atomic counters, incremented by the publisher and the consumer
//! loop and read out as a serializable snapshot by `GET /metrics`. The
//! benchmark harness polls `records_processed` to detect when the relay
//! has drained instead of sleeping a fixed interval.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters shared between the ingress handlers and the consumer loop
#[derive(Debug, Default)]
pub struct RelayMetrics {
    batches_queued: AtomicU64,
    publish_failures: AtomicU64,
    messages_consumed: AtomicU64,
    decode_failures: AtomicU64,
    records_skipped: AtomicU64,
    triggers_succeeded: AtomicU64,
    triggers_failed: AtomicU64,
    transport_errors: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub batches_queued: u64,
    pub publish_failures: u64,
    pub messages_consumed: u64,
    pub decode_failures: u64,
    pub records_skipped: u64,
    pub triggers_succeeded: u64,
    pub triggers_failed: u64,
    pub transport_errors: u64,
    /// Records that have reached a terminal outcome (skipped, triggered,
    /// or failed to trigger)
    pub records_processed: u64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch_queued(&self) {
        self.batches_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_consumed(&self) {
        self.messages_consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trigger_succeeded(&self) {
        self.triggers_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trigger_failed(&self) {
        self.triggers_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        let records_skipped = self.records_skipped.load(Ordering::Relaxed);
        let triggers_succeeded = self.triggers_succeeded.load(Ordering::Relaxed);
        let triggers_failed = self.triggers_failed.load(Ordering::Relaxed);

        MetricsSnapshot {
            batches_queued: self.batches_queued.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            messages_consumed: self.messages_consumed.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            records_skipped,
            triggers_succeeded,
            triggers_failed,
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            records_processed: records_skipped + triggers_succeeded + triggers_failed,
        }
    }
}
