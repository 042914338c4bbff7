use crate::processing::DocumentLog;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing batch activity.
#[derive(Default)]
pub struct BatchMetrics {
    batches_completed: AtomicU64,
    batches_rejected: AtomicU64,
    documents_succeeded: AtomicU64,
    documents_failed: AtomicU64,
    chunks_produced: AtomicU64,
}

impl BatchMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch that produced an archive, along with its per-document logs.
    pub fn record_batch(&self, logs: &[DocumentLog]) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
        for log in logs {
            match log {
                DocumentLog::Success { chunks, .. } => {
                    self.documents_succeeded.fetch_add(1, Ordering::Relaxed);
                    self.chunks_produced
                        .fetch_add(*chunks as u64, Ordering::Relaxed);
                }
                DocumentLog::Failed { .. } => {
                    self.documents_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Record a batch that failed at the configuration or archive stage.
    pub fn record_rejected_batch(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            batches_rejected: self.batches_rejected.load(Ordering::Relaxed),
            documents_succeeded: self.documents_succeeded.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chunks_produced: self.chunks_produced.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of batch counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Batches that completed with a downloadable archive.
    pub batches_completed: u64,
    /// Batches rejected by configuration validation or archive failure.
    pub batches_rejected: u64,
    /// Documents chunked successfully across all batches.
    pub documents_succeeded: u64,
    /// Documents that failed individually across all batches.
    pub documents_failed: u64,
    /// Total chunks produced across all successful documents.
    pub chunks_produced: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = BatchMetrics::new();
        metrics.record_batch(&[
            DocumentLog::Success {
                file: "a.md".into(),
                chunks: 2,
            },
            DocumentLog::Failed {
                file: "b.md".into(),
                message: "binary".into(),
            },
            DocumentLog::Success {
                file: "c.md".into(),
                chunks: 3,
            },
        ]);
        metrics.record_rejected_batch();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_completed, 1);
        assert_eq!(snapshot.batches_rejected, 1);
        assert_eq!(snapshot.documents_succeeded, 2);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(snapshot.chunks_produced, 5);
    }

    #[test]
    fn snapshot_is_consistent() {
        let metrics = BatchMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
