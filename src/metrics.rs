use std::sync::atomic::{AtomicU64, Ordering};

use crate::pipeline::{DocumentProcessingResult, ProcessingStatus};

/// Thread-safe counters describing one pipeline run.
#[derive(Default)]
pub struct RunMetrics {
    documents_ok: AtomicU64,
    documents_failed: AtomicU64,
    documents_empty: AtomicU64,
    documents_timed_out: AtomicU64,
    probes_attempted: AtomicU64,
    probes_failed: AtomicU64,
}

impl RunMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one finished document pipeline.
    pub fn record_document(&self, result: &DocumentProcessingResult) {
        match result.status {
            ProcessingStatus::Ok => {
                self.documents_ok.fetch_add(1, Ordering::Relaxed);
                if result.empty_content {
                    self.documents_empty.fetch_add(1, Ordering::Relaxed);
                }
            }
            ProcessingStatus::Failed => {
                self.documents_failed.fetch_add(1, Ordering::Relaxed);
                if result.is_timeout() {
                    self.documents_timed_out.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Record one structural probe and whether it produced a measurement.
    pub fn record_probe(&self, succeeded: bool) {
        self.probes_attempted.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.probes_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ok: self.documents_ok.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            documents_empty: self.documents_empty.load(Ordering::Relaxed),
            documents_timed_out: self.documents_timed_out.load(Ordering::Relaxed),
            probes_attempted: self.probes_attempted.load(Ordering::Relaxed),
            probes_failed: self.probes_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of run counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Documents whose pipeline finished with `ok`.
    pub documents_ok: u64,
    /// Documents whose pipeline finished with `failed`.
    pub documents_failed: u64,
    /// `ok` documents flagged as having no extractable content.
    pub documents_empty: u64,
    /// Failed documents whose worker hit the per-document timeout.
    pub documents_timed_out: u64,
    /// Structural probes issued while resolving deferred pairs.
    pub probes_attempted: u64,
    /// Probes that could not produce a measurement.
    pub probes_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DocumentProcessingResult;

    #[test]
    fn records_documents_by_status() {
        let metrics = RunMetrics::new();
        metrics.record_document(&DocumentProcessingResult::failed("a", "timeout"));
        metrics.record_document(&DocumentProcessingResult::failed("b", "fetch failed"));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_failed, 2);
        assert_eq!(snapshot.documents_timed_out, 1);
        assert_eq!(snapshot.documents_ok, 0);
    }

    #[test]
    fn records_probe_failures() {
        let metrics = RunMetrics::new();
        metrics.record_probe(true);
        metrics.record_probe(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.probes_attempted, 2);
        assert_eq!(snapshot.probes_failed, 1);
    }
}
