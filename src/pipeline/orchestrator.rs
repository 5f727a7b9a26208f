//! Bounded fan-out of document pipelines with a single result collector.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};

use super::document::DocumentProcessor;
use super::types::{DocumentProcessingResult, PipelineError, PipelineReport, TIMEOUT_DETAIL};
use crate::metrics::RunMetrics;
use crate::selection::FinalSelection;

/// Error detail recorded for a document whose worker panicked.
pub const PANIC_DETAIL: &str = "worker panicked";

/// Concurrency and time limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Documents processed at the same time; at least one.
    pub max_workers: usize,
    /// Budget for one document's pipeline.
    pub document_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_workers: 4,
            document_timeout: Duration::from_secs(300),
        }
    }
}

/// Runs one [`DocumentProcessor`] invocation per finally-selected document.
pub struct PipelineOrchestrator {
    processor: Arc<dyn DocumentProcessor>,
    settings: PipelineSettings,
}

impl PipelineOrchestrator {
    /// Orchestrator over `processor`.
    pub fn new(processor: Arc<dyn DocumentProcessor>, settings: PipelineSettings) -> Self {
        Self {
            processor,
            settings,
        }
    }

    /// Process every document and assemble the report.
    ///
    /// At most `max_workers` documents run at once. A document that times out, fails, or
    /// panics yields a `failed` entry; siblings are unaffected. The report always holds one
    /// entry per selected document, and `final_selected_document_ids` keeps selection order.
    pub async fn run(
        &self,
        selection: &FinalSelection,
        metrics: &RunMetrics,
    ) -> Result<PipelineReport, PipelineError> {
        let documents = selection.documents();
        let workers = self.settings.max_workers.clamp(1, documents.len().max(1));
        let semaphore = Arc::new(Semaphore::new(workers));
        let (tx, mut rx) = mpsc::channel::<DocumentProcessingResult>(documents.len().max(1));
        tracing::info!(documents = documents.len(), workers, "Starting document pipelines");

        for (index, document) in documents.iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|error| PipelineError::WorkerPool(error.to_string()))?;
            let processor = Arc::clone(&self.processor);
            let document = document.clone();
            let timeout = self.settings.document_timeout;
            let tx = tx.clone();
            tokio::spawn(async move {
                let position = index + 1;
                let result = match tokio::time::timeout(timeout, processor.process(position, &document)).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(id = %document.id, timeout_secs = timeout.as_secs(), "Document timed out");
                        DocumentProcessingResult::failed(&document.id, TIMEOUT_DETAIL)
                    }
                };
                drop(permit);
                let _ = tx.send(result).await;
            });
        }
        // Close our sender so the collector ends once every worker has finished.
        drop(tx);

        let mut per_document_results = BTreeMap::new();
        while let Some(result) = rx.recv().await {
            metrics.record_document(&result);
            per_document_results.insert(result.document_id.clone(), result);
        }

        for document in documents {
            if !per_document_results.contains_key(&document.id) {
                tracing::error!(id = %document.id, "Worker ended without a result");
                let result = DocumentProcessingResult::failed(&document.id, PANIC_DETAIL);
                metrics.record_document(&result);
                per_document_results.insert(document.id.clone(), result);
            }
        }

        let report = PipelineReport {
            per_document_results,
            resolved_deferred_decisions: selection.decisions().to_vec(),
            final_selected_document_ids: selection.document_ids(),
            metrics: metrics.snapshot(),
        };
        tracing::info!(
            ok = report.metrics.documents_ok,
            failed = report.metrics.documents_failed,
            "Document pipelines finished"
        );
        Ok(report)
    }
}
