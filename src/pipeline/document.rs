//! The classify, convert, and summarize stages for a single document.

use async_trait::async_trait;
use std::sync::Arc;

use super::classify::classify;
use super::convert::convert;
use super::read_strategy::prepare;
use super::types::{DocumentProcessingResult, ProcessingStatus, ReadStrategy, StageError};
use crate::extract::TextExtractor;
use crate::fetch::ContentFetcher;
use crate::run::ArtifactStore;
use crate::selection::CandidateDocument;
use crate::summarization::{SummarizationRequest, SummaryService};

/// `empty_reason` recorded when extraction yields no text.
pub const NO_TEXT_REASON: &str = "no extractable text";

/// Processes one finally-selected document into a result.
///
/// Implementations never fail: every error becomes a `failed` result for that document.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// Process the document at 1-based `position` of the final selection.
    async fn process(&self, position: usize, document: &CandidateDocument) -> DocumentProcessingResult;
}

/// Fetch, extract, classify, convert, and summarize one document.
pub struct DocumentPipeline {
    fetcher: Arc<dyn ContentFetcher>,
    extractor: Arc<dyn TextExtractor>,
    summarizer: SummaryService,
    store: ArtifactStore,
}

impl DocumentPipeline {
    /// Pipeline writing its working files into `store`.
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        extractor: Arc<dyn TextExtractor>,
        summarizer: SummaryService,
        store: ArtifactStore,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            summarizer,
            store,
        }
    }

    async fn run_stages(
        &self,
        position: usize,
        document: &CandidateDocument,
        result: &mut DocumentProcessingResult,
    ) -> Result<(), StageError> {
        let fetched = self.fetcher.fetch(&document.url).await?;
        let pdf_path = self
            .store
            .write_bytes(
                &ArtifactStore::document_file(position, &document.display_text, &document.filename),
                &fetched.bytes,
            )
            .await?;
        let extracted = self.extractor.extract(&pdf_path).await?;
        self.store
            .write_bytes(
                &ArtifactStore::extracted_file(&document.id),
                extracted.full_text().as_bytes(),
            )
            .await?;

        let classification = classify(
            &document.display_text,
            document.inferred_category,
            &extracted.pages,
        );
        tracing::debug!(
            id = %document.id,
            document_type = %classification.document_type,
            reason = %classification.reason,
            "Classified document"
        );
        result.classified_type = Some(classification.document_type);
        result.classification_reason = Some(classification.reason);

        let converted = convert(classification.document_type, &extracted.pages);
        let prepared = prepare(&converted);
        result.converted_content = Some(converted);
        result.read_strategy = Some(prepared.strategy);
        result.used_sections = prepared.used_sections;

        if prepared.strategy == ReadStrategy::Unreadable {
            result.empty_content = true;
            result.empty_reason = Some(NO_TEXT_REASON.to_string());
            return Ok(());
        }

        let summary = self
            .summarizer
            .summarize(&SummarizationRequest {
                document_title: document.display_text.clone(),
                document_type: classification.document_type.to_string(),
                read_strategy: prepared.strategy.to_string(),
                text: prepared.text,
            })
            .await?;
        result.summary = summary.summary;
        result.key_points = summary.key_points;
        result.empty_content = summary.empty_content;
        result.empty_reason = summary.empty_reason;
        Ok(())
    }
}

#[async_trait]
impl DocumentProcessor for DocumentPipeline {
    async fn process(&self, position: usize, document: &CandidateDocument) -> DocumentProcessingResult {
        tracing::info!(id = %document.id, position, url = %document.url, "Processing document");
        let mut result = DocumentProcessingResult::started(&document.id);
        match self.run_stages(position, document, &mut result).await {
            Ok(()) => {
                result.status = ProcessingStatus::Ok;
                tracing::info!(
                    id = %document.id,
                    read_strategy = ?result.read_strategy,
                    empty = result.empty_content,
                    "Document processed"
                );
            }
            Err(error) => {
                tracing::warn!(id = %document.id, error = %error, "Document failed");
                result.status = ProcessingStatus::Failed;
                result.error_detail = Some(error.to_string());
            }
        }
        result
    }
}
