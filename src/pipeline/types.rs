//! Result types produced by the per-document pipeline and the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::extract::ExtractError;
use crate::fetch::FetchError;
use crate::metrics::MetricsSnapshot;
use crate::run::ArtifactError;
use crate::selection::DeferredDecision;
use crate::summarization::SummarizationClientError;

/// Error detail recorded when a document exceeds its time budget.
pub const TIMEOUT_DETAIL: &str = "timeout";

/// Layout-based document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Dense paragraph prose.
    WordLike,
    /// Slide deck exported to PDF.
    PowerpointLike,
    /// Meeting agenda with times or a distributed-materials list.
    Agenda,
    /// Member or attendee list.
    Participants,
    /// Press release.
    Press,
    /// Survey or questionnaire results.
    Survey,
    /// Neither prose nor slides dominate.
    Mixed,
    /// No text lines to classify.
    Other,
}

impl DocumentType {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::WordLike => "word_like",
            DocumentType::PowerpointLike => "powerpoint_like",
            DocumentType::Agenda => "agenda",
            DocumentType::Participants => "participants",
            DocumentType::Press => "press",
            DocumentType::Survey => "survey",
            DocumentType::Mixed => "mixed",
            DocumentType::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the converted content was sampled before summarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    /// Condensed slide excerpt.
    SlideExcerpt,
    /// Whole text of a small document.
    FullSmall,
    /// Head, tail, and keyword windows of a medium document.
    HeadTailKeywords,
    /// Head, tail, and high-priority windows of a large document.
    CompressedLarge,
    /// Same sampling as `CompressedLarge` with a tighter budget.
    CompressedXlarge,
    /// Nothing readable was extracted.
    Unreadable,
}

impl ReadStrategy {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            ReadStrategy::SlideExcerpt => "slide_excerpt",
            ReadStrategy::FullSmall => "full_small",
            ReadStrategy::HeadTailKeywords => "head_tail_keywords",
            ReadStrategy::CompressedLarge => "compressed_large",
            ReadStrategy::CompressedXlarge => "compressed_xlarge",
            ReadStrategy::Unreadable => "unreadable",
        }
    }
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line range of the converted content that was sent for summarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedSection {
    /// Why the range was included.
    pub kind: SectionKind,
    /// First line, 1-based.
    pub line_from: usize,
    /// Last line, inclusive.
    pub line_to: usize,
}

/// Reason a line range was included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// The whole text.
    FullText,
    /// The whole slide excerpt.
    SlideExcerpt,
    /// Leading lines.
    Head,
    /// Trailing lines.
    Tail,
    /// Window around a high- or medium-priority keyword.
    KeywordWindow,
    /// Window around a high-priority keyword.
    HighPriorityWindow,
    /// Keyword windows were dropped because low-priority hits dominated.
    LowPriorityDominant,
}

/// Format of the converted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    /// Plain extracted text.
    Text,
    /// Markdown excerpt of selected slides.
    Markdown,
}

/// Output of the convert stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedContent {
    /// Text or Markdown.
    pub format: ContentFormat,
    /// Converted body.
    pub text: String,
    /// 1-based pages kept in a slide excerpt; empty for full text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub important_pages: Vec<usize>,
}

impl ConvertedContent {
    /// Whether nothing but whitespace was extracted.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Final outcome of one document's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Every stage completed.
    Ok,
    /// A stage failed or the document timed out.
    Failed,
}

/// Everything recorded about one finally-selected document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentProcessingResult {
    /// Candidate id.
    pub document_id: String,
    /// Type assigned by the classify stage.
    #[serde(default)]
    pub classified_type: Option<DocumentType>,
    /// Scores or rule behind the classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_reason: Option<String>,
    /// Output of the convert stage.
    #[serde(default)]
    pub converted_content: Option<ConvertedContent>,
    /// Summary text; empty unless summarization succeeded.
    #[serde(default)]
    pub summary: String,
    /// Ordered key points.
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Sampling strategy used for summarization.
    #[serde(default)]
    pub read_strategy: Option<ReadStrategy>,
    /// Line ranges sent for summarization.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_sections: Vec<UsedSection>,
    /// Whether the document had nothing to summarize.
    #[serde(default)]
    pub empty_content: bool,
    /// Why the content counts as empty.
    #[serde(default)]
    pub empty_reason: Option<String>,
    /// Final status.
    pub status: ProcessingStatus,
    /// Human-readable failure reason; set only for failed documents.
    #[serde(default)]
    pub error_detail: Option<String>,
}

impl DocumentProcessingResult {
    pub(crate) fn started(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            classified_type: None,
            classification_reason: None,
            converted_content: None,
            summary: String::new(),
            key_points: Vec::new(),
            read_strategy: None,
            used_sections: Vec::new(),
            empty_content: false,
            empty_reason: None,
            status: ProcessingStatus::Failed,
            error_detail: None,
        }
    }

    /// A failed result carrying only the document id and a reason.
    pub fn failed(document_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error_detail: Some(detail.into()),
            ..Self::started(document_id)
        }
    }

    /// Whether the document finished with `ok`.
    pub fn is_ok(&self) -> bool {
        self.status == ProcessingStatus::Ok
    }

    /// Whether the document failed by exceeding its time budget.
    pub fn is_timeout(&self) -> bool {
        self.status == ProcessingStatus::Failed
            && self.error_detail.as_deref() == Some(TIMEOUT_DETAIL)
    }
}

/// Aggregate of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// One result per finally-selected document, keyed by id.
    pub per_document_results: BTreeMap<String, DocumentProcessingResult>,
    /// How each deferred pair was resolved.
    pub resolved_deferred_decisions: Vec<DeferredDecision>,
    /// Final selection in deterministic selection order.
    pub final_selected_document_ids: Vec<String>,
    /// Counters collected during the run.
    pub metrics: MetricsSnapshot,
}

impl PipelineReport {
    /// Result for one document.
    pub fn result(&self, document_id: &str) -> Option<&DocumentProcessingResult> {
        self.per_document_results.get(document_id)
    }

    /// Results in selection order.
    pub fn ordered_results(&self) -> impl Iterator<Item = &DocumentProcessingResult> {
        self.final_selected_document_ids
            .iter()
            .filter_map(|id| self.per_document_results.get(id))
    }

    /// Whether documents were attempted and none of them succeeded.
    pub fn nothing_processed(&self) -> bool {
        !self.per_document_results.is_empty()
            && self.per_document_results.values().all(|result| !result.is_ok())
    }
}

/// Failure of one stage for one document.
#[derive(Debug, Error)]
pub enum StageError {
    /// Retrieving the document failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// Text extraction failed.
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
    /// Persisting an intermediate artifact failed.
    #[error("artifact write failed: {0}")]
    Artifact(#[from] ArtifactError),
    /// The summarization service failed after retries.
    #[error("summarization failed: {0}")]
    Summarize(#[from] SummarizationClientError),
}

/// Failure that prevents the orchestrator from producing a report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The worker pool stopped handing out slots.
    #[error("Worker pool unavailable: {0}")]
    WorkerPool(String),
}
