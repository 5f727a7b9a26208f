//! Per-document stages and the orchestrator that runs them in parallel.

pub mod classify;
pub mod convert;
pub mod document;
pub mod orchestrator;
pub mod read_strategy;
pub mod types;

pub use document::{DocumentPipeline, DocumentProcessor};
pub use orchestrator::{PipelineOrchestrator, PipelineSettings};
pub use types::{
    ContentFormat, ConvertedContent, DocumentProcessingResult, DocumentType, PipelineError,
    PipelineReport, ProcessingStatus, ReadStrategy, StageError,
};
