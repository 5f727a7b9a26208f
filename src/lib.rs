#![deny(missing_docs)]

//! Document selection and processing pipeline for meeting-material pages.

/// Environment-driven configuration management.
pub mod config;
/// Structural probing and text extraction through poppler tools.
pub mod extract;
/// Document retrieval with a browser-identity fallback.
pub mod fetch;
/// Link list input and normalisation.
pub mod links;
/// Structured logging and tracing setup.
pub mod logging;
/// Per-run counters.
pub mod metrics;
/// Per-document stages and the parallel orchestrator.
pub mod pipeline;
/// Run context, artifacts, and end-to-end entry points.
pub mod run;
/// Scoring, selection, and deferred pair resolution.
pub mod selection;
/// Summarization client abstraction and adapters.
pub mod summarization;
