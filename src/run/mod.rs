//! Run context and the end-to-end `select` and `execute` entry points.
//!
//! Every run owns one directory, `<tmp_root>/<run_id>/`, and nothing written there is shared
//! with other runs. Re-running with the same id overwrites the previous artifacts.

mod artifacts;

pub use artifacts::{ArtifactError, ArtifactStore, SAFE_NAME_MAX_BYTES, safe_filename_part};

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::config::Config;
use crate::extract::{PdfProbe, PdfTools};
use crate::fetch::{ContentFetcher, FetchError, HttpFetcher};
use crate::links::LinkDescriptor;
use crate::metrics::RunMetrics;
use crate::pipeline::{
    DocumentPipeline, DocumentProcessor, PipelineError, PipelineOrchestrator, PipelineReport,
    PipelineSettings,
};
use crate::selection::{
    DeferredResolver, ScoringEngine, SelectionOutcome, SelectionPolicy, StructuralProbe,
};
use crate::summarization::{SummarizationClientError, SummaryService, get_summarization_client};

/// Scored candidates in discovery order.
pub const SCORED_CANDIDATES_FILE: &str = "scored-candidates.json";
/// Selection results and detected pairs.
pub const SELECTION_FILE: &str = "selection.json";
/// Deferred decisions and the final selection.
pub const DEFERRED_DECISIONS_FILE: &str = "deferred-decisions.json";
/// Aggregate pipeline report.
pub const PIPELINE_REPORT_FILE: &str = "pipeline-report.json";

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Collaborators could not be built from configuration.
    #[error("Configuration error: {0}")]
    Config(String),
    /// An artifact could not be written.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// The orchestrator could not run.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The requested run id would not stay inside the run root.
    #[error("Invalid run id {0:?}: must be a single path segment")]
    InvalidRunId(String),
    /// Documents were attempted and every one of them failed.
    #[error("No document could be processed ({failed} failed); report written to {report}")]
    NoDocumentProcessed {
        /// Number of failed documents.
        failed: usize,
        /// Path of the persisted report.
        report: PathBuf,
    },
}

impl From<FetchError> for RunError {
    fn from(error: FetchError) -> Self {
        RunError::Config(error.to_string())
    }
}

impl From<SummarizationClientError> for RunError {
    fn from(error: SummarizationClientError) -> Self {
        RunError::Config(error.to_string())
    }
}

/// Identity and storage of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    store: ArtifactStore,
}

impl RunContext {
    /// Context for `run_id` (or a fresh id) below `tmp_root`.
    ///
    /// The id must be one plain path segment, so the run directory never leaves `tmp_root`.
    pub fn new(tmp_root: &Path, run_id: Option<String>) -> Result<Self, RunError> {
        let run_id = match run_id.filter(|id| !id.trim().is_empty()) {
            Some(id) if is_single_segment(&id) => id,
            Some(id) => return Err(RunError::InvalidRunId(id)),
            None => make_run_id(),
        };
        let store = ArtifactStore::new(tmp_root.join(&run_id));
        Ok(Self { run_id, store })
    }

    /// Run identifier.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run directory.
    pub fn run_dir(&self) -> &Path {
        self.store.root()
    }

    /// Artifact store for the run directory.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
}

fn is_single_segment(id: &str) -> bool {
    if id.contains(['/', '\\']) || id.chars().any(char::is_control) {
        return false;
    }
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// New run id of the form `YYYYMMDDTHHMMSSZ_<6 hex>`.
pub fn make_run_id() -> String {
    let format = format_description!("[year][month][day]T[hour][minute][second]Z");
    let stamp = OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| "00000000T000000Z".to_string());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{stamp}_{}", &suffix[..6])
}

/// Collaborators used by [`execute`].
#[derive(Clone)]
pub struct RunServices {
    /// Probe for deferred pairs.
    pub probe: Arc<dyn StructuralProbe>,
    /// Budget for one probe.
    pub probe_timeout: Duration,
    /// Per-document pipeline.
    pub processor: Arc<dyn DocumentProcessor>,
    /// Concurrency and timeout limits.
    pub settings: PipelineSettings,
}

impl RunServices {
    /// Production collaborators built from configuration.
    pub fn from_config(config: &Config, context: &RunContext) -> Result<Self, RunError> {
        let fetcher: Arc<dyn ContentFetcher> =
            Arc::new(HttpFetcher::new(config.fetch_timeout, config.fetch_max_bytes)?);
        let tools = PdfTools::new(config.pdfinfo_bin.clone(), config.pdftotext_bin.clone());
        let probe = Arc::new(PdfProbe::new(
            Arc::clone(&fetcher),
            tools.clone(),
            context.run_dir().join("probes"),
        ));
        let summarizer = SummaryService::new(
            get_summarization_client(config)?,
            config.summarization_retries,
        );
        let processor = Arc::new(DocumentPipeline::new(
            fetcher,
            Arc::new(tools),
            summarizer,
            context.store().clone(),
        ));
        Ok(Self {
            probe,
            probe_timeout: config.probe_timeout,
            processor,
            settings: PipelineSettings {
                max_workers: config.max_workers,
                document_timeout: config.document_timeout,
            },
        })
    }
}

/// Score and select candidates, writing the scoring and selection artifacts.
pub async fn select(
    context: &RunContext,
    engine: &ScoringEngine,
    policy: &SelectionPolicy,
    links: &[LinkDescriptor],
    minutes_text: &str,
) -> Result<SelectionOutcome, RunError> {
    let candidates = engine.score(links, minutes_text);
    context
        .store()
        .write_json(SCORED_CANDIDATES_FILE, &candidates)
        .await?;
    let outcome = policy.select(candidates);
    context.store().write_json(SELECTION_FILE, &outcome).await?;
    tracing::info!(
        run_id = %context.run_id(),
        selected = outcome.selected().count(),
        pending_groups = outcome.deferred_groups.len(),
        "Selection written"
    );
    Ok(outcome)
}

/// Run scoring, selection, deferred resolution, and the document pipelines.
///
/// The report is always persisted before returning. When documents were attempted and all of
/// them failed the run ends with [`RunError::NoDocumentProcessed`].
pub async fn execute(
    context: &RunContext,
    engine: &ScoringEngine,
    policy: &SelectionPolicy,
    services: &RunServices,
    links: &[LinkDescriptor],
    minutes_text: &str,
) -> Result<PipelineReport, RunError> {
    let outcome = select(context, engine, policy, links, minutes_text).await?;
    let metrics = RunMetrics::new();

    let resolver =
        DeferredResolver::new(Arc::clone(&services.probe)).with_probe_timeout(services.probe_timeout);
    let selection = resolver.resolve(&outcome, &metrics).await;
    context
        .store()
        .write_json(DEFERRED_DECISIONS_FILE, &selection)
        .await?;

    let orchestrator = PipelineOrchestrator::new(Arc::clone(&services.processor), services.settings);
    let report = orchestrator.run(&selection, &metrics).await?;
    let report_path = context
        .store()
        .write_json(PIPELINE_REPORT_FILE, &report)
        .await?;
    tracing::info!(run_id = %context.run_id(), report = %report_path.display(), "Run complete");

    if report.nothing_processed() {
        return Err(RunError::NoDocumentProcessed {
            failed: report.per_document_results.len(),
            report: report_path,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_have_timestamp_and_suffix() {
        let id = make_run_id();
        let (stamp, suffix) = id.split_once('_').expect("separator");
        assert_eq!(stamp.len(), 16);
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.as_bytes()[8], b'T');
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn context_uses_given_id_below_root() {
        let context = RunContext::new(Path::new("tmp/runs"), Some("r1".into())).expect("context");
        assert_eq!(context.run_id(), "r1");
        assert_eq!(context.run_dir(), Path::new("tmp/runs/r1"));

        let generated = RunContext::new(Path::new("tmp/runs"), Some("  ".into())).expect("context");
        assert_ne!(generated.run_id(), "  ");
        assert!(generated.run_dir().starts_with("tmp/runs"));
    }

    #[test]
    fn run_ids_cannot_leave_the_root() {
        for id in ["/var/tmp/elsewhere", "../../etc/x", "..", ".", "a/b", "a\\b", "r1\n"] {
            let error = RunContext::new(Path::new("tmp/runs"), Some(id.into()))
                .expect_err("rejected id");
            assert!(matches!(error, RunError::InvalidRunId(ref rejected) if rejected == id), "{id}");
        }
        assert!(RunContext::new(Path::new("tmp/runs"), Some("20250101T000000Z_abc123".into())).is_ok());
    }
}
