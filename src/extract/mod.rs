//! Page counting and text extraction through poppler's `pdfinfo` and `pdftotext`.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio::process::Command;

use crate::fetch::{ContentFetcher, FetchError};
use crate::selection::{CandidateDocument, StructuralProbe};

static PAGES_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Pages:\s+(\d+)").expect("valid regex"));

/// Errors raised while measuring or extracting a document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document could not be retrieved.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Reading or writing a local file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The external tool could not be started.
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        /// Executable name or path.
        tool: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The external tool exited unsuccessfully.
    #[error("{tool} failed ({status}): {stderr}")]
    ToolFailed {
        /// Executable name or path.
        tool: String,
        /// Exit status description.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },
    /// `pdfinfo` output had no `Pages:` line.
    #[error("No page count reported for {0}")]
    PageCountMissing(String),
}

/// Extracted text, one entry per page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    /// Page texts in document order.
    pub pages: Vec<String>,
}

impl ExtractedText {
    /// Split `pdftotext` output on form feeds, dropping the empty tail after the final one.
    pub fn from_form_feeds(raw: &str) -> Self {
        let mut pages: Vec<String> = raw.split('\u{c}').map(str::to_string).collect();
        if pages.last().is_some_and(|page| page.trim().is_empty()) {
            pages.pop();
        }
        Self { pages }
    }

    /// All pages joined back together with form feeds.
    pub fn full_text(&self) -> String {
        self.pages.join("\u{c}")
    }

    /// Whether no page contains any non-whitespace character.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.trim().is_empty())
    }
}

/// Turns a stored document into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract every page of the document at `path`.
    async fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractError>;
}

/// Thin wrapper over the poppler command-line tools.
#[derive(Debug, Clone)]
pub struct PdfTools {
    pdfinfo_bin: String,
    pdftotext_bin: String,
}

impl Default for PdfTools {
    fn default() -> Self {
        Self::new("pdfinfo", "pdftotext")
    }
}

impl PdfTools {
    /// Tools resolved from the given executable names or paths.
    pub fn new(pdfinfo_bin: impl Into<String>, pdftotext_bin: impl Into<String>) -> Self {
        Self {
            pdfinfo_bin: pdfinfo_bin.into(),
            pdftotext_bin: pdftotext_bin.into(),
        }
    }

    /// Number of pages reported by `pdfinfo`.
    pub async fn page_count(&self, path: &Path) -> Result<u32, ExtractError> {
        let stdout = run_tool(&self.pdfinfo_bin, &[path.as_os_str()]).await?;
        parse_page_count(&stdout).ok_or_else(|| ExtractError::PageCountMissing(path.display().to_string()))
    }
}

#[async_trait]
impl TextExtractor for PdfTools {
    async fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractError> {
        let stdout = run_tool(
            &self.pdftotext_bin,
            &[path.as_os_str(), std::ffi::OsStr::new("-")],
        )
        .await?;
        Ok(ExtractedText::from_form_feeds(&stdout))
    }
}

async fn run_tool(tool: &str, args: &[&std::ffi::OsStr]) -> Result<String, ExtractError> {
    // Dropping the future (e.g. on a document timeout) must not leave the tool running.
    let output = Command::new(tool)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ExtractError::Spawn {
            tool: tool.to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(ExtractError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Read the `Pages:` line of `pdfinfo` output.
pub fn parse_page_count(pdfinfo_output: &str) -> Option<u32> {
    PAGES_LINE
        .captures(pdfinfo_output)
        .and_then(|captures| captures[1].parse().ok())
}

/// Structural probe that downloads a candidate and counts its pages.
pub struct PdfProbe {
    fetcher: Arc<dyn ContentFetcher>,
    tools: PdfTools,
    work_dir: PathBuf,
}

impl PdfProbe {
    /// Probe storing downloaded files under `work_dir`.
    pub fn new(fetcher: Arc<dyn ContentFetcher>, tools: PdfTools, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            tools,
            work_dir: work_dir.into(),
        }
    }
}

#[async_trait]
impl StructuralProbe for PdfProbe {
    async fn measure(&self, candidate: &CandidateDocument) -> Result<u32, ExtractError> {
        let document = self.fetcher.fetch(&candidate.url).await?;
        let path = self.work_dir.join(format!("{}.pdf", candidate.id));
        let io_error = |source| ExtractError::Io {
            path: path.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(io_error)?;
        tokio::fs::write(&path, &document.bytes)
            .await
            .map_err(io_error)?;
        self.tools.page_count(&path).await
    }
}
