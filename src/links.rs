//! Link lists produced by the discovery step.
//!
//! Two on-disk shapes are accepted: a JSON array of descriptors (preferred) and a plain
//! `text<TAB>url` line list. Both are normalized into [`LinkDescriptor`] values in discovery
//! order with duplicate URLs merged.

use percent_encoding::percent_decode_str;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a link list from disk.
#[derive(Debug, Error)]
pub enum LinksError {
    /// The link file could not be read.
    #[error("failed to read link list {path}: {source}")]
    Read {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// One raw file reference discovered on the source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    /// Absolute URL of the referenced file.
    pub url: String,
    /// Anchor text shown on the page.
    #[serde(default)]
    pub text: String,
    /// File name, derived from the URL path when the producer omitted it.
    #[serde(default)]
    pub filename: String,
    /// Optional category guessed by the page-level extractor.
    #[serde(default, alias = "estimated_category")]
    pub category_hint: Option<String>,
}

impl LinkDescriptor {
    /// Build a descriptor from anchor text and URL, deriving the file name.
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        let url = normalize_whitespace(&url.into());
        Self {
            filename: filename_from_url(&url),
            text: normalize_whitespace(&text.into()),
            url,
            category_hint: None,
        }
    }

    /// Attach a page-level category hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.category_hint = Some(hint.into());
        self
    }

    fn normalized(mut self) -> Option<Self> {
        self.url = normalize_whitespace(&self.url);
        if self.url.is_empty() {
            return None;
        }
        self.text = normalize_whitespace(&self.text);
        self.filename = normalize_whitespace(&self.filename);
        if self.filename.is_empty() {
            self.filename = filename_from_url(&self.url);
        }
        self.category_hint = self
            .category_hint
            .map(|hint| normalize_whitespace(&hint))
            .filter(|hint| !hint.is_empty());
        Some(self)
    }

    fn has_informative_hint(&self) -> bool {
        self.category_hint
            .as_deref()
            .is_some_and(|hint| hint != "other")
    }
}

/// Load a link list, preferring the JSON file and falling back to the text file when the JSON
/// file is missing, malformed, or empty.
pub async fn load_links(
    json_path: Option<&Path>,
    text_path: Option<&Path>,
) -> Result<Vec<LinkDescriptor>, LinksError> {
    if let Some(path) = json_path {
        let raw = read_optional(path).await?;
        let links = parse_links_json(&raw);
        if !links.is_empty() {
            tracing::debug!(path = %path.display(), count = links.len(), "Loaded JSON link list");
            return Ok(dedupe_by_url(links));
        }
    }
    if let Some(path) = text_path {
        let raw = read_optional(path).await?;
        let links = parse_links_text(&raw);
        tracing::debug!(path = %path.display(), count = links.len(), "Loaded text link list");
        return Ok(dedupe_by_url(links));
    }
    Ok(Vec::new())
}

async fn read_optional(path: &Path) -> Result<String, LinksError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(LinksError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Parse a JSON array of descriptors, skipping entries without a URL. Malformed input yields
/// an empty list rather than an error.
pub fn parse_links_json(raw: &str) -> Vec<LinkDescriptor> {
    let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(raw) else {
        return Vec::new();
    };
    values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<LinkDescriptor>(value).ok())
        .filter_map(LinkDescriptor::normalized)
        .collect()
}

/// Parse `text<TAB>url` lines; a line without a tab is treated as a bare URL.
pub fn parse_links_text(raw: &str) -> Vec<LinkDescriptor> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (text, url) = line.split_once('\t').unwrap_or(("", line));
            LinkDescriptor::new(text, url).normalized()
        })
        .collect()
}

/// Merge duplicate URLs, keeping the first occurrence's position and back-filling missing text
/// or an uninformative category hint from later duplicates.
pub fn dedupe_by_url(links: Vec<LinkDescriptor>) -> Vec<LinkDescriptor> {
    let mut merged: Vec<LinkDescriptor> = Vec::with_capacity(links.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for link in links {
        match positions.get(&link.url) {
            Some(&index) => {
                let existing = &mut merged[index];
                if existing.text.is_empty() && !link.text.is_empty() {
                    existing.text = link.text;
                }
                if !existing.has_informative_hint() && link.category_hint.is_some() {
                    existing.category_hint = link.category_hint;
                }
            }
            None => {
                positions.insert(link.url.clone(), merged.len());
                merged.push(link);
            }
        }
    }
    merged
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub(crate) fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the final path segment of a URL, percent-decoded. Unparseable URLs yield an empty name.
pub(crate) fn filename_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .unwrap_or_default()
}
