//! Per-run artifact directory.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest safe file-name part, in UTF-8 bytes.
pub const SAFE_NAME_MAX_BYTES: usize = 120;

/// Errors raised while persisting artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Writing a file or creating its directory failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Serializing a JSON artifact failed.
    #[error("Failed to serialize {name}: {source}")]
    Serialize {
        /// Artifact name.
        name: String,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Writes artifacts below one run directory. Every write replaces the previous file.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Run directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write pretty-printed JSON to `<root>/<name>`.
    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, ArtifactError> {
        let body = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Serialize {
            name: name.to_string(),
            source,
        })?;
        self.write_bytes(Path::new(name), &body).await
    }

    /// Write raw bytes to a path relative to the run directory.
    pub async fn write_bytes(&self, relative: &Path, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        let path = self.root.join(relative);
        let io_error = |source| ArtifactError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(io_error)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote artifact");
        Ok(path)
    }

    /// Relative path of the downloaded file for the document at 1-based `position`.
    pub fn document_file(position: usize, title: &str, filename: &str) -> PathBuf {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or("pdf");
        PathBuf::from("documents").join(format!(
            "{position:02}-{}.{extension}",
            safe_filename_part(title)
        ))
    }

    /// Relative path of the extracted text for a document.
    pub fn extracted_file(document_id: &str) -> PathBuf {
        PathBuf::from("extracted").join(format!("{document_id}.txt"))
    }
}

/// File-name-safe rendering of a title, at most [`SAFE_NAME_MAX_BYTES`] bytes.
///
/// Control and reserved characters become `_`, whitespace runs collapse to `_`, and the
/// result is cut on a character boundary. Empty results become `pdf`.
pub fn safe_filename_part(text: &str) -> String {
    let mut safe = String::with_capacity(text.len());
    let mut last_was_gap = false;
    for c in text.trim().chars() {
        let mapped = if c.is_whitespace() {
            '_'
        } else if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
            '_'
        } else {
            c
        };
        let is_gap = mapped == '_';
        if is_gap && last_was_gap {
            continue;
        }
        last_was_gap = is_gap;
        safe.push(mapped);
    }

    let mut cut = safe.len().min(SAFE_NAME_MAX_BYTES);
    while !safe.is_char_boundary(cut) {
        cut -= 1;
    }
    safe.truncate(cut);
    let trimmed = safe.trim_end_matches(['.', '_', ' ']);
    if trimmed.is_empty() {
        "pdf".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_names_replace_reserved_characters() {
        assert_eq!(safe_filename_part("資料1: 概要/本文"), "資料1_概要_本文");
        assert_eq!(safe_filename_part("  "), "pdf");
        assert_eq!(safe_filename_part("a\tb  c."), "a_b_c");
    }

    #[test]
    fn safe_names_truncate_on_char_boundary() {
        let long = "報".repeat(100);
        let safe = safe_filename_part(&long);
        assert!(safe.len() <= SAFE_NAME_MAX_BYTES);
        assert_eq!(safe.chars().count(), SAFE_NAME_MAX_BYTES / 3);
    }

    #[test]
    fn document_files_are_numbered() {
        assert_eq!(
            ArtifactStore::document_file(3, "中間報告書", "hokoku.PDF"),
            PathBuf::from("documents/03-中間報告書.PDF")
        );
        assert_eq!(
            ArtifactStore::document_file(12, "", "noext"),
            PathBuf::from("documents/12-pdf.pdf")
        );
    }

    #[tokio::test]
    async fn json_writes_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path().join("run"));
        store.write_json("a.json", &vec![1, 2, 3]).await.expect("first");
        let path = store.write_json("a.json", &vec![4]).await.expect("second");
        let written: Vec<i32> =
            serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("json");
        assert_eq!(written, vec![4]);
    }
}
