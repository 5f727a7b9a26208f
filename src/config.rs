use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TMP_ROOT: &str = "tmp/runs";
const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_DOCUMENT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_FETCH_MAX_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_SUMMARY_MODEL: &str = "gpt-5-mini";
const DEFAULT_SUMMARY_RETRIES: usize = 2;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory under which each run gets its own artifact directory.
    pub tmp_root: PathBuf,
    /// Upper bound on concurrently processed documents.
    pub max_workers: usize,
    /// Wall-clock budget for one document's classify/convert/summarize pipeline.
    pub document_timeout: Duration,
    /// Timeout applied to each HTTP request made by the fetcher.
    pub fetch_timeout: Duration,
    /// Budget for measuring one full variant while resolving a pair.
    pub probe_timeout: Duration,
    /// Largest document body accepted by the fetcher.
    pub fetch_max_bytes: usize,
    /// Base URL of the OpenAI-compatible summarization API.
    pub summarization_api_base: String,
    /// API key for the summarization API; only required when the full pipeline runs.
    pub summarization_api_key: Option<String>,
    /// Model identifier passed to the summarization API.
    pub summarization_model: String,
    /// Additional attempts made after a transient summarization failure.
    pub summarization_retries: usize,
    /// Path or name of the `pdfinfo` executable.
    pub pdfinfo_bin: String,
    /// Path or name of the `pdftotext` executable.
    pub pdftotext_bin: String,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            tmp_root: load_env_optional("PAGEREPORT_TMP_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TMP_ROOT)),
            max_workers: parse_optional("PAGEREPORT_MAX_WORKERS")?
                .unwrap_or(DEFAULT_MAX_WORKERS)
                .max(1),
            document_timeout: Duration::from_secs(
                parse_optional("PAGEREPORT_DOCUMENT_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_DOCUMENT_TIMEOUT_SECS),
            ),
            fetch_timeout: Duration::from_secs(
                parse_optional("PAGEREPORT_FETCH_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
            probe_timeout: Duration::from_secs(
                parse_optional("PAGEREPORT_PROBE_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS),
            ),
            fetch_max_bytes: parse_optional("PAGEREPORT_FETCH_MAX_BYTES")?
                .unwrap_or(DEFAULT_FETCH_MAX_BYTES),
            summarization_api_base: load_env_optional("OPENAI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            summarization_api_key: load_env_optional("OPENAI_API_KEY"),
            summarization_model: load_env_optional("PAGEREPORT_SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            summarization_retries: parse_optional("PAGEREPORT_SUMMARY_RETRIES")?
                .unwrap_or(DEFAULT_SUMMARY_RETRIES),
            pdfinfo_bin: load_env_optional("PAGEREPORT_PDFINFO_BIN")
                .unwrap_or_else(|| "pdfinfo".to_string()),
            pdftotext_bin: load_env_optional("PAGEREPORT_PDFTOTEXT_BIN")
                .unwrap_or_else(|| "pdftotext".to_string()),
        })
    }

    /// Return the API key or a configuration error naming the missing variable.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.summarization_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("OPENAI_API_KEY".to_string()))
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        tmp_root = %config.tmp_root.display(),
        max_workers = config.max_workers,
        document_timeout_secs = config.document_timeout.as_secs(),
        model = %config.summarization_model,
        has_api_key = config.summarization_api_key.is_some(),
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_env(key: &str, value: &str) {
        // SAFETY: Each test uses variables unique to itself.
        unsafe { env::set_var(key, value) }
    }

    #[test]
    fn parse_optional_rejects_garbage() {
        set_env("PAGEREPORT_TEST_GARBAGE_WORKERS", "many");
        let error = parse_optional::<usize>("PAGEREPORT_TEST_GARBAGE_WORKERS").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(name) if name == "PAGEREPORT_TEST_GARBAGE_WORKERS"));
    }

    #[test]
    fn parse_optional_treats_blank_as_absent() {
        set_env("PAGEREPORT_TEST_BLANK_TIMEOUT", "   ");
        let value = parse_optional::<u64>("PAGEREPORT_TEST_BLANK_TIMEOUT").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn missing_api_key_is_reported_by_name() {
        let config = Config {
            tmp_root: PathBuf::from(DEFAULT_TMP_ROOT),
            max_workers: 1,
            document_timeout: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(1),
            fetch_max_bytes: 1,
            summarization_api_base: DEFAULT_API_BASE.into(),
            summarization_api_key: None,
            summarization_model: DEFAULT_SUMMARY_MODEL.into(),
            summarization_retries: 0,
            pdfinfo_bin: "pdfinfo".into(),
            pdftotext_bin: "pdftotext".into(),
        };
        let error = config.require_api_key().unwrap_err();
        assert_eq!(error.to_string(), "Missing environment variable: OPENAI_API_KEY");
    }
}
