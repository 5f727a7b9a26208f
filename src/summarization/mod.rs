//! Abstractions for summarizing one document through a hosted language model.
//!
//! The pipeline only depends on [`SummarizationClient`]; the OpenAI-compatible client below is the
//! production implementation. [`SummaryService`] wraps any client with retries and the output
//! normalisation every summary goes through.

use crate::config::Config;
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;

/// Longest summary kept after post-processing, in characters.
pub const SUMMARY_MAX_CHARS: usize = 2000;
/// `empty_reason` recorded when the provider flags empty content without saying why.
pub const SUMMARIZER_EMPTY_REASON: &str = "reported empty by summarizer";
/// Largest number of key points kept.
pub const MAX_KEY_POINTS: usize = 8;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

const SYSTEM_PROMPT: &str = "You summarize Japanese policy documents precisely. \
Use only provided text, do not infer unstated facts. \
If content is effectively empty (cover-only etc.), return empty_content=true. \
Write summary in plain Japanese with concrete subject from content. \
Do not start summary with generic lead-ins like '本資料は' or 'この資料は'. \
Keep most major points that appear in key_points. \
Target roughly 800-1600 Japanese characters when material is substantial, \
and keep summary within 2000 characters.";

static GENERIC_OPENING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:本資料|この資料|本書|本報告書|本文書)は[、,\s]*").expect("valid regex")
});

/// Errors surfaced while attempting summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable, overloaded, or rate limiting; worth retrying.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider rejected the request.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl SummarizationClientError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SummarizationClientError::ProviderUnavailable(_))
    }
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone, Serialize)]
pub struct SummarizationRequest {
    /// Display title of the document.
    pub document_title: String,
    /// Classified document type, e.g. `word_like`.
    pub document_type: String,
    /// Read strategy used to prepare `text`.
    pub read_strategy: String,
    /// Prepared excerpt.
    pub text: String,
}

/// Structured answer returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Natural-language summary.
    pub summary: String,
    /// Ordered key points.
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Whether the provider found nothing worth summarizing.
    #[serde(default)]
    pub empty_content: bool,
    /// Why the content counts as empty.
    #[serde(default)]
    pub empty_reason: Option<String>,
}

/// Interface implemented by summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Summarize one prepared excerpt.
    async fn generate_summary(
        &self,
        request: &SummarizationRequest,
    ) -> Result<DocumentSummary, SummarizationClientError>;
}

/// Build the chat-completions client from configuration.
pub fn get_summarization_client(
    config: &Config,
) -> Result<Arc<dyn SummarizationClient>, SummarizationClientError> {
    let api_key = config
        .require_api_key()
        .map_err(|error| SummarizationClientError::ProviderUnavailable(error.to_string()))?;
    let client = OpenAiSummarizationClient::new(
        config.summarization_api_base.clone(),
        api_key.to_string(),
        config.summarization_model.clone(),
    )?;
    Ok(Arc::new(client))
}

/// Client for OpenAI-compatible `/chat/completions` endpoints using structured output.
pub struct OpenAiSummarizationClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizationClient {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
    ) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent(concat!("pagereport/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn response_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "summary": {"type": "string"},
            "key_points": {"type": "array", "items": {"type": "string"}, "maxItems": MAX_KEY_POINTS},
            "empty_content": {"type": "boolean"},
            "empty_reason": {"type": ["string", "null"]}
        },
        "required": ["summary", "key_points", "empty_content", "empty_reason"]
    })
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl SummarizationClient for OpenAiSummarizationClient {
    async fn generate_summary(
        &self,
        request: &SummarizationRequest,
    ) -> Result<DocumentSummary, SummarizationClientError> {
        let user_payload = serde_json::to_string(request).map_err(|error| {
            SummarizationClientError::GenerationFailed(format!("failed to encode request: {error}"))
        })?;
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_payload}
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "document_summary",
                    "schema": response_schema(),
                    "strict": true
                }
            },
            "temperature": 0
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "provider returned {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode chat completion: {error}"
            ))
        })?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("response carried no message content".into())
            })?;

        serde_json::from_str(&content).map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "message content is not a summary object: {error}"
            ))
        })
    }
}

/// Retry an async operation while `is_retryable` accepts the error, doubling the delay each time.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    retries: usize,
    base_delay: Duration,
    is_retryable: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = base_delay;
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < retries && is_retryable(&error) => {
                attempt += 1;
                tracing::warn!(
                    attempt,
                    retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient failure; retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Summarization with retries and output normalisation.
#[derive(Clone)]
pub struct SummaryService {
    client: Arc<dyn SummarizationClient>,
    retries: usize,
    base_delay: Duration,
}

impl SummaryService {
    /// Wrap `client`, retrying transient failures up to `retries` extra times.
    pub fn new(client: Arc<dyn SummarizationClient>, retries: usize) -> Self {
        Self {
            client,
            retries,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the first retry delay.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Summarize and normalise the provider output.
    pub async fn summarize(
        &self,
        request: &SummarizationRequest,
    ) -> Result<DocumentSummary, SummarizationClientError> {
        let raw = retry_with_backoff(
            || self.client.generate_summary(request),
            self.retries,
            self.base_delay,
            SummarizationClientError::is_transient,
        )
        .await?;
        Ok(post_process(raw))
    }
}

/// Strip generic openings, cap the summary length, and cap the key points.
///
/// An empty-content answer always carries a reason.
pub fn post_process(mut summary: DocumentSummary) -> DocumentSummary {
    let opened = normalize_summary_opening(&summary.summary);
    summary.summary = enforce_max_chars(&opened, SUMMARY_MAX_CHARS);
    summary.key_points.truncate(MAX_KEY_POINTS);
    if summary.empty_content
        && summary
            .empty_reason
            .as_deref()
            .is_none_or(|reason| reason.trim().is_empty())
    {
        summary.empty_reason = Some(SUMMARIZER_EMPTY_REASON.to_string());
    }
    summary
}

/// Remove lead-ins such as `本資料は、`.
pub fn normalize_summary_opening(text: &str) -> String {
    GENERIC_OPENING.replace(text.trim(), "").into_owned()
}

/// Cut at the last sentence end in the second half of the budget, else hard-cut.
pub fn enforce_max_chars(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let clipped: Vec<char> = trimmed.chars().take(max_chars).collect();
    let sentence_end = clipped
        .iter()
        .rposition(|c| matches!(c, '。' | '.' | '．'));
    match sentence_end {
        Some(index) if index >= max_chars / 2 => clipped[..=index].iter().collect(),
        _ => clipped.into_iter().collect(),
    }
}
