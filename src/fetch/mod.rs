//! Document retrieval over HTTP.
//!
//! The default request identifies itself as `pagereport`. Sites that reject it (403/406/429) or
//! drop the connection get one more attempt with a desktop-browser identity.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// User agent sent on the first attempt.
pub const DEFAULT_USER_AGENT: &str = concat!("pagereport/", env!("CARGO_PKG_VERSION"));
/// User agent sent on the fallback attempt.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Errors surfaced while fetching a document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered 404.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// Server refused the request with 403.
    #[error("Access forbidden: {0}")]
    Forbidden(String),
    /// Request did not complete within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// Server answered with another non-success status.
    #[error("Unexpected status {status} for {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// Body exceeded the byte limit.
    #[error("Response too large (>{limit} bytes): {url}")]
    TooLarge {
        /// Requested URL.
        url: String,
        /// Configured byte limit.
        limit: usize,
    },
    /// Body is neither a PDF signature nor served as PDF.
    #[error("Not a PDF: {url} (content type {content_type:?})")]
    NotPdf {
        /// Requested URL.
        url: String,
        /// Content type reported by the server.
        content_type: String,
    },
    /// Transport or client construction failure.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl FetchError {
    /// Whether a retry with the browser identity may succeed.
    fn warrants_browser_retry(&self) -> bool {
        match self {
            FetchError::Forbidden(_) | FetchError::Timeout(_) | FetchError::Http(_) => true,
            FetchError::Status { status, .. } => matches!(status, 406 | 429),
            _ => false,
        }
    }
}

/// Raw document body together with response metadata.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// URL that was requested.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    /// Lower-cased `Content-Type` header, empty when absent.
    pub content_type: String,
    /// Response body.
    pub bytes: Vec<u8>,
    /// Whether the browser identity was needed.
    pub used_fallback_identity: bool,
}

impl FetchedDocument {
    /// Whether the body looks like a PDF, by signature or declared type.
    pub fn is_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF-") || self.content_type.contains("pdf")
    }

    fn ensure_pdf(self) -> Result<Self, FetchError> {
        if self.is_pdf() {
            Ok(self)
        } else {
            Err(FetchError::NotPdf {
                url: self.url,
                content_type: self.content_type,
            })
        }
    }
}

/// Retrieves raw document bytes for a URL.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the document at `url`.
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError>;
}

/// `reqwest`-backed fetcher accepting PDF documents only.
#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
    max_bytes: usize,
}

impl HttpFetcher {
    /// Build a fetcher with a per-request timeout and a body size limit.
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|error| FetchError::Http(format!("failed to build HTTP client: {error}")))?;
        Ok(Self { http, max_bytes })
    }

    fn request(&self, url: &str, browser_identity: bool) -> RequestBuilder {
        let request = self.http.get(url);
        if browser_identity {
            request
                .header(USER_AGENT, BROWSER_USER_AGENT)
                .header(ACCEPT, "text/html,application/pdf,application/octet-stream,*/*")
                .header(ACCEPT_LANGUAGE, "ja,en-US;q=0.9,en;q=0.8")
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache")
        } else {
            request.header(ACCEPT, "*/*")
        }
    }

    async fn attempt(&self, url: &str, browser_identity: bool) -> Result<FetchedDocument, FetchError> {
        let mut response = self
            .request(url, browser_identity)
            .send()
            .await
            .map_err(|error| transport_error(url, error))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound(url.to_string())),
            StatusCode::FORBIDDEN => return Err(FetchError::Forbidden(url.to_string())),
            status => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
        }

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };
        if response
            .content_length()
            .is_some_and(|length| length > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|error| transport_error(url, error))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedDocument {
            url: url.to_string(),
            final_url,
            content_type,
            bytes,
            used_fallback_identity: browser_identity,
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let document = match self.attempt(url, false).await {
            Ok(document) => document,
            Err(error) if error.warrants_browser_retry() => {
                tracing::info!(url, error = %error, "Retrying with browser identity");
                self.attempt(url, true).await?
            }
            Err(error) => return Err(error),
        };
        tracing::debug!(
            url,
            bytes = document.bytes.len(),
            fallback = document.used_fallback_identity,
            "Fetched document"
        );
        document.ensure_pdf()
    }
}

fn transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Http(format!("{url}: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};

    const PDF_BODY: &[u8] = b"%PDF-1.7\n%fake\n";

    fn fetcher(max_bytes: usize) -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), max_bytes).expect("client")
    }

    #[tokio::test]
    async fn fetches_pdf_with_default_identity() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/doc.pdf")
                    .header("user-agent", DEFAULT_USER_AGENT);
                then.status(200)
                    .header("content-type", "application/pdf")
                    .body(PDF_BODY);
            })
            .await;

        let document = fetcher(1024)
            .fetch(&server.url("/doc.pdf"))
            .await
            .expect("document");

        mock.assert();
        assert_eq!(document.bytes, PDF_BODY);
        assert_eq!(document.content_type, "application/pdf");
        assert!(!document.used_fallback_identity);
    }

    #[tokio::test]
    async fn retries_with_browser_identity_when_forbidden() {
        let server = MockServer::start_async().await;
        let rejected = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/doc.pdf")
                    .header("user-agent", DEFAULT_USER_AGENT);
                then.status(403);
            })
            .await;
        let accepted = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/doc.pdf")
                    .header("user-agent", BROWSER_USER_AGENT);
                then.status(200).body(PDF_BODY);
            })
            .await;

        let document = fetcher(1024)
            .fetch(&server.url("/doc.pdf"))
            .await
            .expect("document");

        rejected.assert();
        accepted.assert();
        assert!(document.used_fallback_identity);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.pdf");
                then.status(404);
            })
            .await;

        let error = fetcher(1024)
            .fetch(&server.url("/missing.pdf"))
            .await
            .expect_err("missing");

        mock.assert_hits(1);
        assert!(matches!(error, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_non_pdf_and_oversized_bodies() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/page.html");
                then.status(200)
                    .header("content-type", "text/html")
                    .body("<html></html>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/big.pdf");
                then.status(200).body(vec![b'%'; 4096]);
            })
            .await;

        let not_pdf = fetcher(1024)
            .fetch(&server.url("/page.html"))
            .await
            .expect_err("html");
        assert!(matches!(not_pdf, FetchError::NotPdf { .. }));

        let too_large = fetcher(1024)
            .fetch(&server.url("/big.pdf"))
            .await
            .expect_err("too large");
        assert!(matches!(too_large, FetchError::TooLarge { limit: 1024, .. }));
    }
}
