use async_trait::async_trait;
use futures::StreamExt;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{ApiResponse, FeedPage};

/// Default bound on a single page request (send + body read).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_PAGE_BYTES: usize = 10 * 1024 * 1024; // 10MB
/// Longest error body kept in [`FetchError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Sort key the feed must be ordered by (newest first).
const SORT_FIELD: &str = "item.additionalFields.postDateTime";

/// Errors that can occur while fetching one feed page.
///
/// None of these are retried inside a sync pass; the next scheduled pass is
/// the retry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    /// Body was not a valid page payload
    #[error("Malformed page payload: {0}")]
    Decode(#[source] serde_json::Error),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// A paginated, newest-first source of feed records.
///
/// Implementations must return records sorted by post date descending; the
/// sync engine's stop-at-first-known-record rule depends on it.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches zero-based page `page` holding at most `size` records.
    async fn fetch_page(&self, page: u32, size: NonZeroU32) -> Result<FeedPage, FetchError>;
}

/// Directory search API client.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: reqwest::Client,
    base_url: Url,
    directory_id: String,
    locale: String,
    timeout: Duration,
}

impl HttpFeedClient {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        directory_id: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            directory_id: directory_id.into(),
            locale: locale.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the request URL for one page.
    pub fn page_url(&self, page: u32, size: NonZeroU32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("item.directoryId", &self.directory_id)
            .append_pair("sort_by", SORT_FIELD)
            .append_pair("sort_order", "desc")
            .append_pair("size", &size.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("item.locale", &self.locale);
        url
    }

    async fn fetch_bytes(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        read_limited_bytes(response, MAX_PAGE_BYTES).await
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch_page(&self, page: u32, size: NonZeroU32) -> Result<FeedPage, FetchError> {
        let url = self.page_url(page, size);
        tracing::debug!(url = %url, page = page, size = size.get(), "Fetching feed page");

        let bytes = tokio::time::timeout(self.timeout, self.fetch_bytes(url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let response: ApiResponse = serde_json::from_slice(&bytes).map_err(FetchError::Decode)?;
        let page_data = FeedPage::from(response);
        tracing::debug!(
            page = page,
            records = page_data.records.len(),
            total = ?page_data.total,
            "Fetched feed page"
        );
        Ok(page_data)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
