//! ransomware.live API client implementation
//!
//! Implements the UpstreamClient trait over reqwest. Every request carries the
//! configured API key; transport failures are retried with exponential backoff
//! inside the caller's timeout budget.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::{McpError, Result};
use crate::upstream::client::{UpstreamClient, UpstreamError, UpstreamRequest};

/// ransomware.live PRO API base URL
pub const DEFAULT_BASE_URL: &str = "https://api-pro.ransomware.live";

/// Header carrying the API credential
const API_KEY_HEADER: &str = "X-API-KEY";

/// Max characters of an error body kept in an UpstreamError
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Resolved settings for the upstream client
#[derive(Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub api_key: String,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl ClientSettings {
    /// Settings for the public API endpoint with the given key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            max_attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override retry behaviour
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }
}

// Keep the key out of debug output
impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// ransomware.live API client
pub struct RansomwareLiveClient {
    client: Client,
    base_url: Url,
    api_key: String,
    max_attempts: u32,
    backoff: Duration,
}

impl RansomwareLiveClient {
    /// Create a client from resolved settings
    pub fn new(settings: ClientSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(McpError::Config("API key is empty".to_string()));
        }

        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| McpError::Config(format!("Invalid base URL '{}': {}", settings.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(McpError::Config(format!("Base URL cannot carry a path: {}", settings.base_url)));
        }

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key,
            max_attempts: settings.max_attempts.max(1),
            backoff: settings.backoff,
        })
    }

    /// Join the request's path segments onto the base URL, percent-encoding each one
    fn build_url(&self, request: &UpstreamRequest) -> std::result::Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| UpstreamError::InvalidResponse("base URL cannot carry a path".to_string()))?;
            segments.pop_if_empty();
            segments.extend(request.segments.iter().map(String::as_str));
        }
        Ok(url)
    }

    /// One HTTP round trip, no retries
    async fn send_once(
        &self,
        url: &Url,
        request: &UpstreamRequest,
        timeout: Duration,
    ) -> std::result::Result<Value, UpstreamError> {
        let response = self
            .client
            .get(url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .query(&request.query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body: clip(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let bytes = response.bytes().await.map_err(|e| UpstreamError::transport(&e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            let text = String::from_utf8_lossy(&bytes);
            UpstreamError::InvalidResponse(format!("{}: {}", e, clip(&text, MAX_ERROR_BODY_CHARS)))
        })
    }
}

#[async_trait]
impl UpstreamClient for RansomwareLiveClient {
    async fn call(&self, request: &UpstreamRequest, timeout: Duration) -> std::result::Result<Value, UpstreamError> {
        let url = self.build_url(request)?;
        let deadline = Instant::now() + timeout;
        let mut attempt = 1;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(UpstreamError::Transport {
                    message: format!("{} timed out after {}ms", request, timeout.as_millis()),
                    timed_out: true,
                });
            }

            debug!("{} (attempt {}/{})", request, attempt, self.max_attempts);
            match self.send_once(&url, request, remaining).await {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = backoff_delay(self.backoff, attempt);
                    if Instant::now() + delay >= deadline {
                        return Err(e);
                    }
                    warn!("{} failed ({}), retrying in {}ms", request, e, delay.as_millis());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

impl std::fmt::Debug for RansomwareLiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RansomwareLiveClient")
            .field("base_url", &self.base_url.as_str())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// Exponential backoff: base * 2^(attempt-1), exponent capped at 6
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.pow(attempt.saturating_sub(1).min(6));
    base * factor
}

/// Cut a string to at most `max_chars` characters
fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
