//! Core upstream client types and trait definitions

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Stateless upstream client - each call is independent
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issue one GET against the API and return the decoded JSON body.
    ///
    /// `timeout` is the total budget for the call, retries included.
    async fn call(&self, request: &UpstreamRequest, timeout: Duration) -> Result<Value, UpstreamError>;
}

/// Shape of a single upstream GET: path segments plus query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Raw (unencoded) path segments, e.g. `["groups", "lockbit"]`
    pub segments: Vec<String>,
    /// Query parameters in the order they are sent
    pub query: Vec<(String, String)>,
}

impl UpstreamRequest {
    /// Create a GET request for the given path segments
    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a query parameter only when a value is present
    pub fn with_optional_query(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with_query(key, value),
            None => self,
        }
    }

    /// Display path, e.g. `/groups/lockbit`
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

impl fmt::Display for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GET {}", self.path())?;
        if !self.query.is_empty() {
            let pairs: Vec<String> = self.query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            write!(f, "?{}", pairs.join("&"))?;
        }
        Ok(())
    }
}

/// Errors that can occur while talking to the upstream API
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    #[error("Transport error: {message}")]
    Transport { message: String, timed_out: bool },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    /// Build a transport error from a reqwest failure
    pub fn transport(err: &reqwest::Error) -> Self {
        UpstreamError::Transport {
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }

    /// Transport errors are the only failures worth retrying automatically
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Transport { .. } => true,
            UpstreamError::Http { .. } => false,
            UpstreamError::InvalidResponse(_) => false,
        }
    }

    /// HTTP status code, if the upstream answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
