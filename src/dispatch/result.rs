//! Tool-call request, result, and the wire envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::McpError;
use crate::upstream::UpstreamError;

/// One named tool call with raw arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Failure taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownTool,
    InvalidArgument,
    /// Network failure or timeout; worth retrying later
    UpstreamUnavailable,
    /// 4xx from the API; fix the request or credential first
    UpstreamRejected,
    /// Upstream server fault
    UpstreamError,
    InternalError,
}

impl ErrorKind {
    /// Classify an upstream failure
    pub fn from_upstream(err: &UpstreamError) -> Self {
        match err {
            UpstreamError::Transport { .. } => ErrorKind::UpstreamUnavailable,
            _ => match err.status() {
                Some(400..=499) => ErrorKind::UpstreamRejected,
                _ => ErrorKind::UpstreamError,
            },
        }
    }

    /// Classify any crate error
    pub fn from_error(err: &McpError) -> Self {
        match err {
            McpError::UnknownTool(_) => ErrorKind::UnknownTool,
            McpError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            McpError::Upstream(upstream) => Self::from_upstream(upstream),
            _ => ErrorKind::InternalError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
            ErrorKind::UpstreamRejected => "UpstreamRejected",
            ErrorKind::UpstreamError => "UpstreamError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallResult {
    Success { payload: Value, truncated: bool },
    Failure { kind: ErrorKind, message: String },
}

impl ToolCallResult {
    pub fn success(payload: Value, truncated: bool) -> Self {
        ToolCallResult::Success { payload, truncated }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        ToolCallResult::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolCallResult::Success { .. })
    }

    /// Failure kind, if any
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ToolCallResult::Success { .. } => None,
            ToolCallResult::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Wire form for the caller
    pub fn to_envelope(&self) -> ResponseEnvelope {
        match self {
            ToolCallResult::Success { payload, truncated } => ResponseEnvelope {
                status: Status::Success,
                payload: Some(payload.clone()),
                truncated: *truncated,
                error_kind: None,
                message: None,
            },
            ToolCallResult::Failure { kind, message } => ResponseEnvelope {
                status: Status::Error,
                payload: None,
                truncated: false,
                error_kind: Some(*kind),
                message: Some(message.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `{status, payload, truncated, error_kind, message}`; absent fields serialize as `null`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: Status,
    pub payload: Option<Value>,
    pub truncated: bool,
    pub error_kind: Option<ErrorKind>,
    pub message: Option<String>,
}

impl From<ToolCallResult> for ResponseEnvelope {
    fn from(result: ToolCallResult) -> Self {
        result.to_envelope()
    }
}
