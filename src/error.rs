//! Error types for ransomware-mcp
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::upstream::UpstreamError;

/// All error types that can occur inside the tool gateway
#[derive(Debug, Error)]
pub enum McpError {
    /// A tool with the same name was registered twice
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// Tool name not present in the catalog
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Argument missing, of the wrong type, or out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by the upstream API client
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Configuration could not be loaded or resolved
    #[error("Config error: {0}")]
    Config(String),

    /// Unexpected failure inside the gateway
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, McpError>;
