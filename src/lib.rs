//! ransomware-mcp - tool gateway for the ransomware.live threat-intel API
//!
//! Exposes the API as a fixed catalog of named tools an LLM orchestrator can
//! call. Calls are validated, cached, bounded in time and size, and always
//! answered with a structured result.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod server;
pub mod tools;
pub mod upstream;

pub use error::{McpError, Result};
