//! Dispatch - validation, caching, upstream calls and output shaping
//!
//! This module provides:
//! - `ToolDispatcher` - the single entry point for tool calls
//! - `ToolCallRequest` / `ToolCallResult` and the `ResponseEnvelope` wire form
//! - `shaping` - deterministic payload truncation

mod dispatcher;
mod result;
pub mod shaping;

pub use dispatcher::{DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_REQUEST_TIMEOUT, DispatcherSettings, TtlPolicy, ToolDispatcher};
pub use result::{ErrorKind, ResponseEnvelope, Status, ToolCallRequest, ToolCallResult};
