//! MCP Server - exposes the dispatcher to an orchestrator over stdio
//!
//! JSON-RPC 2.0 messages, one per line. See `messages` for the wire types and
//! `stdio` for the serve loop.

pub mod messages;
pub mod stdio;

pub use messages::{ErrorCode, RpcError, RpcRequest, RpcResponse, ToolCallParams};
pub use stdio::{McpServer, PROTOCOL_VERSION};
