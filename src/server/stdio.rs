//! MCP server - newline-delimited JSON-RPC over stdin/stdout
//!
//! Provides:
//! - Method routing (`initialize`, `ping`, `tools/list`, `tools/call`)
//! - One tokio task per request, so a slow upstream never blocks the reader
//! - `notifications/cancelled`, which aborts the named in-flight request
//! - A single writer task that serializes responses in completion order

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};

use crate::dispatch::{ErrorKind, ToolCallRequest, ToolCallResult, ToolDispatcher};
use crate::error::Result;
use crate::server::messages::{RpcError, RpcRequest, RpcResponse, ToolCallParams};

/// MCP protocol revision announced in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Capacity of the response channel feeding the writer task
const RESPONSE_CHANNEL_CAPACITY: usize = 64;

/// In-flight request tasks keyed by encoded request id
///
/// The slot number tells a finished task whether its entry was since reused by
/// a later request carrying the same id.
type InFlight = HashMap<String, (u64, AbortHandle)>;

/// Routes JSON-RPC requests to the dispatcher
pub struct McpServer {
    dispatcher: Arc<ToolDispatcher>,
    in_flight: Mutex<InFlight>,
    next_slot: AtomicU64,
}

impl McpServer {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            dispatcher,
            in_flight: Mutex::new(HashMap::new()),
            next_slot: AtomicU64::new(0),
        }
    }

    /// Number of requests still running
    pub fn in_flight_count(&self) -> usize {
        self.in_flight().len()
    }

    /// Handle one request; notifications yield `None`
    pub async fn handle(&self, request: RpcRequest) -> Option<RpcResponse> {
        let Some(id) = request.id.clone() else {
            self.notify(&request);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => RpcResponse::success(id, self.initialize()),
            "ping" => RpcResponse::success(id, json!({})),
            "tools/list" => RpcResponse::success(id, self.list_tools()),
            "tools/call" => match serde_json::from_value::<ToolCallParams>(request.params) {
                Ok(params) => {
                    let result = self
                        .dispatcher
                        .dispatch(ToolCallRequest::new(params.name, params.arguments))
                        .await;
                    RpcResponse::success(id, call_result(&result))
                }
                Err(e) => RpcResponse::error(id, RpcError::invalid_params(format!("tools/call: {}", e))),
            },
            other => RpcResponse::error(id, RpcError::method_not_found(other)),
        };

        Some(response)
    }

    fn notify(&self, request: &RpcRequest) {
        match request.method.as_str() {
            "notifications/cancelled" => {
                let request_id = request.params.get("requestId").cloned().unwrap_or(Value::Null);
                if self.cancel(&request_id) {
                    info!("cancelled request {}", request_id);
                } else {
                    debug!("cancel for unknown request {}", request_id);
                }
            }
            other => debug!("notification {}", other),
        }
    }

    /// Abort the in-flight request with this id; false when none is running
    pub fn cancel(&self, id: &Value) -> bool {
        match self.in_flight().remove(&id.to_string()) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn track(&self, id: &Value, handle: AbortHandle) -> u64 {
        let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
        self.in_flight().insert(id.to_string(), (slot, handle));
        slot
    }

    fn untrack(&self, id: &Value, slot: u64) {
        let mut in_flight = self.in_flight();
        let key = id.to_string();
        if in_flight.get(&key).is_some_and(|(current, _)| *current == slot) {
            in_flight.remove(&key);
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one request on its own task and forward its response to `tx`
    ///
    /// The request stays cancellable until its task finishes. A cancelled
    /// request sends nothing; a panic becomes an error response.
    pub fn spawn_request(self: &Arc<Self>, request: RpcRequest, tx: mpsc::Sender<RpcResponse>) -> JoinHandle<()> {
        let id = request.id.clone();
        let method = request.method.clone();

        let server = Arc::clone(self);
        let task = tokio::spawn(async move { server.handle(request).await });
        let slot = id.as_ref().map(|id| self.track(id, task.abort_handle()));

        let server = Arc::clone(self);
        tokio::spawn(async move {
            let joined = task.await;
            if let (Some(id), Some(slot)) = (&id, slot) {
                server.untrack(id, slot);
            }

            let response = match joined {
                Ok(response) => response,
                Err(e) if e.is_cancelled() => {
                    debug!("{} {:?} cancelled", method, id);
                    None
                }
                Err(e) => {
                    error!("{} task failed: {}", method, e);
                    id.map(|id| {
                        if method == "tools/call" {
                            let result =
                                ToolCallResult::failure(ErrorKind::InternalError, format!("tool task failed: {}", e));
                            RpcResponse::success(id, call_result(&result))
                        } else {
                            RpcResponse::error(id, RpcError::internal_error(e.to_string()))
                        }
                    })
                }
            };

            if let Some(response) = response {
                if tx.send(response).await.is_err() {
                    warn!("response dropped: writer closed");
                }
            }
        })
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .dispatcher
            .catalog()
            .list_all()
            .map(|summary| serde_json::to_value(summary).unwrap_or(Value::Null))
            .collect();
        json!({ "tools": tools })
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`
    ///
    /// In-flight requests are allowed to finish before this returns.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<RpcResponse>(RESPONSE_CHANNEL_CAPACITY);
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                break; // EOF
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request = match parse_request(trimmed) {
                Ok(request) => request,
                Err(response) => {
                    if tx.send(response).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            // Handled inline so a cancel always sees every request read before it
            if request.id.is_none() {
                self.notify(&request);
                continue;
            }

            debug!("request {} {:?}", request.method, request.id);
            self.spawn_request(request, tx.clone());
        }

        info!(
            "input closed with {} requests in flight, cache {:?}",
            self.in_flight_count(),
            self.dispatcher.cache_stats()
        );
        drop(tx);
        match writer_task.await {
            Ok(result) => result,
            Err(e) => {
                error!("response writer failed: {}", e);
                Ok(())
            }
        }
    }

    /// Serve on the process's stdin/stdout
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        info!("serving MCP on stdio ({} tools)", self.dispatcher.catalog().len());
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }
}

/// Parse one line, producing the error response to send when it is not a request
fn parse_request(line: &str) -> std::result::Result<RpcRequest, RpcResponse> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| RpcResponse::error(Value::Null, RpcError::parse_error(format!("Parse error: {}", e))))?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| RpcResponse::error(id, RpcError::invalid_request(format!("Invalid request: {}", e))))
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<RpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// `tools/call` result: the envelope as text and as structured content
fn call_result(result: &ToolCallResult) -> Value {
    let envelope = result.to_envelope();
    let structured = serde_json::to_value(&envelope).unwrap_or(Value::Null);
    json!({
        "content": [{ "type": "text", "text": structured.to_string() }],
        "structuredContent": structured,
        "isError": !result.is_success()
    })
}
