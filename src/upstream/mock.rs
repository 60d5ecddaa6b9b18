//! Scripted upstream client for tests and offline runs

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::client::{UpstreamClient, UpstreamError, UpstreamRequest};

/// Canned reply for one upstream path
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 2xx with this JSON body
    Json(Value),
    /// Non-2xx with this status and body
    Status(u16, String),
    /// Connection-level failure
    Transport(String),
    /// Sleep, then answer with this JSON body (ignores the timeout budget)
    Delayed(Duration, Value),
}

/// Upstream client answering from a path → reply table
///
/// Paths are matched on `UpstreamRequest::path()`; query parameters are recorded
/// but not matched. Unscripted paths answer 404.
#[derive(Debug, Default)]
pub struct MockUpstream {
    replies: HashMap<String, MockReply>,
    calls: AtomicUsize,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl MockUpstream {
    /// Create a mock with no scripted replies
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply for a path such as `/groups/lockbit`
    pub fn with_reply(mut self, path: impl Into<String>, reply: MockReply) -> Self {
        self.replies.insert(path.into(), reply);
        self
    }

    /// Shorthand for a 2xx JSON reply
    pub fn with_json(self, path: impl Into<String>, body: Value) -> Self {
        self.with_reply(path, MockReply::Json(body))
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<UpstreamRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn call(&self, request: &UpstreamRequest, _timeout: Duration) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        match self.replies.get(&request.path()) {
            Some(MockReply::Json(body)) => Ok(body.clone()),
            Some(MockReply::Status(status, body)) => Err(UpstreamError::Http {
                status: *status,
                body: body.clone(),
            }),
            Some(MockReply::Transport(message)) => Err(UpstreamError::Transport {
                message: message.clone(),
                timed_out: false,
            }),
            Some(MockReply::Delayed(delay, body)) => {
                tokio::time::sleep(*delay).await;
                Ok(body.clone())
            }
            None => Err(UpstreamError::Http {
                status: 404,
                body: format!("no mock reply for {}", request.path()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_json_reply() {
        let mock = MockUpstream::new().with_json("/stats", json!({"victims": 42}));
        let value = mock
            .call(&UpstreamRequest::get(["stats"]), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(value["victims"], 42);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_status_reply() {
        let mock = MockUpstream::new().with_reply("/validate", MockReply::Status(401, "bad key".to_string()));
        let err = mock
            .call(&UpstreamRequest::get(["validate"]), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_mock_unscripted_path_is_404() {
        let mock = MockUpstream::new();
        let err = mock
            .call(&UpstreamRequest::get(["nothing"]), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("/nothing"));
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let mock = MockUpstream::new().with_json("/victims/recent", json!([]));
        let request = UpstreamRequest::get(["victims", "recent"]).with_query("order", "attacked");
        mock.call(&request, Duration::from_secs(1)).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], request);
    }

    #[tokio::test]
    async fn test_mock_transport_reply() {
        let mock = MockUpstream::new().with_reply("/8k", MockReply::Transport("reset".to_string()));
        let err = mock
            .call(&UpstreamRequest::get(["8k"]), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }
}
