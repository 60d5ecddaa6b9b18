//! Tool dispatcher - the request/response boundary of the gateway
//!
//! `dispatch` resolves the tool, validates and canonicalizes its arguments,
//! serves from the cache when it can, otherwise calls upstream under a timeout,
//! and finally bounds the payload size. Every failure ends up as a
//! `ToolCallResult::Failure`; nothing escapes as a panic or raw error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::cache::{CacheKey, CacheStats, ResponseCache};
use crate::error::{McpError, Result};
use crate::tools::{ToolArgs, ToolCatalog, ToolDefinition, TtlClass};
use crate::upstream::{UpstreamClient, UpstreamError};

use super::result::{ErrorKind, ToolCallRequest, ToolCallResult};
use super::shaping;

/// Default upper bound on a returned payload
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Default budget for one upstream call, retries included
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Cache lifetime per TTL class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub volatile: Duration,
    pub standard: Duration,
    pub static_data: Duration,
}

impl TtlPolicy {
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Volatile => self.volatile,
            TtlClass::Standard => self.standard,
            TtlClass::Static => self.static_data,
            TtlClass::Uncached => Duration::ZERO,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            volatile: Duration::from_secs(TtlClass::Volatile.default_ttl_secs()),
            standard: Duration::from_secs(TtlClass::Standard.default_ttl_secs()),
            static_data: Duration::from_secs(TtlClass::Static.default_ttl_secs()),
        }
    }
}

/// Resolved dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub max_payload_bytes: usize,
    pub request_timeout: Duration,
    pub ttls: TtlPolicy,
    pub cache_capacity: usize,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ttls: TtlPolicy::default(),
            cache_capacity: crate::cache::DEFAULT_CAPACITY,
        }
    }
}

/// Entry point for tool calls; cheap to share behind an `Arc`
pub struct ToolDispatcher {
    catalog: Arc<ToolCatalog>,
    upstream: Arc<dyn UpstreamClient>,
    cache: ResponseCache,
    settings: DispatcherSettings,
}

impl ToolDispatcher {
    pub fn new(catalog: Arc<ToolCatalog>, upstream: Arc<dyn UpstreamClient>, settings: DispatcherSettings) -> Self {
        Self {
            catalog,
            upstream,
            cache: ResponseCache::new(settings.cache_capacity),
            settings,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Run one tool call to completion
    pub async fn dispatch(&self, request: ToolCallRequest) -> ToolCallResult {
        let started = Instant::now();

        let result = match self.execute(&request).await {
            Ok((payload, truncated)) => ToolCallResult::success(payload, truncated),
            Err(err) => {
                let kind = ErrorKind::from_error(&err);
                let message = match &err {
                    McpError::Upstream(upstream) => {
                        format!("{} {}: {}", request.tool_name, request.arguments, upstream)
                    }
                    other => other.to_string(),
                };
                ToolCallResult::failure(kind, message)
            }
        };

        match &result {
            ToolCallResult::Success { truncated, .. } => {
                info!(
                    "{} ok in {:?}{}",
                    request.tool_name,
                    started.elapsed(),
                    if *truncated { " (truncated)" } else { "" }
                );
            }
            ToolCallResult::Failure { kind, message } => {
                warn!("{} failed in {:?}: {} {}", request.tool_name, started.elapsed(), kind, message);
            }
        }

        result
    }

    async fn execute(&self, request: &ToolCallRequest) -> Result<(Value, bool)> {
        let definition = self.catalog.lookup(&request.tool_name)?;
        let args = validate_arguments(definition, &request.arguments)?;

        let ttl = self.settings.ttls.ttl_for(definition.ttl_class);
        let key = CacheKey::new(definition.name.as_str(), &args.canonical());

        if !ttl.is_zero() {
            if let Some(cached) = self.cache.get(&key) {
                debug!("cache hit {}", key);
                return Ok(shaping::shape(cached, self.settings.max_payload_bytes));
            }
            debug!("cache miss {}", key);
        }

        let upstream_request = (definition.route)(&args)?;
        debug!("{} -> {}", definition.name, upstream_request);

        let timeout = self.settings.request_timeout;
        let raw = match tokio::time::timeout(timeout, self.upstream.call(&upstream_request, timeout)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(UpstreamError::Transport {
                    message: format!("no response within {:?}", timeout),
                    timed_out: true,
                }
                .into());
            }
        };

        let payload = match definition.post {
            Some(post) => post(raw, &args)?,
            None => raw,
        };

        if !ttl.is_zero() {
            self.cache.put(key, payload.clone(), ttl);
        }

        Ok(shaping::shape(payload, self.settings.max_payload_bytes))
    }
}

/// Arguments must be an object; `null` means none were given
fn validate_arguments(definition: &ToolDefinition, arguments: &Value) -> Result<ToolArgs> {
    match arguments {
        Value::Object(map) => ToolArgs::validate(definition, map),
        Value::Null => ToolArgs::validate(definition, &Map::new()),
        other => Err(McpError::InvalidArgument(format!(
            "arguments for '{}' must be an object, got {}",
            definition.name, other
        ))),
    }
}
