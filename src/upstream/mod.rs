//! Upstream Layer - the single point of contact with the ransomware.live API
//!
//! This module provides:
//! - `UpstreamClient` trait for API abstraction
//! - `RansomwareLiveClient` reqwest implementation with retry/backoff
//! - `MockUpstream` scripted client for tests

pub mod client;
pub mod http;
pub mod mock;

pub use client::{UpstreamClient, UpstreamError, UpstreamRequest};
pub use http::{ClientSettings, DEFAULT_BASE_URL, RansomwareLiveClient};
pub use mock::{MockReply, MockUpstream};
