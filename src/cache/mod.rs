//! Response cache - time-boxed memoization of upstream payloads
//!
//! Keys are (tool name, SHA-256 of canonical arguments); entries expire after a
//! per-tool TTL and the least-recently-used entry is evicted at capacity.

mod key;
mod lru;

pub use key::CacheKey;
pub use lru::{CacheEntry, CacheStats, DEFAULT_CAPACITY, ResponseCache};
