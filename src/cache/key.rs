//! Cache key derivation

use std::fmt;

use sha2::{Digest, Sha256};

/// Identity of a cached tool result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tool: String,
    fingerprint: String,
}

impl CacheKey {
    /// Build a key from a tool name and its canonical argument encoding
    pub fn new(tool: impl Into<String>, canonical_args: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical_args.as_bytes());
        Self {
            tool: tool.into(),
            fingerprint: hex::encode(hasher.finalize()),
        }
    }

    /// Hex SHA-256 of the canonical arguments
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tool, &self.fingerprint[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_input_same_key() {
        let a = CacheKey::new("get-group-detail", r#"{"name":"lockbit"}"#);
        let b = CacheKey::new("get-group-detail", r#"{"name":"lockbit"}"#);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_args_different_key() {
        let a = CacheKey::new("get-group-detail", r#"{"name":"lockbit"}"#);
        let b = CacheKey::new("get-group-detail", r#"{"name":"akira"}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_tool_different_key() {
        let a = CacheKey::new("list-yara-rules", "{}");
        let b = CacheKey::new("get-stats", "{}");
        assert_ne!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let key = CacheKey::new("get-stats", "");
        assert_eq!(
            key.fingerprint(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_display() {
        let key = CacheKey::new("get-stats", "");
        assert_eq!(key.to_string(), "get-stats#e3b0c44298fc");
    }
}
