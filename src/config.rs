use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::DEFAULT_CAPACITY;
use crate::dispatch::{DEFAULT_MAX_PAYLOAD_BYTES, DispatcherSettings, TtlPolicy};
use crate::error::{McpError, Result};
use crate::tools::TtlClass;
use crate::upstream::{ClientSettings, DEFAULT_BASE_URL};

/// Environment variable consulted when `api_key_env` is unset or empty
pub const LEGACY_API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_env: "RANSOMWARE_LIVE_API_KEY".to_string(),
            timeout_ms: 10_000,
            max_attempts: 3,
            backoff_ms: 250,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_ms", &self.backoff_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: HashMap<TtlClass, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let ttl_secs = [TtlClass::Volatile, TtlClass::Standard, TtlClass::Static]
            .into_iter()
            .map(|class| (class, class.default_ttl_secs()))
            .collect();
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl_secs,
        }
    }
}

impl CacheConfig {
    /// Seconds for a class, falling back to the built-in default
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        if class == TtlClass::Uncached {
            return Duration::ZERO;
        }
        let secs = self
            .ttl_secs
            .get(&class)
            .copied()
            .unwrap_or_else(|| class.default_ttl_secs());
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub max_payload_bytes: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| McpError::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| McpError::Config(format!("Failed to parse config file {}: {}", path.display(), e)))?;

        log::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// API key from the file, else the configured env var, else `API_KEY`
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Same as `resolve_api_key` with an injectable environment lookup
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = self.api.api_key.clone();
        let from_env = [self.api.api_key_env.as_str(), LEGACY_API_KEY_ENV]
            .into_iter()
            .filter(|name| !name.is_empty())
            .find_map(&lookup);

        explicit
            .into_iter()
            .chain(from_env)
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
            .ok_or_else(|| {
                McpError::Config(format!(
                    "No API key: set api.api_key in the config file or the {} environment variable",
                    self.api.api_key_env
                ))
            })
    }

    /// Upstream client settings for a resolved key
    pub fn client_settings(&self, api_key: impl Into<String>) -> ClientSettings {
        ClientSettings::new(api_key)
            .with_base_url(self.api.base_url.clone())
            .with_retry(self.api.max_attempts, Duration::from_millis(self.api.backoff_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            volatile: self.cache.ttl_for(TtlClass::Volatile),
            standard: self.cache.ttl_for(TtlClass::Standard),
            static_data: self.cache.ttl_for(TtlClass::Static),
        }
    }

    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            max_payload_bytes: self.output.max_payload_bytes,
            request_timeout: self.request_timeout(),
            ttls: self.ttl_policy(),
            cache_capacity: self.cache.capacity,
        }
    }
}
