//! piitag configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main piitag configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PiitagConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Classification cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Classification store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Audit log configuration
    #[serde(default)]
    pub audit: AuditConfig,
}

impl PiitagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration: explicit path, then `~/.piitag/config.toml`, then defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading default configuration file");
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Default configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|h| h.join(".piitag").join("config.toml"))
    }

    /// Reject configurations that cannot work at runtime
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            return Err(Error::Config("cache.ttl_secs must be greater than 0".to_string()));
        }
        if self.cache.load_timeout_secs == 0 {
            return Err(Error::Config(
                "cache.load_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.audit.capacity == 0 {
            return Err(Error::Config("audit.capacity must be greater than 0".to_string()));
        }
        if let StoreConfig::Rest(rest) = &self.store {
            if rest.base_url.trim().is_empty() {
                return Err(Error::Config("store.base_url must not be empty".to_string()));
            }
            if rest.table.trim().is_empty() {
                return Err(Error::Config("store.table must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18791,
            cors_origins: Vec::new(),
        }
    }
}

/// Classification cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum age of loaded classifications before a reload
    pub ttl_secs: u64,

    /// Minimum wait after a failed load before the store is tried again
    pub failure_backoff_secs: u64,

    /// Upper bound for a single store load
    pub load_timeout_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            failure_backoff_secs: 30,
            load_timeout_secs: 10,
        }
    }
}

/// Classification store backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-process store, optionally seeded once at startup
    Memory(MemoryStoreConfig),

    /// JSON file holding an array of classification rows
    File(FileStoreConfig),

    /// Managed database REST interface
    Rest(RestStoreConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory(MemoryStoreConfig::default())
    }
}

/// Memory store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// JSON array of classification rows read once when the store is built.
    /// Without it the store serves an empty set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,
}

/// File store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Path of the JSON document
    pub path: PathBuf,
}

/// REST store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestStoreConfig {
    /// Project base URL, e.g. `https://project.example.co`
    pub base_url: String,

    /// Table holding the classifications
    #[serde(default = "default_classification_table")]
    pub table: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_rest_timeout")]
    pub timeout_secs: u64,
}

impl RestStoreConfig {
    /// Read the API key from the configured environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .or_else(|_| std::env::var(self.api_key_env.to_uppercase()))
            .ok()
            .filter(|k| !k.is_empty())
    }
}

fn default_classification_table() -> String {
    "pii_field_classifications".to_string()
}

fn default_api_key_env() -> String {
    "PIITAG_STORE_API_KEY".to_string()
}

fn default_rest_timeout() -> u64 {
    5
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Number of events kept in memory
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}
