//! Pluggable classification store
//!
//! Defines the `ClassificationStore` trait the cache loads from, and the
//! three backends shipped with piitag:
//!
//! ```text
//! MemoryStore  rows held in process, optionally seeded from a JSON file
//! FileStore    JSON array on disk
//! RestStore    GET {base_url}/rest/v1/{table}?select=*
//! ```
//!
//! Every backend returns the full row set. A row that fails to parse is
//! skipped with a warning; only a failure to reach or read the store as a
//! whole is an error.

use crate::config::{MemoryStoreConfig, RestStoreConfig, StoreConfig};
use crate::error::{Error, Result};
use crate::privacy::types::FieldClassification;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Source of per-column privacy classifications.
#[async_trait]
pub trait ClassificationStore: Send + Sync {
    /// Read every classification row ("select all").
    async fn load_all(&self) -> Result<Vec<FieldClassification>>;

    /// Human-readable backend name (used in logs).
    fn name(&self) -> &str;
}

/// Build the store selected in configuration
pub fn store_from_config(config: &StoreConfig) -> Result<Arc<dyn ClassificationStore>> {
    let store: Arc<dyn ClassificationStore> = match config {
        StoreConfig::Memory(memory) => Arc::new(MemoryStore::from_config(memory)?),
        StoreConfig::File(file) => Arc::new(FileStore::new(file.path.clone())),
        StoreConfig::Rest(rest) => Arc::new(RestStore::from_config(rest)?),
    };
    Ok(store)
}

/// Decode raw rows one at a time so a single bad row does not fail the load
fn parse_rows(values: Vec<serde_json::Value>, source: &str) -> Vec<FieldClassification> {
    let total = values.len();
    let rows: Vec<FieldClassification> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!(store = source, index, error = %e, "Skipping malformed classification row");
                None
            }
        })
        .collect();

    if rows.len() < total {
        tracing::warn!(
            store = source,
            skipped = total - rows.len(),
            total,
            "Some classification rows could not be parsed"
        );
    }
    rows
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<FieldClassification>>,
}

impl MemoryStore {
    pub fn new(rows: Vec<FieldClassification>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Build the store, reading the seed file when one is configured
    pub fn from_config(config: &MemoryStoreConfig) -> Result<Self> {
        let Some(path) = &config.seed else {
            tracing::warn!("Memory classification store has no seed; every field is unclassified");
            return Ok(Self::default());
        };

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Store(format!("Failed to read seed {}: {}", path.display(), e)))?;
        let values: Vec<serde_json::Value> = serde_json::from_str(&data)?;
        let rows = parse_rows(values, "memory");
        tracing::info!(path = %path.display(), rows = rows.len(), "Seeded memory classification store");
        Ok(Self::new(rows))
    }

    /// Swap the whole row set
    pub async fn replace(&self, rows: Vec<FieldClassification>) {
        *self.rows.write().await = rows;
    }
}

#[async_trait]
impl ClassificationStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<FieldClassification>> {
        Ok(self.rows.read().await.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// JSON file store. The document must be an array of rows.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ClassificationStore for FileStore {
    async fn load_all(&self) -> Result<Vec<FieldClassification>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Store(format!("Failed to read {}: {}", self.path.display(), e)))?;

        let values: Vec<serde_json::Value> = serde_json::from_str(&data).map_err(|e| {
            tracing::warn!(path = %self.path.display(), "Classification file is not a JSON array of rows");
            Error::Serialization(e)
        })?;

        Ok(parse_rows(values, self.name()))
    }

    fn name(&self) -> &str {
        "file"
    }
}

// =============================================================================
// RestStore
// =============================================================================

/// Managed database REST store.
///
/// Issues `GET {base_url}/rest/v1/{table}?select=*` with the project API key
/// in both the `apikey` and `Authorization` headers.
pub struct RestStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RestStore {
    /// Create a store; the API key is read from the configured environment variable
    pub fn from_config(config: &RestStoreConfig) -> Result<Self> {
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "No API key found for classification store; requests will be anonymous"
            );
        }
        Self::new(
            &config.base_url,
            &config.table,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn new(
        base_url: &str,
        table: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Store(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ClassificationStore for RestStore {
    async fn load_all(&self) -> Result<Vec<FieldClassification>> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*")])
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Store(format!("Timed out querying {}", self.endpoint))
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "{} returned {}: {}",
                self.endpoint, status, body
            )));
        }

        let values: Vec<serde_json::Value> = response.json().await?;

        Ok(parse_rows(values, self.name()))
    }

    fn name(&self) -> &str {
        "rest"
    }
}
