//! PII classification cache
//!
//! Holds the full classification set in memory, keyed by `"table.column"`,
//! and reloads it lazily from a [`ClassificationStore`] once the TTL has
//! passed.
//!
//! ```text
//!            successful load
//!   COLD ───────────────────────▶ WARM
//!     ▲                             │
//!     └──── TTL expired / invalidate┘   (checked on the next lookup)
//! ```
//!
//! Lookups are fail-open: a store failure is logged and the previous
//! classification set (or an empty one) keeps being served. Each result
//! carries an [`Availability`] so callers can tell "not PII" apart from
//! "classification data unavailable".

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::privacy::store::ClassificationStore;
use crate::privacy::types::{lookup_key, Availability, ClassificationResult, FieldClassification};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// Classification index keyed by `"table.column"`
pub type ClassificationMap = HashMap<String, FieldClassification>;

/// Cache lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// Never loaded, invalidated, or past its TTL
    Cold,
    /// Loaded within the TTL window
    Warm,
}

/// Snapshot of cache health
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub state: CacheState,
    pub store: String,
    pub entries: usize,
    pub ttl_secs: u64,
    pub loaded_at: Option<DateTime<Utc>>,
    pub age_secs: Option<u64>,
    pub loads: u64,
    pub failures: u64,
    pub duplicates: u64,
    pub last_error: Option<String>,
}

struct Inner {
    classifications: Arc<ClassificationMap>,
    /// Monotonic time of the last successful load; `None` = COLD
    loaded_at: Option<Instant>,
    /// Wall clock time of the last successful load, kept across invalidation
    last_success: Option<DateTime<Utc>>,
    last_failure: Option<Instant>,
    last_error: Option<String>,
}

/// TTL cache over a classification store
pub struct ClassificationCache {
    store: Arc<dyn ClassificationStore>,
    ttl: Duration,
    failure_backoff: Duration,
    load_timeout: Duration,
    inner: RwLock<Inner>,
    reload_lock: Mutex<()>,
    loads: AtomicU64,
    failures: AtomicU64,
    duplicates: AtomicU64,
}

impl ClassificationCache {
    /// Create a COLD cache. Nothing is loaded until the first lookup.
    pub fn new(store: Arc<dyn ClassificationStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl(),
            failure_backoff: config.failure_backoff(),
            load_timeout: config.load_timeout(),
            inner: RwLock::new(Inner {
                classifications: Arc::new(HashMap::new()),
                loaded_at: None,
                last_success: None,
                last_failure: None,
                last_error: None,
            }),
            reload_lock: Mutex::new(()),
            loads: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
        }
    }

    /// Current classification set, reloading first if COLD or stale.
    ///
    /// Never fails: when the store cannot be read the previous set is
    /// returned, or an empty one if nothing was ever loaded.
    pub async fn get_classifications(&self) -> Arc<ClassificationMap> {
        self.current().await.0
    }

    /// Classify the fields of a JSON record from `table_name`.
    pub async fn classify_fields(
        &self,
        record: &serde_json::Map<String, serde_json::Value>,
        table_name: &str,
    ) -> ClassificationResult {
        self.classify_field_names(record.keys().map(String::as_str), table_name)
            .await
    }

    /// Classify bare field names from `table_name`.
    pub async fn classify_field_names<'a, I>(&self, names: I, table_name: &str) -> ClassificationResult
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (classifications, availability) = self.current().await;
        classify_against(&classifications, names, table_name, availability)
    }

    /// Reload now, regardless of TTL, and report store errors.
    ///
    /// On failure the previous classification set stays in place.
    pub async fn refresh(&self) -> Result<usize> {
        let _guard = self.reload_lock.lock().await;
        self.reload().await
    }

    /// Drop to COLD so the next lookup reloads. Cached rows are kept for
    /// fail-open serving until a reload succeeds.
    pub async fn invalidate(&self) {
        let mut inner = self.inner.write().await;
        inner.loaded_at = None;
        inner.last_failure = None;
        tracing::debug!("PII classification cache invalidated");
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let inner = self.inner.read().await;
        let state = if self.is_fresh(&inner, now) {
            CacheState::Warm
        } else {
            CacheState::Cold
        };

        CacheStats {
            state,
            store: self.store.name().to_string(),
            entries: inner.classifications.len(),
            ttl_secs: self.ttl.as_secs(),
            loaded_at: inner.last_success,
            age_secs: inner.loaded_at.map(|t| now.duration_since(t).as_secs()),
            loads: self.loads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            last_error: inner.last_error.clone(),
        }
    }

    async fn current(&self) -> (Arc<ClassificationMap>, Availability) {
        if self.needs_reload().await {
            let _guard = self.reload_lock.lock().await;
            // Another caller may have reloaded while we waited
            if self.needs_reload().await {
                if let Err(e) = self.reload().await {
                    tracing::warn!(
                        store = self.store.name(),
                        error = %e,
                        "Failed to load PII classifications; serving cached data"
                    );
                }
            }
        }

        let now = Instant::now();
        let inner = self.inner.read().await;
        let availability = if self.is_fresh(&inner, now) {
            Availability::Fresh
        } else if inner.last_success.is_some() {
            Availability::Stale
        } else {
            Availability::Unavailable
        };
        (inner.classifications.clone(), availability)
    }

    async fn needs_reload(&self) -> bool {
        let now = Instant::now();
        let inner = self.inner.read().await;
        if self.is_fresh(&inner, now) {
            return false;
        }
        match inner.last_failure {
            Some(failed_at) => now.duration_since(failed_at) >= self.failure_backoff,
            None => true,
        }
    }

    fn is_fresh(&self, inner: &Inner, now: Instant) -> bool {
        inner
            .loaded_at
            .map(|t| now.duration_since(t) <= self.ttl)
            .unwrap_or(false)
    }

    /// Caller must hold `reload_lock`.
    async fn reload(&self) -> Result<usize> {
        let started = Instant::now();
        let loaded = match tokio::time::timeout(self.load_timeout, self.store.load_all()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Store(format!(
                "{} store did not answer within {}s",
                self.store.name(),
                self.load_timeout.as_secs()
            ))),
        };

        match loaded {
            Ok(rows) => {
                let (index, duplicates) = build_index(rows);
                let entries = index.len();
                {
                    let mut inner = self.inner.write().await;
                    inner.classifications = Arc::new(index);
                    inner.loaded_at = Some(Instant::now());
                    inner.last_success = Some(Utc::now());
                    inner.last_failure = None;
                    inner.last_error = None;
                }
                self.loads.fetch_add(1, Ordering::Relaxed);
                self.duplicates.fetch_add(duplicates, Ordering::Relaxed);
                tracing::info!(
                    store = self.store.name(),
                    entries,
                    duplicates,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Loaded PII classifications"
                );
                Ok(entries)
            }
            Err(e) => {
                {
                    let mut inner = self.inner.write().await;
                    inner.last_failure = Some(Instant::now());
                    inner.last_error = Some(e.to_string());
                }
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}

/// Index rows by `"table.column"`; later duplicates overwrite earlier ones.
fn build_index(rows: Vec<FieldClassification>) -> (ClassificationMap, u64) {
    let mut index = HashMap::with_capacity(rows.len());
    let mut duplicates = 0;
    for row in rows {
        let key = row.lookup_key();
        if let Some(previous) = index.insert(key.clone(), row) {
            duplicates += 1;
            tracing::warn!(
                key = %key,
                replaced_schema = %previous.schema_name,
                "Duplicate PII classification; keeping the later row"
            );
        }
    }
    (index, duplicates)
}

/// Classify field names against an already loaded classification set.
///
/// One map lookup per field; the size of the classification set does not
/// matter. Unknown fields and tables read as NONE.
pub fn classify_against<'a, I>(
    classifications: &ClassificationMap,
    names: I,
    table_name: &str,
    availability: Availability,
) -> ClassificationResult
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result = ClassificationResult::empty(availability);

    for field in names {
        let Some(classification) = classifications.get(&lookup_key(table_name, field)) else {
            continue;
        };
        if !classification.is_pii() {
            continue;
        }
        if result.categories.contains_key(field) {
            continue;
        }
        result.fields.push(field.to_string());
        result
            .categories
            .insert(field.to_string(), classification.pii_category);
        if classification.is_sensitive {
            result.sensitive_fields.push(field.to_string());
        }
    }

    result.has_sensitive_data = !result.sensitive_fields.is_empty();
    result
}
