//! PII field classification
//!
//! Per-column privacy classifications loaded from a pluggable store and
//! served from a TTL cache. Includes:
//! - Classification types (categories, rows, per-record results)
//! - Store backends (memory, JSON file, managed database REST)
//! - The fail-open classification cache
//! - HTTP handlers for classification and cache administration

pub mod cache;
pub mod handler;
pub mod store;
pub mod types;

pub use cache::{classify_against, CacheState, CacheStats, ClassificationCache, ClassificationMap};
pub use handler::{privacy_router, PrivacyState};
pub use store::{store_from_config, ClassificationStore, FileStore, MemoryStore, RestStore};
pub use types::{Availability, ClassificationResult, FieldClassification, PiiCategory};
