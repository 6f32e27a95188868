//! piitag - PII field classification for audit logging and compliance
//!
//! piitag keeps a per-column privacy classification table in memory and
//! answers, for any record, which of its fields are personal data, in
//! which category, and whether any of it is special category (health)
//! data. New personal-data columns are recognized by every consumer as
//! soon as they are added to the classification table, with no code
//! change at the call sites.
//!
//! ## Architecture
//!
//! ```text
//!  ┌────────────────────┐   load_all (lazy, TTL)   ┌──────────────────────┐
//!  │ ClassificationStore│ ◀─────────────────────── │ ClassificationCache  │
//!  │ memory │ file │ rest│                          │ "table.column" → row │
//!  └────────────────────┘                          └──────────┬───────────┘
//!                                                             │ classify_fields
//!                               ┌─────────────────────────────┼──────────────┐
//!                               ▼                             ▼              ▼
//!                         Auditor/AuditLog          ComplianceReport    /api/v1/pii
//! ```
//!
//! ## Modules
//!
//! - [`privacy`]: classification types, stores, and the TTL cache
//! - [`audit`]: access events annotated with the PII they touched
//! - [`compliance`]: personal data inventory (JSON and HTML)
//! - [`api`]: the combined HTTP application
//! - [`config`]: configuration management

pub mod api;
pub mod audit;
pub mod compliance;
pub mod config;
pub mod error;
pub mod privacy;

pub use config::PiitagConfig;
pub use error::{Error, Result};
pub use privacy::{ClassificationCache, ClassificationResult, FieldClassification, PiiCategory};
