//! Audit logging with PII annotation
//!
//! Every audited data access is run through the classification cache and
//! stored with a human-readable description of the personal data it
//! touched. Special category (health) data gets a distinct marker.
//!
//! ```text
//! AccessEntry → ClassificationCache::classify_fields → AuditEvent → AuditLog
//! ```

pub mod annotate;
pub mod handler;
pub mod log;

pub use annotate::{describe_pii, AccessEntry, Auditor, SPECIAL_CATEGORY_MARKER};
pub use handler::{audit_router, AuditState};
pub use log::{AuditAction, AuditEvent, AuditLog};
