//! Compliance reporting
//!
//! Builds a personal-data inventory (GDPR Article 30 style) from the
//! current classification set.

pub mod handler;
pub mod report;

pub use handler::{compliance_router, ComplianceState};
pub use report::{ComplianceReport, FieldReport, TableReport};
