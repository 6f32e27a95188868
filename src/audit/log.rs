//! Bounded in-memory audit log

use crate::privacy::types::{Availability, PiiCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Kind of data access being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Insert,
    Update,
    Delete,
    Read,
    Export,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Read => write!(f, "read"),
            Self::Export => write!(f, "export"),
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "read" => Ok(Self::Read),
            "export" => Ok(Self::Export),
            other => Err(format!("unknown audit action: {}", other)),
        }
    }
}

/// One audited access, annotated with the PII it touched.
///
/// Only field names and categories are kept, never the values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub table_name: String,
    pub action: AuditAction,
    pub actor: Option<String>,
    pub record_id: Option<String>,
    pub pii_fields: Vec<String>,
    pub pii_categories: HashMap<String, PiiCategory>,
    pub contains_sensitive_data: bool,
    pub description: String,
    pub availability: Availability,
}

/// Ring buffer of audit events; the oldest event is dropped when full
pub struct AuditLog {
    events: VecDeque<AuditEvent>,
    capacity: usize,
    total: u64,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            total: 0,
        }
    }

    pub fn record(&mut self, event: AuditEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total += 1;
    }

    /// Most recent events, newest first
    pub fn recent(&self, limit: usize) -> Vec<&AuditEvent> {
        self.events.iter().rev().take(limit).collect()
    }

    /// Events for one table, newest first
    pub fn by_table(&self, table_name: &str) -> Vec<&AuditEvent> {
        self.events
            .iter()
            .rev()
            .filter(|e| e.table_name == table_name)
            .collect()
    }

    /// Events that touched sensitive data, newest first
    pub fn sensitive_only(&self) -> Vec<&AuditEvent> {
        self.events
            .iter()
            .rev()
            .filter(|e| e.contains_sensitive_data)
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&AuditEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Events recorded since startup, including evicted ones
    pub fn total_count(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, table: &str, sensitive: bool) -> AuditEvent {
        AuditEvent {
            id: id.to_string(),
            timestamp: Utc::now(),
            table_name: table.to_string(),
            action: AuditAction::Read,
            actor: None,
            record_id: None,
            pii_fields: Vec::new(),
            pii_categories: HashMap::new(),
            contains_sensitive_data: sensitive,
            description: String::new(),
            availability: Availability::Fresh,
        }
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut log = AuditLog::new(2);
        log.record(event("a", "t", false));
        log.record(event("b", "t", false));
        log.record(event("c", "t", false));

        assert_eq!(log.len(), 2);
        assert_eq!(log.total_count(), 3);
        assert!(log.get("a").is_none());
        let ids: Vec<&str> = log.recent(10).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_filters() {
        let mut log = AuditLog::new(10);
        log.record(event("a", "user_profiles", false));
        log.record(event("b", "medical_exclusions_log", true));
        log.record(event("c", "user_profiles", false));

        assert_eq!(log.by_table("user_profiles").len(), 2);
        assert_eq!(log.sensitive_only().len(), 1);
        assert_eq!(log.sensitive_only()[0].id, "b");
        assert_eq!(log.recent(1)[0].id, "c");
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut log = AuditLog::new(0);
        log.record(event("a", "t", false));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_action_parse_and_display() {
        assert_eq!("EXPORT".parse::<AuditAction>(), Ok(AuditAction::Export));
        assert!("purge".parse::<AuditAction>().is_err());
        assert_eq!(AuditAction::Update.to_string(), "update");
    }
}
