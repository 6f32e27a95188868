//! PII annotation of audit events

use crate::audit::log::{AuditAction, AuditEvent, AuditLog};
use crate::privacy::cache::ClassificationCache;
use crate::privacy::types::{Availability, ClassificationResult};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Marker appended to fields that need heightened legal treatment
pub const SPECIAL_CATEGORY_MARKER: &str = "[SPECIAL CATEGORY]";

/// Describe the PII in a classification result, e.g.
/// `email (DIRECT), exclusion_reason (HEALTH) [SPECIAL CATEGORY]`.
pub fn describe_pii(result: &ClassificationResult) -> String {
    if result.fields.is_empty() {
        return "none".to_string();
    }

    result
        .fields
        .iter()
        .map(|field| {
            let category = result
                .categories
                .get(field)
                .map(|c| c.as_str())
                .unwrap_or("UNKNOWN");
            if result.sensitive_fields.contains(field) {
                format!("{} ({}) {}", field, category, SPECIAL_CATEGORY_MARKER)
            } else {
                format!("{} ({})", field, category)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// A data access to audit
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEntry {
    pub table_name: String,
    pub action: AuditAction,
    #[serde(default)]
    pub actor: Option<String>,
    /// Falls back to the record's `id` field when absent
    #[serde(default)]
    pub record_id: Option<String>,
    pub record: serde_json::Map<String, serde_json::Value>,
}

/// Classifies audited records and appends annotated events to the log
#[derive(Clone)]
pub struct Auditor {
    cache: Arc<ClassificationCache>,
    log: Arc<RwLock<AuditLog>>,
}

impl Auditor {
    pub fn new(cache: Arc<ClassificationCache>, log: Arc<RwLock<AuditLog>>) -> Self {
        Self { cache, log }
    }

    pub fn log(&self) -> &Arc<RwLock<AuditLog>> {
        &self.log
    }

    /// Classify the record, record the annotated event and return it.
    pub async fn record_access(&self, entry: AccessEntry) -> AuditEvent {
        let result = self
            .cache
            .classify_fields(&entry.record, &entry.table_name)
            .await;

        let record_id = entry.record_id.or_else(|| {
            entry.record.get("id").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        });

        let description = format!(
            "{} on {}: {}",
            entry.action,
            entry.table_name,
            describe_pii(&result)
        );

        let event = AuditEvent {
            id: format!("aud-{}", uuid::Uuid::new_v4()),
            timestamp: Utc::now(),
            table_name: entry.table_name,
            action: entry.action,
            actor: entry.actor,
            record_id,
            pii_fields: result.fields,
            pii_categories: result.categories,
            contains_sensitive_data: result.has_sensitive_data,
            description,
            availability: result.availability,
        };

        if event.contains_sensitive_data {
            tracing::warn!(
                id = %event.id,
                table = %event.table_name,
                action = %event.action,
                fields = ?event.pii_fields,
                "Special category data accessed"
            );
        } else {
            tracing::info!(
                id = %event.id,
                table = %event.table_name,
                action = %event.action,
                pii_fields = event.pii_fields.len(),
                "Data access audited"
            );
        }
        if event.availability != Availability::Fresh {
            tracing::warn!(
                id = %event.id,
                availability = ?event.availability,
                "Audit event annotated without fresh classification data"
            );
        }

        self.log.write().await.record(event.clone());
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::privacy::store::MemoryStore;
    use crate::privacy::types::{FieldClassification, PiiCategory};
    use std::collections::HashMap;

    fn auditor() -> Auditor {
        let store = Arc::new(MemoryStore::new(vec![
            FieldClassification::new("public", "user_profiles", "email", PiiCategory::Direct, false),
            FieldClassification::new("public", "user_profiles", "last_login", PiiCategory::Behavioral, false),
            FieldClassification::new(
                "public",
                "medical_exclusions_log",
                "exclusion_reason",
                PiiCategory::Health,
                true,
            ),
        ]));
        let cache = Arc::new(ClassificationCache::new(store, &CacheConfig::default()));
        Auditor::new(cache, Arc::new(RwLock::new(AuditLog::new(100))))
    }

    #[test]
    fn test_describe_no_pii() {
        assert_eq!(
            describe_pii(&ClassificationResult::empty(Availability::Fresh)),
            "none"
        );
    }

    #[test]
    fn test_describe_marks_special_category() {
        let mut categories = HashMap::new();
        categories.insert("email".to_string(), PiiCategory::Direct);
        categories.insert("exclusion_reason".to_string(), PiiCategory::Health);
        let result = ClassificationResult {
            fields: vec!["email".to_string(), "exclusion_reason".to_string()],
            categories,
            has_sensitive_data: true,
            sensitive_fields: vec!["exclusion_reason".to_string()],
            availability: Availability::Fresh,
        };

        assert_eq!(
            describe_pii(&result),
            "email (DIRECT), exclusion_reason (HEALTH) [SPECIAL CATEGORY]"
        );
    }

    #[tokio::test]
    async fn test_record_access_annotates_event() {
        let auditor = auditor();
        let entry: AccessEntry = serde_json::from_value(serde_json::json!({
            "tableName": "user_profiles",
            "action": "update",
            "actor": "admin@studio.test",
            "record": {"id": 42, "email": "a@b.com", "last_login": "2024-01-01", "plan": "pro"}
        }))
        .unwrap();

        let event = auditor.record_access(entry).await;
        assert!(event.id.starts_with("aud-"));
        assert_eq!(event.record_id.as_deref(), Some("42"));
        assert_eq!(event.pii_fields, vec!["email".to_string(), "last_login".to_string()]);
        assert!(!event.contains_sensitive_data);
        assert_eq!(
            event.description,
            "update on user_profiles: email (DIRECT), last_login (BEHAVIORAL)"
        );

        let log = auditor.log().read().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log.get(&event.id).unwrap().table_name, "user_profiles");
    }

    #[tokio::test]
    async fn test_record_access_flags_health_data() {
        let auditor = auditor();
        let event = auditor
            .record_access(AccessEntry {
                table_name: "medical_exclusions_log".to_string(),
                action: AuditAction::Insert,
                actor: None,
                record_id: Some("ex-1".to_string()),
                record: serde_json::json!({"exclusion_reason": "pregnancy"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            })
            .await;

        assert!(event.contains_sensitive_data);
        assert_eq!(event.record_id.as_deref(), Some("ex-1"));
        assert!(event.description.ends_with(SPECIAL_CATEGORY_MARKER));
        assert_eq!(auditor.log().read().await.sensitive_only().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_event_never_stores_values() {
        let auditor = auditor();
        let event = auditor
            .record_access(AccessEntry {
                table_name: "user_profiles".to_string(),
                action: AuditAction::Read,
                actor: None,
                record_id: None,
                record: serde_json::json!({"email": "secret@example.com"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            })
            .await;

        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("secret@example.com"));
    }
}
