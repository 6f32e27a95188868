//! HTTP handlers for the Audit API
//!
//! Records data accesses annotated with their PII and exposes the log:
//! - POST /api/v1/audit/events      record an access
//! - GET  /api/v1/audit/events      list audit events (filterable)
//! - GET  /api/v1/audit/events/:id  get single audit event
//! - GET  /api/v1/audit/stats       summary statistics

use crate::api::ApiError;
use crate::audit::annotate::{AccessEntry, Auditor};
use crate::audit::log::AuditEvent;
use crate::error::to_json;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Shared state for audit handlers
#[derive(Clone)]
pub struct AuditState {
    pub auditor: Auditor,
}

/// Create the audit router
pub fn audit_router(state: AuditState) -> Router {
    Router::new()
        .route("/api/v1/audit/events", get(list_events).post(record_event))
        .route("/api/v1/audit/events/:id", get(get_event))
        .route("/api/v1/audit/stats", get(get_stats))
        .with_state(state)
}

// =============================================================================
// Query / Response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListEventsQuery {
    table: Option<String>,
    sensitive: Option<bool>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditStatsResponse {
    total_recorded: u64,
    buffered: usize,
    capacity: usize,
    sensitive: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/v1/audit/events
async fn record_event(
    State(state): State<AuditState>,
    Json(entry): Json<AccessEntry>,
) -> impl IntoResponse {
    if entry.table_name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(to_json(ApiError::bad_request("tableName must not be empty"))),
        );
    }
    let event = state.auditor.record_access(entry).await;
    (StatusCode::CREATED, Json(to_json(event)))
}

/// GET /api/v1/audit/events
async fn list_events(
    State(state): State<AuditState>,
    Query(params): Query<ListEventsQuery>,
) -> impl IntoResponse {
    let log = state.auditor.log().read().await;
    let limit = params.limit.unwrap_or(50).min(500);

    let mut events: Vec<&AuditEvent> = match &params.table {
        Some(table) => log.by_table(table),
        None => log.recent(log.len()),
    };
    if let Some(sensitive) = params.sensitive {
        events.retain(|e| e.contains_sensitive_data == sensitive);
    }
    events.truncate(limit);

    // Clone to release the read lock before serializing
    let owned: Vec<AuditEvent> = events.into_iter().cloned().collect();
    drop(log);
    Json(owned)
}

/// GET /api/v1/audit/events/:id
async fn get_event(State(state): State<AuditState>, Path(id): Path<String>) -> impl IntoResponse {
    let log = state.auditor.log().read().await;

    match log.get(&id) {
        Some(event) => (StatusCode::OK, Json(to_json(event))),
        None => (
            StatusCode::NOT_FOUND,
            Json(to_json(ApiError::not_found(format!(
                "Audit event {} not found",
                id
            )))),
        ),
    }
}

/// GET /api/v1/audit/stats
async fn get_stats(State(state): State<AuditState>) -> impl IntoResponse {
    let log = state.auditor.log().read().await;

    Json(AuditStatsResponse {
        total_recorded: log.total_count(),
        buffered: log.len(),
        capacity: log.capacity(),
        sensitive: log.sensitive_only().len(),
    })
}
