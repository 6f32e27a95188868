//! HTTP handlers for the PII classification API
//!
//! - POST /api/v1/pii/classify         classify the fields of one record
//! - GET  /api/v1/pii/classifications  list cached classifications (filterable by table)
//! - POST /api/v1/pii/refresh          force a reload from the store
//! - GET  /api/v1/pii/cache            cache state and counters

use crate::api::ApiError;
use crate::error::to_json;
use crate::privacy::cache::ClassificationCache;
use crate::privacy::types::{ClassificationResult, FieldClassification};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state for PII handlers
#[derive(Clone)]
pub struct PrivacyState {
    pub cache: Arc<ClassificationCache>,
}

/// Create the PII router
pub fn privacy_router(state: PrivacyState) -> Router {
    Router::new()
        .route("/api/v1/pii/classify", post(classify))
        .route("/api/v1/pii/classifications", get(list_classifications))
        .route("/api/v1/pii/refresh", post(refresh))
        .route("/api/v1/pii/cache", get(cache_stats))
        .with_state(state)
}

// =============================================================================
// Request / Response types
// =============================================================================

/// Request body for POST /api/v1/pii/classify
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub table_name: String,
    pub record: serde_json::Map<String, serde_json::Value>,
}

/// Response from POST /api/v1/pii/classify
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub table_name: String,
    #[serde(flatten)]
    pub result: ClassificationResult,
    /// Human-readable summary, e.g. `email (DIRECT)`
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct ClassificationsQuery {
    table: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    entries: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/v1/pii/classify
async fn classify(
    State(state): State<PrivacyState>,
    Json(request): Json<ClassifyRequest>,
) -> impl IntoResponse {
    if request.table_name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(to_json(ApiError::bad_request("tableName must not be empty"))),
        );
    }

    let result = state
        .cache
        .classify_fields(&request.record, &request.table_name)
        .await;
    let description = crate::audit::describe_pii(&result);

    (
        StatusCode::OK,
        Json(to_json(ClassifyResponse {
            table_name: request.table_name,
            result,
            description,
        })),
    )
}

/// GET /api/v1/pii/classifications?table=user_profiles
async fn list_classifications(
    State(state): State<PrivacyState>,
    Query(params): Query<ClassificationsQuery>,
) -> impl IntoResponse {
    let classifications = state.cache.get_classifications().await;

    let mut rows: Vec<&FieldClassification> = classifications
        .values()
        .filter(|c| {
            params
                .table
                .as_deref()
                .map_or(true, |table| c.table_name == table)
        })
        .collect();
    rows.sort_by(|a, b| {
        (&a.table_name, &a.column_name).cmp(&(&b.table_name, &b.column_name))
    });

    Json(to_json(rows))
}

/// POST /api/v1/pii/refresh
async fn refresh(State(state): State<PrivacyState>) -> impl IntoResponse {
    match state.cache.refresh().await {
        Ok(entries) => (StatusCode::OK, Json(to_json(RefreshResponse { entries }))),
        Err(e) => {
            tracing::warn!(error = %e, "Manual PII classification refresh failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(to_json(ApiError::unavailable(e.to_string()))),
            )
        }
    }
}

/// GET /api/v1/pii/cache
async fn cache_stats(State(state): State<PrivacyState>) -> impl IntoResponse {
    Json(to_json(state.cache.stats().await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::error::{Error, Result};
    use crate::privacy::store::{ClassificationStore, MemoryStore};
    use crate::privacy::types::PiiCategory;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct DownStore;

    #[async_trait]
    impl ClassificationStore for DownStore {
        async fn load_all(&self) -> Result<Vec<FieldClassification>> {
            Err(Error::Store("database unreachable".to_string()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    fn make_app_with(store: Arc<dyn ClassificationStore>) -> Router {
        let cache = Arc::new(ClassificationCache::new(store, &CacheConfig::default()));
        privacy_router(PrivacyState { cache })
    }

    fn make_app() -> Router {
        make_app_with(Arc::new(MemoryStore::new(vec![
            FieldClassification::new("public", "user_profiles", "email", PiiCategory::Direct, false),
            FieldClassification::new("public", "user_profiles", "birth_year", PiiCategory::Indirect, false),
            FieldClassification::new(
                "public",
                "medical_exclusions_log",
                "exclusion_reason",
                PiiCategory::Health,
                true,
            ),
        ])))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn classify_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/pii/classify")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_classify_health_record() {
        let resp = make_app()
            .oneshot(classify_request(serde_json::json!({
                "tableName": "medical_exclusions_log",
                "record": {"exclusion_reason": "pregnancy", "id": 4}
            })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["tableName"], "medical_exclusions_log");
        assert_eq!(json["fields"], serde_json::json!(["exclusion_reason"]));
        assert_eq!(json["categories"]["exclusion_reason"], "HEALTH");
        assert_eq!(json["hasSensitiveData"], true);
        assert_eq!(json["availability"], "fresh");
        assert_eq!(
            json["description"],
            "exclusion_reason (HEALTH) [SPECIAL CATEGORY]"
        );
    }

    #[tokio::test]
    async fn test_classify_rejects_empty_table() {
        let resp = make_app()
            .oneshot(classify_request(serde_json::json!({
                "tableName": "",
                "record": {"email": "a@b.com"}
            })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_classify_with_store_down_is_fail_open() {
        let resp = make_app_with(Arc::new(DownStore))
            .oneshot(classify_request(serde_json::json!({
                "tableName": "user_profiles",
                "record": {"email": "a@b.com"}
            })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["fields"], serde_json::json!([]));
        assert_eq!(json["availability"], "unavailable");
    }

    #[tokio::test]
    async fn test_list_classifications_filtered() {
        let resp = make_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/pii/classifications?table=user_profiles")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["column_name"], "birth_year");
        assert_eq!(rows[1]["column_name"], "email");
    }

    #[tokio::test]
    async fn test_refresh_ok() {
        let resp = make_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/pii/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["entries"], 3);
    }

    #[tokio::test]
    async fn test_refresh_store_down() {
        let resp = make_app_with(Arc::new(DownStore))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/pii/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_cache_stats_before_first_lookup() {
        let resp = make_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/pii/cache")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(resp).await;
        assert_eq!(json["state"], "cold");
        assert_eq!(json["entries"], 0);
        assert_eq!(json["ttlSecs"], 3600);
        assert_eq!(json["store"], "memory");
    }
}
