//! Unified API router for piitag
//!
//! Merges all module routers into a single axum `Router` with CORS,
//! request tracing and consistent error bodies.
//!
//! ## Endpoint Map
//!
//! | Prefix                 | Module     | Description                         |
//! |------------------------|------------|-------------------------------------|
//! | `/health`              | api        | Liveness probe                      |
//! | `/api/v1/pii/*`        | privacy    | Classify, list, refresh, cache stats|
//! | `/api/v1/audit/*`      | audit      | Annotated access events, stats      |
//! | `/api/v1/compliance/*` | compliance | Personal data inventory report      |

use crate::audit::{audit_router, AuditLog, AuditState, Auditor};
use crate::compliance::{compliance_router, ComplianceState};
use crate::config::PiitagConfig;
use crate::error::{Error, Result};
use crate::privacy::{privacy_router, store_from_config, ClassificationCache, PrivacyState};
use axum::{
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// API error body: `{"error": {"code", "message"}}`
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("STORE_UNAVAILABLE", message)
    }
}

/// Long-lived services shared by every router
#[derive(Clone)]
pub struct Services {
    pub cache: Arc<ClassificationCache>,
    pub auditor: Auditor,
}

impl Services {
    /// Wire the store, cache and audit log described by the configuration
    pub fn from_config(config: &PiitagConfig) -> Result<Self> {
        let store = store_from_config(&config.store)?;
        tracing::info!(store = store.name(), ttl_secs = config.cache.ttl_secs, "Classification store configured");

        let cache = Arc::new(ClassificationCache::new(store, &config.cache));
        let log = Arc::new(RwLock::new(AuditLog::new(config.audit.capacity)));
        let auditor = Auditor::new(cache.clone(), log);
        Ok(Self { cache, auditor })
    }
}

/// Build the complete piitag HTTP application
pub fn build_app(services: &Services, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(privacy_router(PrivacyState {
            cache: services.cache.clone(),
        }))
        .merge(audit_router(AuditState {
            auditor: services.auditor.clone(),
        }))
        .merge(compliance_router(ComplianceState {
            cache: services.cache.clone(),
        }))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
}

/// Bind and serve until Ctrl+C
pub async fn serve(config: PiitagConfig) -> Result<()> {
    let services = Services::from_config(&config)?;
    let app = build_app(&services, &config.server.cors_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    tracing::info!(addr = %addr, "piitag API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        })
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(parsed)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileStoreConfig, StoreConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn file_backed_services(dir: &tempfile::TempDir) -> Services {
        let path = dir.path().join("classifications.json");
        std::fs::write(
            &path,
            serde_json::json!([
                {"schema_name": "public", "table_name": "user_profiles", "column_name": "email", "pii_category": "DIRECT"},
                {"schema_name": "public", "table_name": "medical_exclusions_log", "column_name": "exclusion_reason", "pii_category": "HEALTH", "is_sensitive": true}
            ])
            .to_string(),
        )
        .unwrap();

        let config = PiitagConfig {
            store: StoreConfig::File(FileStoreConfig { path }),
            ..Default::default()
        };
        Services::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let services = Services::from_config(&PiitagConfig::default()).unwrap();
        let resp = build_app(&services, &[])
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_audit_and_report_share_cache() {
        let dir = tempfile::tempdir().unwrap();
        let services = file_backed_services(&dir);
        let app = build_app(&services, &["http://localhost:5173".to_string()]);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/audit/events")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "tableName": "medical_exclusions_log",
                            "action": "read",
                            "record": {"exclusion_reason": "back injury"}
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(resp).await["containsSensitiveData"], true);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/compliance/report")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["piiFields"], 2);

        // One load served both requests
        assert_eq!(services.cache.stats().await.loads, 1);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let services = Services::from_config(&PiitagConfig::default()).unwrap();
        let resp = build_app(&services, &["http://localhost:5173".to_string()])
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/v1/pii/classify")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
    }

    #[test]
    fn test_api_error_shape() {
        let json = serde_json::to_value(ApiError::not_found("missing")).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "missing");
    }
}
