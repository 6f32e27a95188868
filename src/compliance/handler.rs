//! HTTP handlers for compliance reporting
//!
//! - GET /api/v1/compliance/report       JSON report
//! - GET /api/v1/compliance/report.html  HTML report

use crate::compliance::report::ComplianceReport;
use crate::privacy::cache::ClassificationCache;
use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

/// Shared state for compliance handlers
#[derive(Clone)]
pub struct ComplianceState {
    pub cache: Arc<ClassificationCache>,
}

/// Create the compliance router
pub fn compliance_router(state: ComplianceState) -> Router {
    Router::new()
        .route("/api/v1/compliance/report", get(report_json))
        .route("/api/v1/compliance/report.html", get(report_html))
        .with_state(state)
}

async fn build_report(state: &ComplianceState) -> ComplianceReport {
    let classifications = state.cache.get_classifications().await;
    ComplianceReport::build(&classifications)
}

/// GET /api/v1/compliance/report
async fn report_json(State(state): State<ComplianceState>) -> impl IntoResponse {
    Json(build_report(&state).await)
}

/// GET /api/v1/compliance/report.html
async fn report_html(State(state): State<ComplianceState>) -> impl IntoResponse {
    Html(build_report(&state).await.render_html())
}
