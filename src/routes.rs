use crate::infra::AppState;
use crate::placement::jobs::{job_router, IdentityResolver, JobBoard, Notifier, PlacementStore};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::Arc;

/// Mount point of the job resource.
pub const JOBS_ROOT: &str = "/api/jobs";

/// Job routes under [`JOBS_ROOT`] plus the health and readiness endpoints.
pub fn with_job_routes<S, N>(
    board: Arc<JobBoard<S, N>>,
    resolver: Arc<dyn IdentityResolver>,
) -> Router
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .nest(JOBS_ROOT, job_router(board, resolver))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
