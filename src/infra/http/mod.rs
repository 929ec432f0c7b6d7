//! HTTP surface: router construction and default middleware.

mod middleware;

pub use middleware::{RequestContext, log_responses, set_request_context};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::ErrorReport;

use super::{cache::CacheStore, db::PostgresStore};

#[derive(Clone)]
pub struct AppState {
    pub db: PostgresStore,
    pub cache: CacheStore,
}

/// Build the router with the default middleware stack: panic recovery,
/// request-id injection, and response logging. Pure construction, no I/O.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_responses))
        .layer(axum::middleware::from_fn(set_request_context))
        .layer(CatchPanicLayer::new())
}

async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn readyz(State(state): State<AppState>) -> Response {
    if let Err(err) = state.db.health_check().await {
        let mut response = (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "postgres": "unavailable", "redis": "unknown" })),
        )
            .into_response();
        ErrorReport::from_error("infra::http::readyz", StatusCode::SERVICE_UNAVAILABLE, &err)
            .attach(&mut response);
        return response;
    }

    if let Err(err) = state.cache.ping().await {
        let mut response = (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "postgres": "ok", "redis": "unavailable" })),
        )
            .into_response();
        ErrorReport::from_error("infra::http::readyz", StatusCode::SERVICE_UNAVAILABLE, &err)
            .attach(&mut response);
        return response;
    }

    let redis = if state.cache.is_enabled() {
        "ok"
    } else {
        "disabled"
    };
    Json(json!({ "postgres": "ok", "redis": redis })).into_response()
}
