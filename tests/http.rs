use std::{collections::HashMap, num::NonZeroU32, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use sqlx::postgres::PgSslMode;
use telaio::{
    config::{CacheSettings, DatabaseSettings},
    infra::{
        cache::CacheStore,
        db::PostgresStore,
        http::{AppState, RequestContext, build_router},
        retry::{Backoff, RetryPolicy},
    },
};
use tower::ServiceExt;

// Port 1 (tcpmux) is assumed closed; connection attempts fail immediately.
const CLOSED_PORT: u16 = 1;

fn unreachable_database_settings() -> DatabaseSettings {
    DatabaseSettings {
        host: "127.0.0.1".to_string(),
        port: CLOSED_PORT,
        user: "app".to_string(),
        password: "secret".to_string(),
        dbname: "app".to_string(),
        ssl_mode: PgSslMode::Disable,
        debug: false,
        max_open_conns: NonZeroU32::new(2).unwrap(),
        max_idle_conns: NonZeroU32::new(1).unwrap(),
        conn_max_lifetime: Duration::from_secs(1800),
        conn_max_idle_time: Duration::from_secs(600),
        connect_timeout: Duration::from_secs(1),
        retry: RetryPolicy {
            attempts: 0,
            delay: Duration::from_millis(1),
            backoff: Backoff::Fixed,
        },
    }
}

fn disabled_cache_settings() -> CacheSettings {
    CacheSettings {
        enabled: false,
        host: "127.0.0.1".to_string(),
        port: CLOSED_PORT,
        password: None,
        db: 0,
        pool_size: NonZeroU32::new(2).unwrap(),
        min_idle_conns: 0,
        default_ttl: Duration::from_secs(300),
        entity_ttl: HashMap::new(),
    }
}

async fn state_with_down_backends() -> AppState {
    let db = PostgresStore::connect_lazy(&unreachable_database_settings());
    let cache = CacheStore::connect(&disabled_cache_settings())
        .await
        .expect("disabled cache never fails");
    AppState { db, cache }
}

#[tokio::test]
async fn healthz_answers_without_touching_backends() {
    let router = build_router(state_with_down_backends().await);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let router = build_router(state_with_down_backends().await);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    let ctx = response
        .extensions()
        .get::<RequestContext>()
        .expect("request context");
    assert!(!ctx.request_id.is_empty());
}

#[tokio::test]
async fn readyz_reports_unavailable_when_postgres_is_down() {
    let router = build_router(state_with_down_backends().await);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unknown_routes_fall_through_to_not_found() {
    let router = build_router(state_with_down_backends().await);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/no-such-route")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
