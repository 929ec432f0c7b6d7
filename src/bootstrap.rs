//! Ordered construction of the application's infrastructure.
//!
//! Providers run in the single topological order of the dependency graph:
//! telemetry, relational store, cache store, router, composition. The first
//! failure aborts the sequence, unwinds already-acquired resources newest
//! first, and surfaces the provider's error unchanged.

use std::sync::Mutex;

use axum::Router;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::AppError,
    infra::{
        cache::CacheStore,
        db::PostgresStore,
        http::{self, AppState},
        telemetry,
    },
};

type CleanupAction = (&'static str, BoxFuture<'static, ()>);

/// Long-lived application handle composed at the end of bootstrap.
///
/// Holds cheap clones of the shared resources; subsystems receive further
/// clones and never own the underlying pool or connection.
#[derive(Clone)]
pub struct App {
    pub settings: Settings,
    pub db: PostgresStore,
    pub cache: CacheStore,
    pub router: Router,
}

impl App {
    /// Pure aggregation of already-constructed parts; cannot fail.
    pub fn new(settings: Settings, db: PostgresStore, cache: CacheStore, router: Router) -> Self {
        Self {
            settings,
            db,
            cache,
            router,
        }
    }
}

/// LIFO stack of release actions accumulated while providers succeed.
struct CleanupStack {
    actions: Vec<CleanupAction>,
}

impl CleanupStack {
    fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    fn push<F>(&mut self, resource: &'static str, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.actions.push((resource, Box::pin(action)));
    }

    /// Release everything acquired so far, newest first.
    async fn unwind(self) {
        for (resource, action) in self.actions.into_iter().rev() {
            warn!(target = "telaio::bootstrap", resource, "rolling back");
            action.await;
        }
    }

    fn into_teardown(self) -> Teardown {
        Teardown {
            actions: Mutex::new(self.actions),
        }
    }
}

/// Aggregate cleanup callback handed to the caller on successful bootstrap.
///
/// Runs every registered action exactly once, newest first, and never
/// short-circuits: each action is awaited regardless of the others. A
/// second invocation finds the stack empty and does nothing.
pub struct Teardown {
    actions: Mutex<Vec<CleanupAction>>,
}

impl Teardown {
    pub async fn run(&self) {
        let actions = {
            let mut guard = self
                .actions
                .lock()
                .unwrap_or_else(|poison| poison.into_inner());
            std::mem::take(&mut *guard)
        };

        if actions.is_empty() {
            debug!(target = "telaio::bootstrap", "teardown already ran");
            return;
        }

        for (resource, action) in actions.into_iter().rev() {
            info!(target = "telaio::bootstrap", resource, "releasing");
            action.await;
        }
    }
}

/// Execute the providers in dependency order and compose the application.
///
/// Returns the handle plus the teardown on success, or the first provider
/// error after rolling back whatever had already been acquired.
pub async fn initialize(settings: Settings) -> Result<(App, Teardown), AppError> {
    telemetry::init(&settings.logging)?;

    info!(target = "telaio::bootstrap", "starting bootstrap");
    let mut cleanup = CleanupStack::new();

    let db = match PostgresStore::connect(&settings.database).await {
        Ok(db) => db,
        Err(err) => {
            cleanup.unwind().await;
            return Err(err.into());
        }
    };
    let db_handle = db.clone();
    cleanup.push("postgres pool", async move { db_handle.close().await });

    let cache = match CacheStore::connect(&settings.cache).await {
        Ok(cache) => cache,
        Err(err) => {
            cleanup.unwind().await;
            return Err(err.into());
        }
    };
    if cache.is_enabled() {
        cleanup.push("redis connection", async {
            // The managed connection closes when the last clone drops.
            debug!(target = "telaio::bootstrap", "redis connection released");
        });
    }

    let router = http::build_router(AppState {
        db: db.clone(),
        cache: cache.clone(),
    });

    let app = App::new(settings, db, cache, router);
    info!(target = "telaio::bootstrap", "bootstrap complete");

    Ok((app, cleanup.into_teardown()))
}
