//! Postgres connection handling.

use sqlx::{
    ConnectOptions, query,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
};
use tracing::info;

use crate::config::DatabaseSettings;

use super::{error::InfraError, retry};

/// Pooled handle to the relational store.
///
/// Cloning is cheap; every clone shares the same underlying pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Establish the pool, retrying per the configured policy and verifying
    /// liveness with a round-trip query before returning.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, InfraError> {
        let pool = retry::with_retry(&settings.retry, "postgres connect", || async {
            let pool = Self::pool_options(settings)
                .connect_with(Self::connect_options(settings))
                .await?;
            query("SELECT 1").execute(&pool).await?;
            Ok::<_, sqlx::Error>(pool)
        })
        .await
        .map_err(|err| {
            InfraError::database(format!(
                "postgres at {}:{} unreachable after {} attempts: {err}",
                settings.host,
                settings.port,
                settings.retry.total_attempts()
            ))
        })?;

        info!(
            target = "telaio::db",
            host = %settings.host,
            port = settings.port,
            dbname = %settings.dbname,
            max_open_conns = settings.max_open_conns.get(),
            max_idle_conns = settings.max_idle_conns.get(),
            "postgres pool established",
        );

        Ok(Self { pool })
    }

    /// Build the pool without touching the network. Connections are opened
    /// on first acquire; used by tooling and tests.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Self {
        Self {
            pool: Self::pool_options(settings).connect_lazy_with(Self::connect_options(settings)),
        }
    }

    fn connect_options(settings: &DatabaseSettings) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.dbname)
            .ssl_mode(settings.ssl_mode);

        if settings.debug {
            options
        } else {
            options.disable_statement_logging()
        }
    }

    fn pool_options(settings: &DatabaseSettings) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(settings.max_open_conns.get())
            .min_connections(settings.max_idle_conns.get())
            .max_lifetime(settings.conn_max_lifetime)
            .idle_timeout(settings.conn_max_idle_time)
            .acquire_timeout(settings.connect_timeout)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(&self.pool).await.map(|_| ())
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(target = "telaio::db", "postgres pool closed");
    }
}
