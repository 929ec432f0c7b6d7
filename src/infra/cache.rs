//! Redis-backed cache handle.
//!
//! When the cache is disabled by configuration the handle degrades to a
//! no-op: reads always miss, writes are accepted and discarded. Callers
//! never need to branch on availability.

use std::{collections::HashMap, time::Duration};

use redis::{
    Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, aio::ConnectionManager,
};
use tracing::info;

use crate::config::CacheSettings;

use super::error::InfraError;

/// Handle to the key-value cache store.
///
/// Cloning is cheap; every clone shares the same managed connection.
#[derive(Clone)]
pub struct CacheStore {
    conn: Option<ConnectionManager>,
    default_ttl: Duration,
    entity_ttl: HashMap<String, Duration>,
}

impl CacheStore {
    /// Connect to Redis, or hand back a no-op handle when the cache is
    /// disabled. Enabled-but-unreachable is a hard error.
    pub async fn connect(settings: &CacheSettings) -> Result<Self, InfraError> {
        if !settings.enabled {
            info!(target = "telaio::cache", "cache disabled, using no-op handle");
            return Ok(Self {
                conn: None,
                default_ttl: settings.default_ttl,
                entity_ttl: settings.entity_ttl.clone(),
            });
        }

        let client = Client::open(ConnectionInfo {
            addr: ConnectionAddr::Tcp(settings.host.clone(), settings.port),
            redis: RedisConnectionInfo {
                db: settings.db,
                password: settings.password.clone(),
                ..Default::default()
            },
        })
        .map_err(|err| InfraError::cache(format!("invalid redis connection info: {err}")))?;

        let mut conn = ConnectionManager::new(client).await.map_err(|err| {
            InfraError::cache(format!(
                "redis at {}:{} unreachable: {err}",
                settings.host, settings.port
            ))
        })?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|err| InfraError::cache(format!("redis ping failed: {err}")))?;

        info!(
            target = "telaio::cache",
            host = %settings.host,
            port = settings.port,
            db = settings.db,
            pool_size = settings.pool_size.get(),
            min_idle_conns = settings.min_idle_conns,
            "redis connection established",
        );

        Ok(Self {
            conn: Some(conn),
            default_ttl: settings.default_ttl,
            entity_ttl: settings.entity_ttl.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    /// TTL for a named entity, falling back to the default. The store never
    /// applies TTLs on its own; callers pass the resolved value to `set`.
    pub fn ttl_for(&self, entity: &str) -> Duration {
        self.entity_ttl
            .get(entity)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Fetch a value. Always a miss on a disabled cache.
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(None);
        };

        let mut conn = conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|err| InfraError::cache(format!("get `{key}` failed: {err}")))
    }

    /// Store a value with the supplied TTL. Discarded on a disabled cache.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), InfraError> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(());
        };

        let mut conn = conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|err| InfraError::cache(format!("set `{key}` failed: {err}")))
    }

    /// Remove a value. A no-op on a disabled cache.
    pub async fn delete(&self, key: &str) -> Result<(), InfraError> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(());
        };

        let mut conn = conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|err| InfraError::cache(format!("delete `{key}` failed: {err}")))
    }

    /// Round-trip liveness probe. Trivially healthy when disabled.
    pub async fn ping(&self) -> Result<(), InfraError> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(());
        };

        let mut conn = conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| InfraError::cache(format!("ping failed: {err}")))
    }
}
