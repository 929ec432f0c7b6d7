//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    collections::HashMap, net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use sqlx::postgres::PgSslMode;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::infra::retry::{Backoff, RetryPolicy};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "telaio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_HOST: &str = "127.0.0.1";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_MAX_OPEN_CONNS: u32 = 16;
const DEFAULT_DB_MAX_IDLE_CONNS: u32 = 4;
const DEFAULT_DB_CONN_MAX_LIFETIME_SECS: u64 = 1800;
const DEFAULT_DB_CONN_MAX_IDLE_SECS: u64 = 600;
const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DB_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_DB_RETRY_DELAY_MS: u64 = 500;
const DEFAULT_CACHE_HOST: &str = "127.0.0.1";
const DEFAULT_CACHE_PORT: u16 = 6379;
const DEFAULT_CACHE_POOL_SIZE: u32 = 8;
const DEFAULT_CACHE_DEFAULT_TTL_SECS: u64 = 300;

/// Command-line arguments for the Telaio binary.
#[derive(Debug, Parser)]
#[command(name = "telaio", version, about = "Telaio service frame")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TELAIO_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Telaio HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the log sink file path.
    #[arg(long = "log-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Override the Postgres host.
    #[arg(long = "database-host", value_name = "HOST")]
    pub database_host: Option<String>,

    /// Override the Postgres port.
    #[arg(long = "database-port", value_name = "PORT")]
    pub database_port: Option<u16>,

    /// Override the Postgres user.
    #[arg(long = "database-user", value_name = "USER")]
    pub database_user: Option<String>,

    /// Override the Postgres database name.
    #[arg(long = "database-dbname", value_name = "NAME")]
    pub database_dbname: Option<String>,

    /// Override the maximum number of open Postgres connections.
    #[arg(long = "database-max-open-conns", value_name = "COUNT")]
    pub database_max_open_conns: Option<u32>,

    /// Override the idle floor of the Postgres pool.
    #[arg(long = "database-max-idle-conns", value_name = "COUNT")]
    pub database_max_idle_conns: Option<u32>,

    /// Override the number of connection retries after the initial attempt.
    #[arg(long = "database-retry-attempts", value_name = "COUNT")]
    pub database_retry_attempts: Option<u32>,

    /// Override the delay between connection attempts.
    #[arg(long = "database-retry-delay-ms", value_name = "MILLIS")]
    pub database_retry_delay_ms: Option<u64>,

    /// Toggle the Redis cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the Redis host.
    #[arg(long = "cache-host", value_name = "HOST")]
    pub cache_host: Option<String>,

    /// Override the Redis port.
    #[arg(long = "cache-port", value_name = "PORT")]
    pub cache_port: Option<u16>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub ssl_mode: PgSslMode,
    pub debug: bool,
    pub max_open_conns: NonZeroU32,
    pub max_idle_conns: NonZeroU32,
    pub conn_max_lifetime: Duration,
    pub conn_max_idle_time: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    pub pool_size: NonZeroU32,
    pub min_idle_conns: u32,
    pub default_ttl: Duration,
    pub entity_ttl: HashMap<String, Duration>,
}

impl CacheSettings {
    /// TTL for a named entity, falling back to the default.
    pub fn ttl_for(&self, entity: &str) -> Duration {
        self.entity_ttl
            .get(entity)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("TELAIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(file) = overrides.log_file.as_ref() {
            self.logging.file = Some(file.clone());
        }
        if let Some(host) = overrides.database_host.as_ref() {
            self.database.host = Some(host.clone());
        }
        if let Some(port) = overrides.database_port {
            self.database.port = Some(port);
        }
        if let Some(user) = overrides.database_user.as_ref() {
            self.database.user = Some(user.clone());
        }
        if let Some(name) = overrides.database_dbname.as_ref() {
            self.database.dbname = Some(name.clone());
        }
        if let Some(max) = overrides.database_max_open_conns {
            self.database.max_open_conns = Some(max);
        }
        if let Some(max) = overrides.database_max_idle_conns {
            self.database.max_idle_conns = Some(max);
        }
        if let Some(attempts) = overrides.database_retry_attempts {
            self.database.retry_attempts = Some(attempts);
        }
        if let Some(delay) = overrides.database_retry_delay_ms {
            self.database.retry_delay_ms = Some(delay);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(host) = overrides.cache_host.as_ref() {
            self.cache.host = Some(host.clone());
        }
        if let Some(port) = overrides.cache_port {
            self.cache.port = Some(port);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let cache = build_cache_settings(cache)?;

        Ok(Self {
            server,
            logging,
            database,
            cache,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    if let Some(file) = logging.file.as_ref()
        && file.as_os_str().is_empty()
    {
        return Err(LoadError::invalid("logging.file", "path must not be empty"));
    }

    Ok(LoggingSettings {
        level,
        format,
        file: logging.file,
    })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let host = database.host.unwrap_or_else(|| DEFAULT_DB_HOST.to_string());
    if host.trim().is_empty() {
        return Err(LoadError::invalid("database.host", "must not be empty"));
    }

    let port = database.port.unwrap_or(DEFAULT_DB_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "database.port",
            "port must be greater than zero",
        ));
    }

    let user = required_non_empty(database.user, "database.user")?;
    let password = required_non_empty(database.password, "database.password")?;
    let dbname = required_non_empty(database.dbname, "database.dbname")?;

    let ssl_mode = match database.ssl_mode {
        Some(mode) => PgSslMode::from_str(mode.as_str()).map_err(|err| {
            LoadError::invalid("database.ssl_mode", format!("failed to parse: {err}"))
        })?,
        None => PgSslMode::default(),
    };

    let max_open = database.max_open_conns.unwrap_or(DEFAULT_DB_MAX_OPEN_CONNS);
    let max_idle = database.max_idle_conns.unwrap_or(DEFAULT_DB_MAX_IDLE_CONNS);
    let max_open_conns = non_zero_u32(max_open.into(), "database.max_open_conns")?;
    let max_idle_conns = non_zero_u32(max_idle.into(), "database.max_idle_conns")?;
    if max_idle_conns > max_open_conns {
        return Err(LoadError::invalid(
            "database.max_idle_conns",
            "must not exceed database.max_open_conns",
        ));
    }

    let conn_max_lifetime = positive_secs(
        database
            .conn_max_lifetime_seconds
            .unwrap_or(DEFAULT_DB_CONN_MAX_LIFETIME_SECS),
        "database.conn_max_lifetime_seconds",
    )?;
    let conn_max_idle_time = positive_secs(
        database
            .conn_max_idle_seconds
            .unwrap_or(DEFAULT_DB_CONN_MAX_IDLE_SECS),
        "database.conn_max_idle_seconds",
    )?;
    let connect_timeout = positive_secs(
        database
            .connect_timeout_seconds
            .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECS),
        "database.connect_timeout_seconds",
    )?;

    let retry_attempts = database.retry_attempts.unwrap_or(DEFAULT_DB_RETRY_ATTEMPTS);
    let retry_delay_ms = database.retry_delay_ms.unwrap_or(DEFAULT_DB_RETRY_DELAY_MS);
    if retry_delay_ms == 0 {
        return Err(LoadError::invalid(
            "database.retry_delay_ms",
            "must be greater than zero",
        ));
    }
    let backoff = match database.retry_backoff {
        Some(value) => Backoff::from_str(value.as_str())
            .map_err(|reason| LoadError::invalid("database.retry_backoff", reason))?,
        None => Backoff::Fixed,
    };

    Ok(DatabaseSettings {
        host,
        port,
        user,
        password,
        dbname,
        ssl_mode,
        debug: database.debug.unwrap_or(false),
        max_open_conns,
        max_idle_conns,
        conn_max_lifetime,
        conn_max_idle_time,
        connect_timeout,
        retry: RetryPolicy {
            attempts: retry_attempts,
            delay: Duration::from_millis(retry_delay_ms),
            backoff,
        },
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let host = cache.host.unwrap_or_else(|| DEFAULT_CACHE_HOST.to_string());
    if host.trim().is_empty() {
        return Err(LoadError::invalid("cache.host", "must not be empty"));
    }

    let port = cache.port.unwrap_or(DEFAULT_CACHE_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "cache.port",
            "port must be greater than zero",
        ));
    }

    let password = cache.password.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let pool_size = non_zero_u32(
        cache.pool_size.unwrap_or(DEFAULT_CACHE_POOL_SIZE).into(),
        "cache.pool_size",
    )?;
    let min_idle_conns = cache.min_idle_conns.unwrap_or(0);
    if min_idle_conns > pool_size.get() {
        return Err(LoadError::invalid(
            "cache.min_idle_conns",
            "must not exceed cache.pool_size",
        ));
    }

    let default_ttl = positive_secs(
        cache
            .default_ttl_seconds
            .unwrap_or(DEFAULT_CACHE_DEFAULT_TTL_SECS),
        "cache.default_ttl_seconds",
    )?;

    let mut entity_ttl = HashMap::with_capacity(cache.entity_ttl_seconds.len());
    for (entity, seconds) in cache.entity_ttl_seconds {
        if seconds == 0 {
            return Err(LoadError::invalid(
                "cache.entity_ttl_seconds",
                format!("ttl for `{entity}` must be greater than zero"),
            ));
        }
        entity_ttl.insert(entity, Duration::from_secs(seconds));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        host,
        port,
        password,
        db: cache.db.unwrap_or(0),
        pool_size,
        min_idle_conns,
        default_ttl,
        entity_ttl,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    dbname: Option<String>,
    ssl_mode: Option<String>,
    debug: Option<bool>,
    max_open_conns: Option<u32>,
    max_idle_conns: Option<u32>,
    conn_max_lifetime_seconds: Option<u64>,
    conn_max_idle_seconds: Option<u64>,
    connect_timeout_seconds: Option<u64>,
    retry_attempts: Option<u32>,
    retry_delay_ms: Option<u64>,
    retry_backoff: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    host: Option<String>,
    port: Option<u16>,
    password: Option<String>,
    db: Option<i64>,
    pool_size: Option<u32>,
    min_idle_conns: Option<u32>,
    default_ttl_seconds: Option<u64>,
    entity_ttl_seconds: HashMap<String, u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn required_non_empty(value: Option<String>, key: &'static str) -> Result<String, LoadError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(LoadError::invalid(key, "must not be empty")),
        None => Err(LoadError::invalid(key, "must be provided")),
    }
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn positive_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_required() -> RawSettings {
        let mut raw = RawSettings::default();
        raw.database.user = Some("app".to_string());
        raw.database.password = Some("secret".to_string());
        raw.database.dbname = Some("app".to_string());
        raw
    }

    #[test]
    fn missing_database_user_is_rejected_before_any_io() {
        let raw = RawSettings::default();
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "database.user"),
            other => panic!("expected invalid database.user, got {other:?}"),
        }
    }

    #[test]
    fn empty_database_password_is_rejected() {
        let mut raw = raw_with_required();
        raw.database.password = Some("   ".to_string());
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "database.password"),
            other => panic!("expected invalid database.password, got {other:?}"),
        }
    }

    #[test]
    fn defaults_resolve_for_required_only_input() {
        let settings = Settings::from_raw(raw_with_required()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(
            settings.server.graceful_shutdown,
            Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_SECS)
        );
        assert_eq!(settings.database.port, DEFAULT_DB_PORT);
        assert_eq!(settings.database.retry.attempts, DEFAULT_DB_RETRY_ATTEMPTS);
        assert_eq!(settings.database.retry.backoff, Backoff::Fixed);
        assert!(settings.cache.enabled);
        assert_eq!(
            settings.cache.default_ttl,
            Duration::from_secs(DEFAULT_CACHE_DEFAULT_TTL_SECS)
        );
        assert!(settings.logging.file.is_none());
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = raw_with_required();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            cache_enabled: Some(false),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert!(!settings.cache.enabled);
    }

    #[test]
    fn entity_ttls_fall_back_to_default() {
        let mut raw = raw_with_required();
        raw.cache
            .entity_ttl_seconds
            .insert("session".to_string(), 60);

        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.cache.ttl_for("session"), Duration::from_secs(60));
        assert_eq!(
            settings.cache.ttl_for("order"),
            Duration::from_secs(DEFAULT_CACHE_DEFAULT_TTL_SECS)
        );
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let mut raw = raw_with_required();
        raw.database.max_open_conns = Some(0);
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "database.max_open_conns"),
            other => panic!("expected invalid database.max_open_conns, got {other:?}"),
        }
    }

    #[test]
    fn idle_floor_may_not_exceed_pool_ceiling() {
        let mut raw = raw_with_required();
        raw.database.max_open_conns = Some(4);
        raw.database.max_idle_conns = Some(8);
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "database.max_idle_conns"),
            other => panic!("expected invalid database.max_idle_conns, got {other:?}"),
        }
    }

    #[test]
    fn zero_retry_attempts_are_allowed() {
        let mut raw = raw_with_required();
        raw.database.retry_attempts = Some(0);
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.database.retry.attempts, 0);
    }

    #[test]
    fn unknown_retry_backoff_is_rejected() {
        let mut raw = raw_with_required();
        raw.database.retry_backoff = Some("fibonacci".to_string());
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "database.retry_backoff"),
            other => panic!("expected invalid database.retry_backoff, got {other:?}"),
        }
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["telaio"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "telaio",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--database-user",
            "override",
            "--cache-enabled",
            "no",
        ]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(serve.overrides.database_user.as_deref(), Some("override"));
                assert_eq!(serve.overrides.cache_enabled, Some(false));
            }
        }
    }
}
