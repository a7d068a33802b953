//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    str::FromStr,
    time::Duration,
};

use axum::http::HeaderName;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{
    CliArgs, Command, DatabaseOverride, ReindexArgs, SeedArgs, ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "topzonal";
const ENV_PREFIX: &str = "TOPZONAL";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DB_QUERY_TIMEOUT_MS: u64 = 5000;
const DEFAULT_CACHE_KEY: &str = "popular-listings";
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_CACHE_LIMIT: u32 = 10;
const DEFAULT_CACHE_TIMEOUT_MS: u64 = 250;
const DEFAULT_SEARCH_INDEX: &str = "listings";
const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 2000;
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_ENTITLEMENT_DAYS: u32 = 30;
const DEFAULT_USER_HEADER: &str = "x-user-id";
const DEFAULT_API_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_API_RATE_LIMIT_MAX_REQUESTS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub search: SearchSettings,
    pub payments: PaymentSettings,
    pub auth: AuthSettings,
    pub api_rate_limit: ApiRateLimitSettings,
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
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub query_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Shared store; the in-process store is used when unset.
    pub redis_url: Option<String>,
    pub key: String,
    pub ttl_seconds: NonZeroU64,
    pub limit: NonZeroU32,
    pub timeout_ms: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// `None` disables index mirroring.
    pub credentials: Option<SearchCredentials>,
    pub index_name: String,
    pub base_url: Option<Url>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchCredentials {
    pub app_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub webhook_secret: Option<String>,
    pub tolerance: Duration,
    pub entitlement_days: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub user_header: HeaderName,
}

#[derive(Debug, Clone)]
pub struct ApiRateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
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

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Seed(args)) => raw.apply_database_override(&args.database),
        Some(Command::Reindex(args)) => {
            raw.apply_database_override(&args.database);
            if let Some(name) = args.search_index_name.as_ref() {
                raw.search.index_name = Some(name.clone());
            }
        }
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
    search: RawSearchSettings,
    payments: RawPaymentSettings,
    auth: RawAuthSettings,
    api_rate_limit: RawApiRateLimitSettings,
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
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(url) = overrides.cache_redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(name) = overrides.search_index_name.as_ref() {
            self.search.index_name = Some(name.clone());
        }
        if let Some(window) = overrides.api_rate_limit_window_seconds {
            self.api_rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.api_rate_limit_max_requests {
            self.api_rate_limit.max_requests = Some(max);
        }

        self.apply_database_override(&overrides.database);
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
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
            search,
            payments,
            auth,
            api_rate_limit,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            search: build_search_settings(search)?,
            payments: build_payment_settings(payments)?,
            auth: build_auth_settings(auth)?,
            api_rate_limit: build_api_rate_limit_settings(api_rate_limit)?,
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

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;
    let query_timeout_ms = non_zero_u64(
        database
            .query_timeout_ms
            .unwrap_or(DEFAULT_DB_QUERY_TIMEOUT_MS),
        "database.query_timeout_ms",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
        query_timeout: Duration::from_millis(query_timeout_ms.get()),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let redis_url = non_blank(cache.redis_url);
    if let Some(url) = redis_url.as_ref() {
        Url::parse(url)
            .map_err(|err| LoadError::invalid("cache.redis_url", format!("invalid URL: {err}")))?;
    }

    let key = non_blank(cache.key).unwrap_or_else(|| DEFAULT_CACHE_KEY.to_string());

    Ok(CacheSettings {
        redis_url,
        key,
        ttl_seconds: non_zero_u64(
            cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS),
            "cache.ttl_seconds",
        )?,
        limit: non_zero_u32(
            cache.limit.unwrap_or(DEFAULT_CACHE_LIMIT).into(),
            "cache.limit",
        )?,
        timeout_ms: non_zero_u64(
            cache.timeout_ms.unwrap_or(DEFAULT_CACHE_TIMEOUT_MS),
            "cache.timeout_ms",
        )?,
    })
}

fn build_search_settings(search: RawSearchSettings) -> Result<SearchSettings, LoadError> {
    let credentials = match (non_blank(search.app_id), non_blank(search.api_key)) {
        (Some(app_id), Some(api_key)) => Some(SearchCredentials { app_id, api_key }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(LoadError::invalid(
                "search.api_key",
                "must be set when search.app_id is set",
            ));
        }
        (None, Some(_)) => {
            return Err(LoadError::invalid(
                "search.app_id",
                "must be set when search.api_key is set",
            ));
        }
    };

    let index_name =
        non_blank(search.index_name).unwrap_or_else(|| DEFAULT_SEARCH_INDEX.to_string());

    let base_url = non_blank(search.base_url)
        .map(|value| {
            Url::parse(&value).map_err(|err| {
                LoadError::invalid("search.base_url", format!("invalid URL: {err}"))
            })
        })
        .transpose()?;

    let timeout_ms = non_zero_u64(
        search.timeout_ms.unwrap_or(DEFAULT_SEARCH_TIMEOUT_MS),
        "search.timeout_ms",
    )?;

    Ok(SearchSettings {
        credentials,
        index_name,
        base_url,
        timeout: Duration::from_millis(timeout_ms.get()),
    })
}

fn build_payment_settings(payments: RawPaymentSettings) -> Result<PaymentSettings, LoadError> {
    let tolerance_secs = non_zero_u64(
        payments
            .tolerance_seconds
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS),
        "payments.tolerance_seconds",
    )?;
    let entitlement_days = non_zero_u32(
        payments
            .entitlement_days
            .unwrap_or(DEFAULT_ENTITLEMENT_DAYS)
            .into(),
        "payments.entitlement_days",
    )?;

    Ok(PaymentSettings {
        webhook_secret: non_blank(payments.webhook_secret),
        tolerance: Duration::from_secs(tolerance_secs.get()),
        entitlement_days,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let name = non_blank(auth.user_header).unwrap_or_else(|| DEFAULT_USER_HEADER.to_string());
    let user_header = HeaderName::from_str(&name).map_err(|err| {
        LoadError::invalid("auth.user_header", format!("invalid header name: {err}"))
    })?;
    Ok(AuthSettings { user_header })
}

fn build_api_rate_limit_settings(
    rate_limit: RawApiRateLimitSettings,
) -> Result<ApiRateLimitSettings, LoadError> {
    let window_seconds_val = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_API_RATE_LIMIT_WINDOW_SECS);
    let window_seconds = non_zero_u32(window_seconds_val, "api_rate_limit.window_seconds")?;

    let max_requests_val = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_API_RATE_LIMIT_MAX_REQUESTS);
    let max_requests = non_zero_u32(max_requests_val, "api_rate_limit.max_requests")?;

    Ok(ApiRateLimitSettings {
        window_seconds,
        max_requests,
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
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    query_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    redis_url: Option<String>,
    key: Option<String>,
    ttl_seconds: Option<u64>,
    limit: Option<u32>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    app_id: Option<String>,
    api_key: Option<String>,
    index_name: Option<String>,
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPaymentSettings {
    webhook_secret: Option<String>,
    tolerance_seconds: Option<u64>,
    entitlement_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    user_header: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
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

fn non_zero_u64(value: u64, key: &'static str) -> Result<NonZeroU64, LoadError> {
    NonZeroU64::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
