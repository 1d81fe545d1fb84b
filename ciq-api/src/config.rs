//! API Configuration Module
//!
//! Configuration for the HTTP listener, the snapshot store connection and the
//! inventory cache, loaded from `CIQ_*` environment variables with defaults
//! suitable for local development.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use ciq_core::ConfigError;
use ciq_storage::{CacheConfig, RedisConfig, RefreshPolicy};
use secrecy::{ExposeSecret, SecretString};

// ============================================================================
// LOG FORMAT
// ============================================================================

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ConfigError::InvalidValue {
                field: "CIQ_LOG_FORMAT".to_string(),
                value: s.to_string(),
                reason: "expected 'json' or 'pretty'".to_string(),
            }),
        }
    }
}

impl LogFormat {
    /// Read `CIQ_LOG_FORMAT`, falling back to JSON on absent or unknown values.
    ///
    /// Logging starts before the rest of the configuration is validated, so
    /// this never fails.
    pub fn from_env() -> Self {
        std::env::var("CIQ_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ApiConfig {
    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "CIQ_API_HOST".to_string(),
                value: self.host.clone(),
                reason: e.to_string(),
            })
    }
}

// ============================================================================
// SNAPSHOT STORE CONFIGURATION
// ============================================================================

/// Connection settings for the Redis instance holding the inventory.
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<SecretString>,
    pub database: u32,
    pub key: String,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            database: 0,
            key: ciq_storage::DEFAULT_SNAPSHOT_KEY.to_string(),
            timeout: Duration::from_millis(2000),
        }
    }
}

impl StoreConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Client configuration for [`ciq_storage::RedisSnapshotClient`].
    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig {
            address: self.address(),
            password: self
                .password
                .as_ref()
                .map(|p| SecretString::new(p.expose_secret().into())),
            database: self.database,
            key: self.key.clone(),
            io_timeout: self.timeout,
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("key", &self.key)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// COMPLETE CONFIGURATION
// ============================================================================

/// Everything the server needs at startup.
#[derive(Debug, Default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Create AppConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CIQ_API_HOST`, `CIQ_API_PORT`: listener (default `0.0.0.0:8080`)
    /// - `CIQ_DB_HOST`, `CIQ_DB_PORT`: Redis address (default `127.0.0.1:6379`)
    /// - `CIQ_DB_PASS`: Redis password (default: none)
    /// - `CIQ_DB_INDEX`: Redis database (default: 0)
    /// - `CIQ_DB_KEY`: key holding the inventory (default: `Stock`)
    /// - `CIQ_DB_TIMEOUT_MS`: connect and command timeout (default: 2000)
    /// - `CIQ_FETCH_TIMEOUT_MS`: deadline for a whole fetch (default: 5000)
    /// - `CIQ_REFRESH_POLICY`: `coalesced` or `independent` (default: coalesced)
    /// - `CIQ_MAX_STALENESS_SECS`: readiness staleness bound (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = AppConfig::default();

        let api = ApiConfig {
            host: var("CIQ_API_HOST").unwrap_or(defaults.api.host),
            port: parse_or(var("CIQ_API_PORT"), "CIQ_API_PORT", defaults.api.port)?,
        };

        let store = StoreConfig {
            host: var("CIQ_DB_HOST").unwrap_or(defaults.store.host),
            port: parse_or(var("CIQ_DB_PORT"), "CIQ_DB_PORT", defaults.store.port)?,
            password: var("CIQ_DB_PASS").map(|p| SecretString::new(p.into())),
            database: parse_or(var("CIQ_DB_INDEX"), "CIQ_DB_INDEX", defaults.store.database)?,
            key: var("CIQ_DB_KEY").unwrap_or(defaults.store.key),
            timeout: millis_or(var("CIQ_DB_TIMEOUT_MS"), "CIQ_DB_TIMEOUT_MS", defaults.store.timeout)?,
        };

        let refresh_policy = match var("CIQ_REFRESH_POLICY") {
            Some(raw) => raw.parse::<RefreshPolicy>().map_err(|_| ConfigError::InvalidValue {
                field: "CIQ_REFRESH_POLICY".to_string(),
                value: raw,
                reason: "expected 'coalesced' or 'independent'".to_string(),
            })?,
            None => defaults.cache.refresh_policy,
        };

        let cache = CacheConfig::new()
            .with_fetch_timeout(millis_or(
                var("CIQ_FETCH_TIMEOUT_MS"),
                "CIQ_FETCH_TIMEOUT_MS",
                defaults.cache.fetch_timeout,
            )?)
            .with_refresh_policy(refresh_policy)
            .with_max_staleness(Duration::from_secs(parse_or(
                var("CIQ_MAX_STALENESS_SECS"),
                "CIQ_MAX_STALENESS_SECS",
                defaults.cache.max_staleness.as_secs(),
            )?));

        Ok(Self { api, store, cache })
    }
}

fn parse_or<T>(raw: Option<String>, field: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn millis_or(raw: Option<String>, field: &str, default: Duration) -> Result<Duration, ConfigError> {
    let millis = parse_or(raw, field, default.as_millis() as u64)?;
    if millis == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: "0".to_string(),
            reason: "timeout must be positive".to_string(),
        });
    }
    Ok(Duration::from_millis(millis))
}
