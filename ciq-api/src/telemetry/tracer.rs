//! Tracing Subscriber Initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! JSON formatter (default, for log aggregation) or a human-readable one.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::error::{ApiError, ApiResult};

/// Filter directives used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "ciq_api=debug,ciq_storage=debug,tower_http=info,info";

/// The filter from `RUST_LOG`, or [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup before anything logs. Fails if a global subscriber
/// is already installed.
pub fn init_tracing(format: LogFormat) -> ApiResult<()> {
    let registry = tracing_subscriber::registry().with(default_env_filter());

    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::debug!(format = ?format, "Logging initialized");
    Ok(())
}
