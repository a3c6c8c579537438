//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{ClientError, ClientResult};

pub const DEFAULT_FILTER: &str = "vellum_client=info,vellum_cache=info";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured filter. Fails if a global subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> ClientResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| ClientError::Telemetry(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()
    };
    result.map_err(|e| ClientError::Telemetry(e.to_string()))
}

/// Default logging settings for callers without a config file.
pub fn default_logging() -> LoggingConfig {
    LoggingConfig {
        filter: DEFAULT_FILTER.to_string(),
        json: false,
    }
}
