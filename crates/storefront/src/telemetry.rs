//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogConfig, LogFormat};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "bookstore_storefront=info";

/// Install the global tracing subscriber.
///
/// Respects `RUST_LOG`, falling back to [`DEFAULT_FILTER`]. Does nothing if
/// a subscriber is already installed.
pub fn init_tracing(config: &LogConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(format = ?config.format, "Tracing initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(&LogConfig::default());
        init_tracing(&LogConfig {
            format: LogFormat::Json,
        });
    }
}
