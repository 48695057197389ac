//! Tracing subscriber setup for the embedding application.

use crate::config::WalletConfig;
use crate::error::WalletError;

/// Install the global subscriber described by `config`.
///
/// An unparsable `log_level` is an error even when `RUST_LOG` would
/// override it.
pub fn init_tracing_from(config: &WalletConfig) -> Result<(), WalletError> {
    tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .map_err(|e| WalletError::Config(format!("invalid log level {:?}: {e}", config.log_level)))?;
    init_tracing(&config.log_level, &config.log_format)
}

/// Install a global tracing subscriber with the given level and format.
///
/// `RUST_LOG` takes precedence over `level`. Pass `format = "json"` for
/// structured output; anything else is human-readable text. Returns an
/// error if a global subscriber is already installed.
pub fn init_tracing(level: &str, format: &str) -> Result<(), WalletError> {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init()
    };

    result.map_err(|e| WalletError::Config(format!("tracing already initialized: {e}")))
}
