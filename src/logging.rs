//! Logging and tracing initialization.
//!
//! Call one of these once, before creating the [`App`](crate::App). The
//! log level is controlled by the `RUST_LOG` environment variable, e.g.
//! `RUST_LOG=palisade=debug,tower_http=debug,sqlx=warn`.
//!
//! Token contents are never logged anywhere in the crate; authentication
//! failures log only an error class.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with sensible defaults (`info` if `RUST_LOG` unset).
///
/// # Panics
///
/// Panics if called more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize JSON-formatted logging (recommended for production, where
/// logs go to an aggregation system).
///
/// # Panics
///
/// Panics if called more than once.
pub fn init_logging_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
