//! Shared logging utilities for elementable consumers.
//!
//! The `elementable` library only emits `tracing` events; installing a
//! subscriber is left to the application (or test suite) through this crate.

use anyhow::{anyhow, Result};
use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "elementable=info";
const VERBOSE_LOG_FILTER: &str = "elementable=debug";

static TEST_LOGGING: Once = Once::new();

/// Logging configuration for an application embedding a catalog.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Initialize tracing with stderr output.
///
/// `RUST_LOG` wins over the built-in filter when set.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config)));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install subscriber for {}: {}", config.app_name, e))?;

    Ok(())
}

/// Install a test-writer subscriber once per process.
///
/// Safe to call from every test; later calls are no-ops.
pub fn init_test_logging() {
    TEST_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(VERBOSE_LOG_FILTER));
        // Another harness may already own the global subscriber.
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    });
}

/// Filter directive covering the library and the embedding application.
pub fn default_filter(config: &LogConfig<'_>) -> String {
    let base = if config.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let app = sanitize_name(config.app_name);
    if app.is_empty() || app == "elementable" {
        return base.to_string();
    }
    let level = if config.verbose { "debug" } else { "info" };
    format!("{},{}={}", base, app, level)
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' { ch } else { '_' })
        .collect()
}
