//! Logging utilities for fob-stats
//!
//! This module is only available with the `logging` feature.
//!
//! For library users: fob-stats emits tracing events - install your own subscriber.
//! Records written by `TracingSink` use the `fob_stats::snapshot` target, so
//! `RUST_LOG=fob_stats::snapshot=info` shows only the per-build records.

use std::sync::Once;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogLevel, StatsConfig};

static INIT: Once = Once::new();

fn directive(level: LogLevel) -> Directive {
    let filter = match level {
        LogLevel::Silent => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
    };
    filter.into()
}

fn install(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).without_time())
        .init();
}

/// Initialize logging with the specified level
///
/// `RUST_LOG` directives, when present, are layered on top of `level`.
///
/// # Thread Safety
///
/// Installs a global subscriber; only the first call in a process takes effect.
///
/// # Example
///
/// ```rust,no_run
/// use fob_stats::logging::init_logging;
/// use fob_stats::LogLevel;
///
/// init_logging(LogLevel::Info);
/// ```
pub fn init_logging(level: LogLevel) {
    INIT.call_once(|| {
        install(
            EnvFilter::builder()
                .with_default_directive(directive(level))
                .from_env_lossy(),
        );
    });
}

/// Initialize logging from `RUST_LOG`, falling back to info.
pub fn init_logging_from_env() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(directive(LogLevel::Info))
                .from_env_lossy()
        });
        install(filter);
    });
}

/// Initialize logging at the level named in the configuration.
pub fn init_logging_from_config(config: &StatsConfig) {
    init_logging(config.log_level().unwrap_or_default());
}
