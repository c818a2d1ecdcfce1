//! Tracing setup: console output always, optional daily-rotated file output.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking writer alive for the process lifetime; dropping it
// would silently stop file output.
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialize the global subscriber. `RUST_LOG` overrides the configured
/// level. Call once at startup; a second call is an error from
/// `try_init` and is propagated.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log filter directive")?;

    let console_layer = fmt::layer().with_target(false);

    if config.file_output {
        let appender = tracing_appender::rolling::daily(&config.log_dir, "review-harvester.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);

        let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .context("failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .try_init()
            .context("failed to initialize logging")?;
    }

    Ok(())
}
