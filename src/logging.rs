//! Log pipeline
//!
//! Console output plus a rolling file under `log_dir`, JSON or plain per
//! config. `RUST_LOG` overrides the configured level filter.

use crate::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. The returned guard flushes the file
/// writer on drop; hold it for the lifetime of the process.
pub fn init_logging(cfg: &LogConfig) -> WorkerGuard {
    let roller = match cfg.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&cfg.log_dir, &cfg.log_file),
        "daily" => tracing_appender::rolling::daily(&cfg.log_dir, &cfg.log_file),
        _ => tracing_appender::rolling::never(&cfg.log_dir, &cfg.log_file),
    };
    let (file_writer, guard) = tracing_appender::non_blocking(roller);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.as_str()));
    let console = fmt::layer().with_target(false);
    let registry = tracing_subscriber::registry().with(filter).with(console);

    if cfg.use_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    // Targets stay in JSON for structured queries.
                    .with_target(true)
                    .with_writer(file_writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(file_writer)
                    .with_ansi(false),
            )
            .init();
    }

    guard
}
