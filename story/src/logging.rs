//! Logging setup.

use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber.
///
/// Human-readable logs go to stderr, filtered by `RUST_LOG` or
/// `default_filter`. When `log_dir` can be created, JSON lines are also
/// written to a daily rolling file there.
///
/// The returned guard must be held until shutdown so buffered file logs are flushed.
pub fn init(log_dir: Option<&Path>, default_filter: &str) -> Option<WorkerGuard> {
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact()
        .with_target(false)
        .with_filter(filter());

    let (file_layer, guard) = match log_dir.filter(|dir| ensure_dir(dir)) {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "story.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .json()
                .with_target(true)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn ensure_dir(dir: &Path) -> bool {
    match std::fs::create_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Failed to create logs directory {}: {e}", dir.display());
            false
        }
    }
}
