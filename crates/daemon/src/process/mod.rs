pub mod utils;

use std::path::Path;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use tracing_appender::non_blocking::WorkerGuard;

pub const LOG_FILE_PREFIX: &str = "vault.log";

/// Initialize logging and the panic handler.
///
/// Console output goes to stderr so command output on stdout stays clean.
/// Returns guards that must be kept alive for the duration of the program;
/// dropping them flushes pending log lines.
pub fn init_logging(level: LevelFilter, log_dir: Option<&Path>) -> Vec<WorkerGuard> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let mut guards = Vec::new();

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stderr_writer)
        .with_filter(env_filter(level));

    match log_dir {
        Some(log_dir) => {
            if let Err(e) = std::fs::create_dir_all(log_dir) {
                eprintln!(
                    "Warning: Failed to create log directory {:?}: {}",
                    log_dir, e
                );
            }

            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            guards.push(file_guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter(level));

            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        None => tracing_subscriber::registry().with(stderr_layer).init(),
    }

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}
