use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("axnote/logs")
}

/// File-only logging; stdout belongs to the terminal UI.
pub fn init_tracing() -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,axnote_tui=debug,axnote_kernel=debug"));

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).expect("failed to create logs directory");
    let file_appender = tracing_appender::rolling::daily(&log_dir, "axnote.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(non_blocking_file);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init();

    guard
}

/// Stderr logging for tests, so failures print captured diagnostics without
/// manual file inspection. `try_init` keeps repeated calls across tests
/// harmless.
pub fn init_tracing_tests() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("axnote_tui=debug"));
    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .without_time()
        .with_writer(std::io::stderr);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}
