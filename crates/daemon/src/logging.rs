//! Rotating per-day log file setup (§6: "rotating per-day log file,
//! level ∈ {debug, info, error}"), built on `tracing-subscriber` and
//! `tracing-appender` exactly as the workspace's other ambient stack
//! pieces reuse the teacher's logging crates.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use config::LogLevel;

fn filter_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Error => "error",
    }
}

/// Installs a global `tracing` subscriber that writes to a daily
/// rolling file under `directory`, filtered at `level`.
///
/// The returned [`WorkerGuard`] must be kept alive for the process's
/// whole lifetime — dropping it stops the background flush thread and
/// silently discards buffered log lines.
///
/// # Errors
///
/// Returns an [`std::io::Error`] if `directory` cannot be created.
pub fn init(directory: &str, level: LogLevel) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(directory)?;
    let file_appender = tracing_appender::rolling::daily(directory, "shard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(filter_directive(level)).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_directive_matches_each_level() {
        assert_eq!(filter_directive(LogLevel::Debug), "debug");
        assert_eq!(filter_directive(LogLevel::Info), "info");
        assert_eq!(filter_directive(LogLevel::Error), "error");
    }
}
