use std::error::Error;
use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogSettings;

/// Install the global subscriber writing to a daily rolling file.
///
/// The terminal belongs to the TUI, so nothing is logged to stderr. Returns
/// `None` when file logging is disabled. The guard must outlive the app or
/// buffered lines are lost.
pub fn init_logging(log: &LogSettings) -> Result<Option<WorkerGuard>, Box<dyn Error>> {
    let Some(dir) = &log.directory else {
        return Ok(None);
    };
    fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::daily(dir, "quaver.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(Some(guard))
}
