//! Logging infrastructure for the tracker.
//!
//! Provides structured logging with file output and console output:
//! - Writes to `{log_dir}/{log_file}` (cleared on session start)
//! - Also prints to stdout for field monitoring
//! - Level from the `--log` flag unless RUST_LOG is set

use std::fs;
use std::io;
use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Rejected `--log` value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid log level '{0}' (expected trace, debug, info, warn or error)")]
pub struct InvalidLogLevel(pub String);

/// Parse a log level name, case-insensitively.
pub fn parse_log_level(value: &str) -> Result<Level, InvalidLogLevel> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(InvalidLogLevel(value.to_string())),
    }
}

/// Initialize logging system.
///
/// Creates the log directory if needed, clears the previous log file, and
/// sets up dual output to both file and stdout.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the log file
/// cannot be cleared.
pub fn init_logging(log_dir: &Path, log_file: &str, level: Level) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(log_file), "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// RUST_LOG wins; otherwise everything at `level`.
fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()))
}

/// Get default log directory path.
pub fn default_log_dir() -> &'static str {
    "logs"
}

/// Get default log file name.
pub fn default_log_file() -> &'static str {
    "geolocate.log"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert_eq!(default_log_dir(), "logs");
        assert_eq!(default_log_file(), "geolocate.log");
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("INFO").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level(" Warn ").unwrap(), Level::WARN);
        assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
        assert_eq!(parse_log_level("ERROR").unwrap(), Level::ERROR);
    }

    #[test]
    fn test_parse_log_level_rejects_unknown() {
        let err = parse_log_level("verbose").unwrap_err();
        assert_eq!(err, InvalidLogLevel("verbose".to_string()));
        assert!(err.to_string().contains("verbose"));
        assert!(parse_log_level("").is_err());
        assert!(parse_log_level("3").is_err());
    }
}
