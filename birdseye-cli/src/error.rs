//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use birdseye::config::ConfigFileError;
use birdseye::logging::InvalidLogLevel;
use birdseye::session::SessionError;

/// Exit code for bad command-line input.
const EXIT_USAGE: i32 = 2;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// `--log` is not a known level
    LogLevel(InvalidLogLevel),
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be loaded
    Config(ConfigFileError),
    /// Failed to build the async runtime
    Runtime(std::io::Error),
    /// The tracker run failed
    Session(SessionError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::LogLevel(_) => EXIT_USAGE,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::ReadError(_)) => {
                eprintln!();
                eprintln!("Pass the path of an INI file with a [geolocate] section, e.g.:");
                eprintln!("  geolocate configs/field.ini");
            }
            CliError::Session(SessionError::Telemetry(_)) => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Another process is bound to telemetry_port");
                eprintln!("  2. telemetry_host is not an address of this machine");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LogLevel(e) => write!(f, "{}", e),
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Session(e) => write!(f, "Tracker failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LogLevel(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::LoggingInit(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}
