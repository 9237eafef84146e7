//! BirdsEye CLI - Command-line interface
//!
//! Runs the geolocation tracker described by an INI config file.

mod error;
mod runner;

use std::path::PathBuf;

use birdseye::logging::parse_log_level;
use clap::Parser;

use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "geolocate")]
#[command(version = birdseye::VERSION)]
#[command(about = "Localise RF transmitters from a mobile sensor platform", long_about = None)]
struct Args {
    /// Path to the INI configuration file
    config_path: PathBuf,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, default_value = "INFO")]
    log: String,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        e.exit();
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let level = parse_log_level(&args.log).map_err(CliError::LogLevel)?;
    CliRunner::new(&args.config_path, level)?.run()?;
    Ok(())
}
