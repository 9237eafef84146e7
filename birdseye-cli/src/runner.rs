//! CLI runner for tracker setup and execution.
//!
//! Encapsulates config loading, logging initialization, runtime creation and
//! Ctrl+C handling.

use std::path::{Path, PathBuf};

use birdseye::config::GeolocateConfig;
use birdseye::controller::RunSummary;
use birdseye::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};
use birdseye::session::TrackerSession;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

use crate::error::CliError;

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config_path: PathBuf,
    config: GeolocateConfig,
}

impl CliRunner {
    /// Load the configuration and initialize logging.
    ///
    /// The config is loaded first so a bad file is reported before any log
    /// file is touched.
    pub fn new(config_path: &Path, level: Level) -> Result<Self, CliError> {
        let config = GeolocateConfig::load_from(config_path)?;

        let logging_guard = init_logging(Path::new(default_log_dir()), default_log_file(), level)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config_path: config_path.to_path_buf(),
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &GeolocateConfig {
        &self.config
    }

    /// Run the tracker until it terminates or Ctrl+C is pressed.
    pub fn run(self) -> Result<RunSummary, CliError> {
        info!("BirdsEye v{}", birdseye::VERSION);
        info!(config = %self.config_path.display(), "Loaded configuration");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        let experiment = TrackerSession::experiment_name(&self.config_path);
        let session = TrackerSession::new(self.config, experiment);

        let summary = runtime.block_on(async move {
            let shutdown = CancellationToken::new();
            let ctrl_c_token = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Ctrl+C received, finishing current tick");
                        ctrl_c_token.cancel();
                    }
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
                }
            });

            session.run(shutdown).await
        })?;

        println!(
            "Run finished after {} ticks ({:?})",
            summary.ticks, summary.termination
        );
        Ok(summary)
    }
}
