//! Tracker session - wires the components for one run.
//!
//! A session turns a [`GeolocateConfig`] into a running
//! [`CadenceController`]:
//!
//! - telemetry from a replay file, or a UDP receiver fusing live records
//! - the particle-filter estimator
//! - a planner when `use_planner` is set
//! - a run recorder under `{data_dir}/{experiment}/`
//! - the HTTP live view when `use_live_view` is set
//! - a tracking animation in the run directory when `make_gif` is set
//!
//! Background tasks (receiver, live view) run on child tokens of the
//! session's shutdown token and are stopped when the controller returns.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GeolocateConfig;
use crate::controller::{CadenceController, ControllerError, RunSummary};
use crate::estimator::RfParticleEnvironment;
use crate::live_view::{
    AnimationError, GifAnimation, LiveView, LiveViewError, LiveViewServer, LiveViewSet,
    NoopLiveView,
};
use crate::persistence::{PersistenceError, RunRecorder};
use crate::planner::{build_planner, Planner};
use crate::telemetry::{
    LiveTelemetryReceiver, ReplayError, ReplaySource, TelemetryError, TelemetrySource,
};
use crate::time::unix_now;
use crate::track::SharedTrackState;

/// Experiment name used when the config path has no usable stem.
const DEFAULT_EXPERIMENT: &str = "geolocate";

/// Errors that can end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Replay failed: {0}")]
    Replay(#[from] ReplayError),

    #[error("Telemetry failed: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Run recording failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Live view failed: {0}")]
    LiveView(#[from] LiveViewError),

    #[error("Tracking animation failed: {0}")]
    Animation(#[from] AnimationError),

    #[error(transparent)]
    Controller(#[from] ControllerError),
}

/// One tracker run.
pub struct TrackerSession {
    config: GeolocateConfig,
    experiment: String,
}

impl TrackerSession {
    pub fn new(config: GeolocateConfig, experiment: impl Into<String>) -> Self {
        Self {
            config,
            experiment: experiment.into(),
        }
    }

    /// Experiment name for a config file: its stem, e.g. `field_a` for
    /// `configs/field_a.ini`.
    pub fn experiment_name(config_path: &Path) -> String {
        config_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or(DEFAULT_EXPERIMENT)
            .to_string()
    }

    pub fn config(&self) -> &GeolocateConfig {
        &self.config
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Build every component and run the controller to termination.
    pub async fn run(self, shutdown: CancellationToken) -> Result<RunSummary, SessionError> {
        let config = &self.config;
        let run_start = unix_now();

        let recorder = RunRecorder::create(&config.data_dir, &self.experiment, run_start)?;
        recorder.write_header(config)?;

        let fusion = SharedTrackState::new(config.static_overrides());
        let background = shutdown.child_token();

        let source: Box<dyn TelemetrySource> = match &config.replay_file {
            Some(path) => {
                let replay = ReplaySource::load(path)?;
                info!(
                    file = %path.display(),
                    records = replay.len(),
                    "Replaying recorded telemetry"
                );
                Box::new(replay)
            }
            None => {
                let receiver = LiveTelemetryReceiver::bind(
                    &config.telemetry_host,
                    config.telemetry_port,
                    fusion.clone(),
                    background.clone(),
                )
                .await?;
                Box::new(receiver.start())
            }
        };

        let mut views: Vec<Arc<dyn LiveView>> = Vec::new();
        if config.use_live_view {
            let server = LiveViewServer::start(
                &config.live_view_host,
                config.live_view_port,
                background.clone(),
            )
            .await?;
            views.push(Arc::new(server));
        }
        let animation = if config.make_gif {
            let animation = Arc::new(GifAnimation::create(recorder.run_dir())?);
            views.push(animation.clone());
            Some(animation)
        } else {
            None
        };
        let live_view: Arc<dyn LiveView> = match views.len() {
            0 => Arc::new(NoopLiveView),
            1 => views.remove(0),
            _ => Arc::new(LiveViewSet::new(views)),
        };

        let env = RfParticleEnvironment::new(config.environment_settings(), config.sensor());
        let planner: Option<Box<dyn Planner>> = config
            .use_planner
            .then(|| build_planner(&config.planner_settings()));

        info!(
            experiment = %self.experiment,
            mode = ?source.mode(),
            targets = config.n_targets,
            antenna = %config.antenna_type,
            planner = ?planner.as_ref().map(|p| p.method()),
            horizon = config.horizon,
            step_duration_s = config.step_duration,
            "Starting tracker"
        );

        let controller = CadenceController::new(
            config.controller_config(),
            fusion,
            source,
            Box::new(env),
            planner,
            Box::new(recorder),
            live_view,
            shutdown,
        );
        let result = controller.run().await;

        // The animation is written even when the run failed
        if let Some(animation) = animation {
            match animation.finish().await {
                Ok(frames) => info!(
                    path = %animation.path().display(),
                    frames,
                    "Saved tracking animation"
                ),
                Err(e) => warn!(error = %e, "Failed to save tracking animation"),
            }
        }

        background.cancel();
        Ok(result?)
    }
}
