//! Settings struct for the `[geolocate]` section.
//!
//! Pure data plus the conversions into the component settings each part of
//! the tracker is built from. Parsing lives in [`super::parser`].

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::defaults::MAX_PERIOD_SECS;

use crate::controller::ControllerConfig;
use crate::estimator::{AntennaKind, EnvironmentSettings, RssiSensor, TransmitterParams};
use crate::geo::LatLon;
use crate::planner::{PlannerMethod, PlannerSettings};
use crate::track::StaticOverrides;

/// Complete tracker configuration loaded from an INI file.
///
/// Serialized as-is into the run directory's `config.json` header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeolocateConfig {
    /// Number of transmitters to localise.
    pub n_targets: usize,
    /// Receive antenna on the sensor platform.
    pub antenna_type: AntennaKind,
    /// Planner used when `use_planner` is set.
    pub planner_method: PlannerMethod,
    pub use_planner: bool,
    /// Maximum target speed, m/s.
    pub target_speed: f64,
    /// Sensor platform speed, m/s.
    pub sensor_speed: f64,

    /// Transmit power per target, dBm.
    pub power_tx: Vec<f64>,
    /// Transmit antenna gain per target, linear.
    pub directivity_tx: Vec<f64>,
    /// Carrier frequency per target, Hz.
    pub freq: Vec<f64>,
    /// Log-normal fading standard deviation, dB.
    pub fading_sigma: f64,
    /// Detection threshold, dBm.
    pub threshold: f64,

    pub mcts_depth: usize,
    pub mcts_c: f64,
    pub mcts_simulations: usize,
    pub mcts_n_downsample: usize,

    /// Fixed sensor position overriding telemetry.
    pub static_position: Option<LatLon>,
    /// Fixed sensor yaw overriding telemetry, degrees from north.
    pub static_heading: Option<f64>,

    /// Recorded session to replay instead of listening for live telemetry.
    pub replay_file: Option<PathBuf>,
    pub telemetry_host: String,
    pub telemetry_port: u16,

    pub use_live_view: bool,
    pub live_view_host: String,
    pub live_view_port: u16,
    /// Record every tick into `tracking.gif` in the run directory.
    pub make_gif: bool,

    /// Ticks between planner invocations.
    pub horizon: usize,
    /// Minimum seconds between estimator steps.
    pub step_duration: f64,
    /// Localisation precision, metres.
    pub min_std_dev: f64,
    /// Standoff radius for the heuristic planners, metres.
    pub r_min: f64,
    /// Confidence bound for the heuristic planners.
    pub min_bound: f64,
    pub num_particles: usize,
    /// Initial belief radius and live view half-extent, metres.
    pub particle_distance: f64,

    /// Root directory for run output.
    pub data_dir: PathBuf,
    /// Estimator and planner RNG seed.
    pub seed: Option<u64>,
    /// Poll period while waiting for a position fix, seconds.
    pub fix_poll_interval: f64,
}

impl GeolocateConfig {
    /// Transmitter parameters, one entry per target.
    pub fn transmitters(&self) -> Vec<TransmitterParams> {
        (0..self.n_targets)
            .map(|t| TransmitterParams {
                power_tx: pick(&self.power_tx, t),
                directivity_tx: pick(&self.directivity_tx, t),
                freq: pick(&self.freq, t),
            })
            .collect()
    }

    pub fn sensor(&self) -> RssiSensor {
        RssiSensor::new(
            self.antenna_type,
            self.transmitters(),
            self.fading_sigma,
            self.threshold,
        )
    }

    pub fn environment_settings(&self) -> EnvironmentSettings {
        EnvironmentSettings {
            n_targets: self.n_targets,
            num_particles: self.num_particles,
            target_speed: self.target_speed,
            particle_distance: self.particle_distance,
            step_duration: self.step_duration,
            seed: self.seed,
        }
    }

    pub fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            method: self.planner_method,
            horizon: self.horizon,
            sensor_speed: self.sensor_speed,
            min_std_dev: self.min_std_dev,
            r_min: self.r_min,
            min_bound: self.min_bound,
            mcts_depth: self.mcts_depth,
            mcts_c: self.mcts_c,
            mcts_simulations: self.mcts_simulations,
            mcts_n_downsample: self.mcts_n_downsample,
            seed: self.seed,
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            step_duration: seconds(self.step_duration),
            horizon: self.horizon,
            min_std_dev: self.min_std_dev,
            fix_poll_interval: seconds(self.fix_poll_interval),
            map_extent: self.particle_distance,
        }
    }

    pub fn static_overrides(&self) -> StaticOverrides {
        StaticOverrides {
            position: self.static_position,
            heading: self.static_heading,
        }
    }
}

// Parsed periods are already in range; clamp values set in code.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.clamp(0.0, MAX_PERIOD_SECS)).unwrap_or_default()
}

// Lists are broadcast at parse time; fall back to the last entry anyway.
fn pick(values: &[f64], index: usize) -> f64 {
    values
        .get(index)
        .or_else(|| values.last())
        .copied()
        .unwrap_or_default()
}
