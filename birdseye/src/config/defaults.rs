//! Default values for every configuration key.

use std::path::PathBuf;

use super::settings::GeolocateConfig;
use crate::estimator::AntennaKind;
use crate::planner::PlannerMethod;

/// INI section holding the tracker settings.
pub const SECTION: &str = "geolocate";

pub const DEFAULT_N_TARGETS: usize = 2;
pub const DEFAULT_TARGET_SPEED: f64 = 0.5;
pub const DEFAULT_SENSOR_SPEED: f64 = 1.0;

pub const DEFAULT_POWER_TX: f64 = 26.0;
pub const DEFAULT_DIRECTIVITY_TX: f64 = 1.0;
pub const DEFAULT_FREQ: f64 = 5.7e9;
pub const DEFAULT_FADING_SIGMA: f64 = 8.0;
pub const DEFAULT_THRESHOLD: f64 = -120.0;

pub const DEFAULT_MCTS_DEPTH: usize = 3;
pub const DEFAULT_MCTS_C: f64 = 20.0;
pub const DEFAULT_MCTS_SIMULATIONS: usize = 100;
pub const DEFAULT_MCTS_N_DOWNSAMPLE: usize = 400;

pub const DEFAULT_TELEMETRY_HOST: &str = "0.0.0.0";
pub const DEFAULT_TELEMETRY_PORT: u16 = 1883;
pub const DEFAULT_LIVE_VIEW_HOST: &str = "0.0.0.0";
pub const DEFAULT_LIVE_VIEW_PORT: u16 = 4999;

pub const DEFAULT_HORIZON: usize = 1;
pub const DEFAULT_STEP_DURATION_SECS: f64 = 1.0;
pub const DEFAULT_MIN_STD_DEV: f64 = 35.0;
pub const DEFAULT_R_MIN: f64 = 10.0;
pub const DEFAULT_MIN_BOUND: f64 = 0.82;
pub const DEFAULT_NUM_PARTICLES: usize = 3000;
pub const DEFAULT_PARTICLE_DISTANCE: f64 = 200.0;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_FIX_POLL_INTERVAL_SECS: f64 = 1.0;

/// Upper bound for `step_duration` and `fix_poll_interval`.
pub const MAX_PERIOD_SECS: f64 = 86_400.0;

impl Default for GeolocateConfig {
    fn default() -> Self {
        Self {
            n_targets: DEFAULT_N_TARGETS,
            antenna_type: AntennaKind::Directional,
            planner_method: PlannerMethod::Repp,
            use_planner: false,
            target_speed: DEFAULT_TARGET_SPEED,
            sensor_speed: DEFAULT_SENSOR_SPEED,
            power_tx: vec![DEFAULT_POWER_TX; DEFAULT_N_TARGETS],
            directivity_tx: vec![DEFAULT_DIRECTIVITY_TX; DEFAULT_N_TARGETS],
            freq: vec![DEFAULT_FREQ; DEFAULT_N_TARGETS],
            fading_sigma: DEFAULT_FADING_SIGMA,
            threshold: DEFAULT_THRESHOLD,
            mcts_depth: DEFAULT_MCTS_DEPTH,
            mcts_c: DEFAULT_MCTS_C,
            mcts_simulations: DEFAULT_MCTS_SIMULATIONS,
            mcts_n_downsample: DEFAULT_MCTS_N_DOWNSAMPLE,
            static_position: None,
            static_heading: None,
            replay_file: None,
            telemetry_host: DEFAULT_TELEMETRY_HOST.to_string(),
            telemetry_port: DEFAULT_TELEMETRY_PORT,
            use_live_view: false,
            live_view_host: DEFAULT_LIVE_VIEW_HOST.to_string(),
            live_view_port: DEFAULT_LIVE_VIEW_PORT,
            make_gif: false,
            horizon: DEFAULT_HORIZON,
            step_duration: DEFAULT_STEP_DURATION_SECS,
            min_std_dev: DEFAULT_MIN_STD_DEV,
            r_min: DEFAULT_R_MIN,
            min_bound: DEFAULT_MIN_BOUND,
            num_particles: DEFAULT_NUM_PARTICLES,
            particle_distance: DEFAULT_PARTICLE_DISTANCE,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            seed: None,
            fix_poll_interval: DEFAULT_FIX_POLL_INTERVAL_SECS,
        }
    }
}
