//! Sensor path planners.
//!
//! A [`Planner`] looks at the estimator through [`Environment`] and proposes
//! the next `horizon` control inputs. The implementation is chosen once at
//! startup from [`PlannerMethod`]:
//!
//! | method      | planner              | strategy                                  |
//! |-------------|----------------------|-------------------------------------------|
//! | `repp`      | [`ReppPlanner`]      | approach least-certain target, standoff   |
//! | `lavapilot` | [`LavaPilotPlanner`] | face least-certain target, advance safely |
//! | `mcts`      | [`TreeSearchPlanner`]| depth-limited tree search with UCB        |

mod lavapilot;
mod repp;
mod tree_search;

pub use lavapilot::LavaPilotPlanner;
pub use repp::ReppPlanner;
pub use tree_search::TreeSearchPlanner;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::estimator::{Environment, Particle, SensorPose};
use crate::track::Action;

/// Heading changes available to the planners, degrees.
pub const HEADING_DELTAS: [f64; 3] = [-30.0, 0.0, 30.0];

/// Particles considered per target by the heuristic planners.
const HEURISTIC_SAMPLE: usize = 200;

/// Planner selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerMethod {
    Repp,
    LavaPilot,
    Mcts,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown planner method '{0}' (expected repp, lavapilot or mcts)")]
pub struct UnknownPlannerMethod(pub String);

impl FromStr for PlannerMethod {
    type Err = UnknownPlannerMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "repp" => Ok(Self::Repp),
            "lavapilot" => Ok(Self::LavaPilot),
            "mcts" => Ok(Self::Mcts),
            _ => Err(UnknownPlannerMethod(s.to_string())),
        }
    }
}

impl fmt::Display for PlannerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repp => write!(f, "repp"),
            Self::LavaPilot => write!(f, "lavapilot"),
            Self::Mcts => write!(f, "mcts"),
        }
    }
}

/// Discrete control inputs a planner chooses from.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpace {
    actions: Vec<Action>,
}

impl ActionSpace {
    /// Every heading delta in [`HEADING_DELTAS`], either holding or moving
    /// `sensor_speed` metres.
    pub fn baseline(sensor_speed: f64) -> Self {
        let actions = HEADING_DELTAS
            .iter()
            .flat_map(|&delta| [Action::new(delta, 0.0), Action::new(delta, sensor_speed)])
            .collect();
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Tuning shared by all planners.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    pub method: PlannerMethod,
    pub horizon: usize,
    pub sensor_speed: f64,
    pub min_std_dev: f64,
    pub r_min: f64,
    pub min_bound: f64,
    pub mcts_depth: usize,
    pub mcts_c: f64,
    pub mcts_simulations: usize,
    pub mcts_n_downsample: usize,
    pub seed: Option<u64>,
}

/// Proposes control inputs for the sensor platform.
pub trait Planner: Send {
    /// Next actions, ideally exactly `horizon` of them.
    fn get_action(&mut self, env: &dyn Environment) -> Vec<Action>;

    fn method(&self) -> PlannerMethod;
}

/// Construct the planner selected by `settings.method`.
pub fn build_planner(settings: &PlannerSettings) -> Box<dyn Planner> {
    match settings.method {
        PlannerMethod::Repp => Box::new(ReppPlanner::new(settings)),
        PlannerMethod::LavaPilot => Box::new(LavaPilotPlanner::new(settings)),
        PlannerMethod::Mcts => Box::new(TreeSearchPlanner::new(settings)),
    }
}

/// Target with the widest belief that is not yet localised.
pub(crate) fn least_certain_target(env: &dyn Environment, min_std_dev: f64) -> Option<usize> {
    (0..env.n_targets())
        .map(|t| (t, env.particles(t).max_std_dev()))
        .filter(|&(_, spread)| spread > min_std_dev)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}

/// Fraction of `particles` farther than `r_min` from `pose`.
pub(crate) fn clearance_probability(pose: &SensorPose, particles: &[Particle], r_min: f64) -> f64 {
    if particles.is_empty() {
        return 1.0;
    }
    let clear = particles
        .iter()
        .filter(|p| pose.range_to((p[0], p[1])) > r_min)
        .count();
    clear as f64 / particles.len() as f64
}
