//! Greedy approach planner.
//!
//! Each step moves toward the mean of the least-certain target while keeping
//! at least `min_bound` of its particles beyond the `r_min` standoff. Ties
//! are broken in favour of facing the target.

use super::{
    clearance_probability, least_certain_target, ActionSpace, Planner, PlannerMethod,
    PlannerSettings, HEURISTIC_SAMPLE,
};
use crate::estimator::{Environment, SensorPose};
use crate::geo::wrap_delta;
use crate::track::Action;

pub struct ReppPlanner {
    actions: ActionSpace,
    horizon: usize,
    min_std_dev: f64,
    r_min: f64,
    min_bound: f64,
}

impl ReppPlanner {
    pub fn new(settings: &PlannerSettings) -> Self {
        Self {
            actions: ActionSpace::baseline(settings.sensor_speed),
            horizon: settings.horizon,
            min_std_dev: settings.min_std_dev,
            r_min: settings.r_min,
            min_bound: settings.min_bound,
        }
    }

    fn cost(&self, pose: &SensorPose, target: (f64, f64)) -> f64 {
        let range = pose.range_to(target);
        let misalignment = wrap_delta(pose.azimuth_to(target) - pose.heading).abs() / 180.0;
        (range - self.r_min).abs() + misalignment
    }
}

impl Planner for ReppPlanner {
    fn get_action(&mut self, env: &dyn Environment) -> Vec<Action> {
        let Some(target) = least_certain_target(env, self.min_std_dev) else {
            return vec![Action::HOLD; self.horizon];
        };
        let particles = env.particles(target).downsample(HEURISTIC_SAMPLE);
        let goal = env.particles(target).mean();

        let mut pose = env.sensor_pose();
        let mut plan = Vec::with_capacity(self.horizon);
        for _ in 0..self.horizon {
            let best = self
                .actions
                .actions()
                .iter()
                .map(|&action| {
                    let next = pose.advanced(action.heading_delta, action.distance);
                    (action, next)
                })
                .filter(|(_, next)| {
                    clearance_probability(next, &particles, self.r_min) >= self.min_bound
                })
                .min_by(|a, b| self.cost(&a.1, goal).total_cmp(&self.cost(&b.1, goal)));

            let (action, next) = best.unwrap_or((Action::HOLD, pose));
            plan.push(action);
            pose = next;
        }
        plan
    }

    fn method(&self) -> PlannerMethod {
        PlannerMethod::Repp
    }
}
