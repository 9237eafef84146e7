//! Antenna-pointing planner.
//!
//! Turns the antenna toward the least-certain target in the largest
//! available increments, and only advances while the target mean is beyond
//! `r_min` and enough of its particles stay clear of the standoff.

use super::{
    clearance_probability, least_certain_target, Planner, PlannerMethod, PlannerSettings,
    HEADING_DELTAS, HEURISTIC_SAMPLE,
};
use crate::estimator::Environment;
use crate::geo::wrap_delta;
use crate::track::Action;

pub struct LavaPilotPlanner {
    horizon: usize,
    sensor_speed: f64,
    min_std_dev: f64,
    r_min: f64,
    min_bound: f64,
}

impl LavaPilotPlanner {
    pub fn new(settings: &PlannerSettings) -> Self {
        Self {
            horizon: settings.horizon,
            sensor_speed: settings.sensor_speed,
            min_std_dev: settings.min_std_dev,
            r_min: settings.r_min,
            min_bound: settings.min_bound,
        }
    }
}

impl Planner for LavaPilotPlanner {
    fn get_action(&mut self, env: &dyn Environment) -> Vec<Action> {
        let Some(target) = least_certain_target(env, self.min_std_dev) else {
            return vec![Action::HOLD; self.horizon];
        };
        let particles = env.particles(target).downsample(HEURISTIC_SAMPLE);
        let goal = env.particles(target).mean();

        let mut pose = env.sensor_pose();
        let mut plan = Vec::with_capacity(self.horizon);
        for _ in 0..self.horizon {
            let wanted = wrap_delta(pose.azimuth_to(goal) - pose.heading);
            let turn = HEADING_DELTAS
                .iter()
                .copied()
                .min_by(|a, b| (a - wanted).abs().total_cmp(&(b - wanted).abs()))
                .unwrap_or(0.0);

            let turned = pose.advanced(turn, 0.0);
            let moved = turned.advanced(0.0, self.sensor_speed);
            let advance = turned.range_to(goal) > self.r_min
                && clearance_probability(&moved, &particles, self.r_min) >= self.min_bound;

            let action = if advance {
                Action::new(turn, self.sensor_speed)
            } else {
                Action::new(turn, 0.0)
            };
            pose = if advance { moved } else { turned };
            plan.push(action);
        }
        plan
    }

    fn method(&self) -> PlannerMethod {
        PlannerMethod::LavaPilot
    }
}
