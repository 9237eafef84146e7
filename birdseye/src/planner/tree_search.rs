//! Depth-limited Monte Carlo tree search over the discrete action space.
//!
//! The reward of a simulated pose is the spread of predicted RSSI across a
//! downsampled particle cloud per target: poses where the hypotheses
//! disagree most are the most informative to measure from.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ActionSpace, Planner, PlannerMethod, PlannerSettings};
use crate::estimator::{Environment, Particle, SensorPose};
use crate::track::Action;

struct Node {
    visits: u32,
    total: f64,
    children: Vec<Option<usize>>,
}

impl Node {
    fn new(branching: usize) -> Self {
        Self {
            visits: 0,
            total: 0.0,
            children: vec![None; branching],
        }
    }

    fn mean(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total / self.visits as f64
        }
    }
}

pub struct TreeSearchPlanner {
    actions: ActionSpace,
    horizon: usize,
    depth: usize,
    c: f64,
    simulations: usize,
    n_downsample: usize,
    rng: StdRng,
}

impl TreeSearchPlanner {
    pub fn new(settings: &PlannerSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        Self {
            actions: ActionSpace::baseline(settings.sensor_speed),
            horizon: settings.horizon,
            depth: settings.mcts_depth.max(settings.horizon),
            c: settings.mcts_c,
            simulations: settings.mcts_simulations.max(1),
            n_downsample: settings.mcts_n_downsample,
            rng,
        }
    }

    fn reward(env: &dyn Environment, clouds: &[Vec<Particle>], pose: &SensorPose) -> f64 {
        clouds
            .iter()
            .enumerate()
            .filter(|(_, cloud)| !cloud.is_empty())
            .map(|(t, cloud)| {
                let predicted: Vec<f64> = cloud
                    .iter()
                    .map(|p| env.expected_rssi(t, pose, (p[0], p[1])))
                    .collect();
                let n = predicted.len() as f64;
                let mean = predicted.iter().sum::<f64>() / n;
                (predicted.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt()
            })
            .sum()
    }

    fn apply(&self, pose: &SensorPose, index: usize) -> SensorPose {
        let action = self.actions.actions()[index];
        pose.advanced(action.heading_delta, action.distance)
    }

    fn greedy(&self, env: &dyn Environment, clouds: &[Vec<Particle>], pose: &SensorPose) -> usize {
        (0..self.actions.len())
            .map(|a| (a, Self::reward(env, clouds, &self.apply(pose, a))))
            .max_by(|x, y| x.1.total_cmp(&y.1))
            .map(|(a, _)| a)
            .unwrap_or(0)
    }

    fn select_child(&self, nodes: &[Node], node: usize) -> (usize, usize) {
        let parent_visits = nodes[node].visits.max(1) as f64;
        let mut best = (0, 0, f64::NEG_INFINITY);
        for (a, child) in nodes[node].children.iter().enumerate() {
            let Some(child) = *child else { continue };
            let child_node = &nodes[child];
            let score = child_node.mean()
                + self.c * (parent_visits.ln() / child_node.visits.max(1) as f64).sqrt();
            if score > best.2 {
                best = (a, child, score);
            }
        }
        (best.0, best.1)
    }
}

impl Planner for TreeSearchPlanner {
    fn get_action(&mut self, env: &dyn Environment) -> Vec<Action> {
        let branching = self.actions.len();
        if branching == 0 {
            return vec![Action::HOLD; self.horizon];
        }
        let clouds: Vec<Vec<Particle>> = (0..env.n_targets())
            .map(|t| env.particles(t).downsample(self.n_downsample))
            .collect();
        let root_pose = env.sensor_pose();
        let mut nodes = vec![Node::new(branching)];

        for _ in 0..self.simulations {
            let mut path = vec![0usize];
            let mut node = 0;
            let mut pose = root_pose;
            let mut reward = 0.0;
            let mut level = 0;

            // Selection, then expansion of one unvisited child
            while level < self.depth {
                let unvisited = nodes[node].children.iter().position(|c| c.is_none());
                level += 1;
                match unvisited {
                    Some(a) => {
                        nodes.push(Node::new(branching));
                        let child = nodes.len() - 1;
                        nodes[node].children[a] = Some(child);
                        pose = self.apply(&pose, a);
                        reward += Self::reward(env, &clouds, &pose);
                        path.push(child);
                        break;
                    }
                    None => {
                        let (a, child) = self.select_child(&nodes, node);
                        pose = self.apply(&pose, a);
                        reward += Self::reward(env, &clouds, &pose);
                        path.push(child);
                        node = child;
                    }
                }
            }

            // Random rollout to full depth
            while level < self.depth {
                let a = self.rng.gen_range(0..branching);
                pose = self.apply(&pose, a);
                reward += Self::reward(env, &clouds, &pose);
                level += 1;
            }

            for &i in &path {
                nodes[i].visits += 1;
                nodes[i].total += reward;
            }
        }

        // Follow the most visited path, greedy once the tree runs out
        let mut plan = Vec::with_capacity(self.horizon);
        let mut node = Some(0);
        let mut pose = root_pose;
        while plan.len() < self.horizon {
            let visited = node.and_then(|n| {
                nodes[n]
                    .children
                    .iter()
                    .enumerate()
                    .filter_map(|(a, c)| c.map(|c| (a, c)))
                    .max_by_key(|&(_, c)| nodes[c].visits)
            });
            let a = match visited {
                Some((a, child)) => {
                    node = Some(child);
                    a
                }
                None => {
                    node = None;
                    self.greedy(env, &clouds, &pose)
                }
            };
            pose = self.apply(&pose, a);
            plan.push(self.actions.actions()[a]);
        }
        plan
    }

    fn method(&self) -> PlannerMethod {
        PlannerMethod::Mcts
    }
}
