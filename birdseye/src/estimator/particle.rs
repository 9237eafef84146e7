//! Bootstrap particle filter over RF targets.
//!
//! Each target gets an independent filter. The local east/north frame is
//! anchored at the first sensor position seen, so the initial clouds are
//! spread uniformly over a disk of `particle_distance` metres around the
//! sensor's starting point.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::{debug, info};

use super::sensor::RssiSensor;
use super::{Belief, Environment, Observation, Particle, ParticleSet, SensorPose};
use crate::geo::{normalize_degrees, LocalFrame};
use crate::track::TrackState;

/// Random walk on course per second, degrees.
const COURSE_NOISE_DEG: f64 = 15.0;
/// Positional jitter per step, metres.
const POSITION_NOISE_M: f64 = 1.0;
/// Roughening applied after resampling, metres.
const RESAMPLE_JITTER_M: f64 = 2.0;
/// Resample when the effective sample size drops below this fraction.
const RESAMPLE_FRACTION: f64 = 0.5;

/// Construction parameters for [`RfParticleEnvironment`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentSettings {
    pub n_targets: usize,
    pub num_particles: usize,
    /// Maximum target speed, m/s.
    pub target_speed: f64,
    /// Radius of the initial belief, metres.
    pub particle_distance: f64,
    /// Seconds of target motion predicted per step.
    pub step_duration: f64,
    /// Fixed RNG seed for repeatable runs.
    pub seed: Option<u64>,
}

/// Particle-filter estimator driven by RSSI.
pub struct RfParticleEnvironment {
    settings: EnvironmentSettings,
    sensor: RssiSensor,
    filters: Vec<ParticleSet>,
    frame: Option<LocalFrame>,
    pose: SensorPose,
    rng: StdRng,
}

impl RfParticleEnvironment {
    pub fn new(settings: EnvironmentSettings, sensor: RssiSensor) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            settings,
            sensor,
            filters: Vec::new(),
            frame: None,
            pose: SensorPose::default(),
            rng,
        }
    }

    pub fn sensor(&self) -> &RssiSensor {
        &self.sensor
    }

    fn normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    fn initial_cloud(&mut self) -> ParticleSet {
        let radius = self.settings.particle_distance;
        let max_speed = self.settings.target_speed;
        let (cx, cy) = (self.pose.east, self.pose.north);
        let particles = (0..self.settings.num_particles)
            .map(|_| {
                // sqrt for uniform density over the disk
                let r = radius * self.rng.gen::<f64>().sqrt();
                let theta = self.rng.gen::<f64>() * std::f64::consts::TAU;
                let course = self.rng.gen::<f64>() * 360.0;
                let speed = self.rng.gen::<f64>() * max_speed;
                [cx + r * theta.cos(), cy + r * theta.sin(), course, speed]
            })
            .collect();
        ParticleSet::new(particles)
    }

    /// Move every particle forward by `dt` seconds.
    fn predict(&mut self, target: usize, dt: f64) {
        let max_speed = self.settings.target_speed;
        let mut filter = std::mem::replace(&mut self.filters[target], ParticleSet::new(Vec::new()));
        {
            let (particles, _) = filter.parts_mut();
            for p in particles.iter_mut() {
                p[2] = normalize_degrees(p[2] + COURSE_NOISE_DEG * dt.sqrt() * self.normal());
                p[3] = (p[3] + 0.1 * max_speed * self.normal()).clamp(0.0, max_speed);
                let rad = p[2].to_radians();
                p[0] += p[3] * dt * rad.cos() + POSITION_NOISE_M * self.normal();
                p[1] += p[3] * dt * rad.sin() + POSITION_NOISE_M * self.normal();
            }
        }
        self.filters[target] = filter;
    }

    /// Reweight by the RSSI likelihood. Returns false if every weight vanished.
    fn update(&mut self, target: usize, rssi: f64) -> bool {
        let pose = self.pose;
        let sensor = &self.sensor;
        let (particles, weights) = self.filters[target].parts_mut();

        for (p, w) in particles.iter().zip(weights.iter_mut()) {
            let expected = sensor.expected_rssi(target, &pose, (p[0], p[1]));
            *w *= sensor.likelihood(rssi, expected);
        }

        let total: f64 = weights.iter().sum();
        if total.is_finite() && total > 0.0 {
            weights.iter_mut().for_each(|w| *w /= total);
            true
        } else {
            let uniform = 1.0 / weights.len().max(1) as f64;
            weights.iter_mut().for_each(|w| *w = uniform);
            false
        }
    }

    /// Systematic resampling followed by positional roughening.
    fn resample(&mut self, target: usize) {
        let n = self.filters[target].len();
        if n == 0 {
            return;
        }
        let step = 1.0 / n as f64;
        let mut u = self.rng.gen::<f64>() * step;

        let mut resampled: Vec<Particle> = Vec::with_capacity(n);
        {
            let filter = &self.filters[target];
            let (particles, weights) = (filter.particles(), filter.weights());
            let mut cumulative = weights[0];
            let mut i = 0;
            for _ in 0..n {
                while u > cumulative && i < n - 1 {
                    i += 1;
                    cumulative += weights[i];
                }
                resampled.push(particles[i]);
                u += step;
            }
        }

        for p in resampled.iter_mut() {
            p[0] += RESAMPLE_JITTER_M * self.normal();
            p[1] += RESAMPLE_JITTER_M * self.normal();
        }
        self.filters[target] = ParticleSet::new(resampled);
    }
}

impl Environment for RfParticleEnvironment {
    fn reset(&mut self) -> Belief {
        self.filters = (0..self.settings.n_targets)
            .map(|_| self.initial_cloud())
            .collect();
        info!(
            n_targets = self.settings.n_targets,
            num_particles = self.settings.num_particles,
            radius_m = self.settings.particle_distance,
            "Estimator reset"
        );
        self.belief()
    }

    fn step(&mut self, state: &TrackState) -> Observation {
        if let Some(position) = state.position {
            let frame = *self.frame.get_or_insert_with(|| LocalFrame::new(position));
            let (east, north) = frame.to_local(position);
            self.pose.east = east;
            self.pose.north = north;
        }
        if let Some(heading) = state.heading {
            self.pose.heading = heading;
        }

        let dt = self.settings.step_duration;
        for t in 0..self.filters.len() {
            self.predict(t, dt);
        }

        let rssi = state.signal_strength.filter(|r| r.is_finite());
        if let Some(rssi) = rssi {
            for t in 0..self.filters.len() {
                if !self.update(t, rssi) {
                    debug!(target_index = t, rssi, "All particle weights vanished, reset to uniform");
                }
                let threshold = RESAMPLE_FRACTION * self.filters[t].len() as f64;
                if self.filters[t].neff() < threshold {
                    self.resample(t);
                }
            }
        }

        Observation {
            rssi,
            detected: rssi.is_some_and(|r| self.sensor.detects(r)),
        }
    }

    fn n_targets(&self) -> usize {
        self.filters.len()
    }

    fn particles(&self, target: usize) -> &ParticleSet {
        &self.filters[target]
    }

    fn sensor_pose(&self) -> SensorPose {
        self.pose
    }

    fn frame(&self) -> Option<LocalFrame> {
        self.frame
    }

    fn expected_rssi(&self, target: usize, pose: &SensorPose, at: (f64, f64)) -> f64 {
        self.sensor.expected_rssi(target, pose, at)
    }
}
