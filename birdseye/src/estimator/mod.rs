//! Target estimator.
//!
//! The cadence controller drives the estimator only through the
//! [`Environment`] trait: it resets it once, steps it with every fused
//! [`TrackState`], and reads particle sets back for persistence and planning.
//! [`RfParticleEnvironment`] is the bundled implementation, one particle
//! filter per target driven by RSSI observations.

mod particle;
mod sensor;

pub use particle::{EnvironmentSettings, RfParticleEnvironment};
pub use sensor::{AntennaKind, RssiSensor, TransmitterParams, UnknownAntennaType};

use serde::Serialize;

use crate::geo::LocalFrame;
use crate::track::TrackState;

/// Dimensions of one particle: east (m), north (m), course (deg), speed (m/s).
pub const STATE_DIM: usize = 4;

/// One hypothesis of a target's state.
pub type Particle = [f64; STATE_DIM];

/// Weighted particle cloud for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSet {
    particles: Vec<Particle>,
    weights: Vec<f64>,
}

impl ParticleSet {
    /// Create a set with uniform weights.
    pub fn new(particles: Vec<Particle>) -> Self {
        let n = particles.len().max(1);
        let weights = vec![1.0 / n as f64; particles.len()];
        Self { particles, weights }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<Particle>, &mut Vec<f64>) {
        (&mut self.particles, &mut self.weights)
    }

    /// Weighted mean position `(east, north)`.
    pub fn mean(&self) -> (f64, f64) {
        self.particles
            .iter()
            .zip(&self.weights)
            .fold((0.0, 0.0), |(e, n), (p, w)| (e + p[0] * w, n + p[1] * w))
    }

    /// Weighted standard deviation of position `(east, north)`.
    pub fn std_dev(&self) -> (f64, f64) {
        let (me, mn) = self.mean();
        let (ve, vn) = self
            .particles
            .iter()
            .zip(&self.weights)
            .fold((0.0, 0.0), |(ve, vn), (p, w)| {
                (ve + w * (p[0] - me).powi(2), vn + w * (p[1] - mn).powi(2))
            });
        (ve.sqrt(), vn.sqrt())
    }

    /// Larger of the two positional standard deviations.
    pub fn max_std_dev(&self) -> f64 {
        let (se, sn) = self.std_dev();
        se.max(sn)
    }

    /// Effective sample size.
    pub fn neff(&self) -> f64 {
        let sum_sq: f64 = self.weights.iter().map(|w| w * w).sum();
        if sum_sq > 0.0 {
            1.0 / sum_sq
        } else {
            0.0
        }
    }

    /// Evenly strided subset of at most `n` particles.
    pub fn downsample(&self, n: usize) -> Vec<Particle> {
        if n == 0 || self.particles.is_empty() {
            return Vec::new();
        }
        let stride = (self.particles.len() / n).max(1);
        self.particles.iter().step_by(stride).take(n).copied().collect()
    }

    /// Summary of this cloud.
    pub fn estimate(&self) -> TargetEstimate {
        TargetEstimate {
            mean: self.mean(),
            std_dev: self.std_dev(),
        }
    }
}

/// Position estimate for one target in the local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetEstimate {
    pub mean: (f64, f64),
    pub std_dev: (f64, f64),
}

/// Summary of the estimator's belief over all targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Belief {
    pub targets: Vec<TargetEstimate>,
}

/// Result of one estimator step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    /// RSSI used for the update, `None` if the state carried none.
    pub rssi: Option<f64>,
    /// True when the RSSI was above the detection threshold.
    pub detected: bool,
}

/// Sensor pose in the local frame. `heading` uses the sensor azimuth
/// convention (0 = east, counter-clockwise).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SensorPose {
    pub east: f64,
    pub north: f64,
    pub heading: f64,
}

impl SensorPose {
    /// Pose after turning by `heading_delta` then moving `distance` metres.
    pub fn advanced(&self, heading_delta: f64, distance: f64) -> Self {
        let heading = crate::geo::normalize_degrees(self.heading + heading_delta);
        let rad = heading.to_radians();
        Self {
            east: self.east + distance * rad.cos(),
            north: self.north + distance * rad.sin(),
            heading,
        }
    }

    /// Planar distance to a point in the local frame.
    pub fn range_to(&self, at: (f64, f64)) -> f64 {
        (at.0 - self.east).hypot(at.1 - self.north)
    }

    /// Azimuth from this pose to a point in the local frame.
    pub fn azimuth_to(&self, at: (f64, f64)) -> f64 {
        crate::geo::normalize_degrees((at.1 - self.north).atan2(at.0 - self.east).to_degrees())
    }
}

/// The estimator as seen by the control loop and planners.
pub trait Environment: Send {
    /// Reinitialise every target's belief.
    fn reset(&mut self) -> Belief;

    /// Advance the estimator with one fused state.
    fn step(&mut self, state: &TrackState) -> Observation;

    fn n_targets(&self) -> usize;

    /// Particle cloud for `target`.
    fn particles(&self, target: usize) -> &ParticleSet;

    fn sensor_pose(&self) -> SensorPose;

    /// Local frame anchor, once the first position has been seen.
    fn frame(&self) -> Option<LocalFrame>;

    /// Expected RSSI in dBm from `target` located at `at`, seen from `pose`.
    fn expected_rssi(&self, target: usize, pose: &SensorPose, at: (f64, f64)) -> f64;

    /// Current belief summary.
    fn belief(&self) -> Belief {
        Belief {
            targets: (0..self.n_targets())
                .map(|t| self.particles(t).estimate())
                .collect(),
        }
    }
}

/// True when every target's cloud is within `min_std_dev` metres on both axes.
pub fn targets_found(env: &dyn Environment, min_std_dev: f64) -> bool {
    (0..env.n_targets()).all(|t| env.particles(t).max_std_dev() <= min_std_dev)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(points: &[(f64, f64)]) -> ParticleSet {
        ParticleSet::new(points.iter().map(|&(e, n)| [e, n, 0.0, 0.0]).collect())
    }

    #[test]
    fn test_mean_and_std_dev() {
        let set = cloud(&[(-1.0, 0.0), (1.0, 0.0), (-1.0, 4.0), (1.0, 4.0)]);
        assert_eq!(set.mean(), (0.0, 2.0));
        let (se, sn) = set.std_dev();
        assert!((se - 1.0).abs() < 1e-12);
        assert!((sn - 2.0).abs() < 1e-12);
        assert!((set.max_std_dev() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_neff_equals_len() {
        let set = cloud(&[(0.0, 0.0); 10]);
        assert!((set.neff() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_downsample_stride() {
        let points: Vec<(f64, f64)> = (0..100).map(|i| (i as f64, 0.0)).collect();
        let set = cloud(&points);
        let sample = set.downsample(10);
        assert_eq!(sample.len(), 10);
        assert_eq!(sample[1][0], 10.0);
        assert_eq!(set.downsample(1000).len(), 100);
        assert!(set.downsample(0).is_empty());
    }

    #[test]
    fn test_pose_advance_and_azimuth() {
        let pose = SensorPose {
            east: 0.0,
            north: 0.0,
            heading: 0.0,
        };
        let moved = pose.advanced(90.0, 10.0);
        assert!((moved.heading - 90.0).abs() < 1e-12);
        assert!(moved.east.abs() < 1e-9);
        assert!((moved.north - 10.0).abs() < 1e-9);

        assert!((pose.azimuth_to((0.0, 5.0)) - 90.0).abs() < 1e-9);
        assert!((pose.azimuth_to((-5.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((pose.range_to((3.0, 4.0)) - 5.0).abs() < 1e-12);
    }
}
