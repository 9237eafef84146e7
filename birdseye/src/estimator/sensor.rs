//! RSSI sensor model.
//!
//! Received power is the Friis free-space budget plus the receive antenna's
//! gain toward the target, with log-normal fading of `fading_sigma` dB.
//! Readings at or below `threshold` count as "no detection".

use std::f64::consts::{PI, SQRT_2};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::SensorPose;
use crate::geo::wrap_delta;

const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Ranges below this are clamped to keep the path loss finite.
const MIN_RANGE_M: f64 = 1.0;

const DIRECTIONAL_PEAK_GAIN_DBI: f64 = 7.0;
const DIRECTIONAL_FLOOR_DB: f64 = -25.0;
const OMNI_GAIN_DBI: f64 = 2.15;

/// Receive antenna class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AntennaKind {
    Directional,
    Omni,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown antenna type '{0}' (expected directional, yagi, logp, omni or omnidirectional)")]
pub struct UnknownAntennaType(pub String);

impl FromStr for AntennaKind {
    type Err = UnknownAntennaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "directional" | "yagi" | "logp" => Ok(Self::Directional),
            "omni" | "omnidirectional" => Ok(Self::Omni),
            _ => Err(UnknownAntennaType(s.to_string())),
        }
    }
}

impl fmt::Display for AntennaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directional => write!(f, "directional"),
            Self::Omni => write!(f, "omni"),
        }
    }
}

impl AntennaKind {
    /// Gain in dBi at `relative_bearing` degrees off boresight.
    pub fn gain_db(&self, relative_bearing: f64) -> f64 {
        match self {
            Self::Directional => {
                // Squared cardioid
                let lobe = ((1.0 + relative_bearing.to_radians().cos()) / 2.0).powi(2);
                let rel_db = if lobe > 0.0 {
                    (10.0 * lobe.log10()).max(DIRECTIONAL_FLOOR_DB)
                } else {
                    DIRECTIONAL_FLOOR_DB
                };
                DIRECTIONAL_PEAK_GAIN_DBI + rel_db
            }
            Self::Omni => OMNI_GAIN_DBI,
        }
    }
}

/// Per-target transmitter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransmitterParams {
    /// Transmit power in dBm.
    pub power_tx: f64,
    /// Transmit antenna directivity (linear).
    pub directivity_tx: f64,
    /// Carrier frequency in Hz.
    pub freq: f64,
}

/// Free-space path loss in dB.
pub fn free_space_path_loss_db(distance_m: f64, freq: f64) -> f64 {
    let d = distance_m.max(MIN_RANGE_M);
    20.0 * (4.0 * PI * d * freq / SPEED_OF_LIGHT).log10()
}

/// RSSI sensor for a set of transmitting targets.
#[derive(Debug, Clone, PartialEq)]
pub struct RssiSensor {
    antenna: AntennaKind,
    transmitters: Vec<TransmitterParams>,
    fading_sigma: f64,
    threshold: f64,
}

impl RssiSensor {
    pub fn new(
        antenna: AntennaKind,
        transmitters: Vec<TransmitterParams>,
        fading_sigma: f64,
        threshold: f64,
    ) -> Self {
        Self {
            antenna,
            transmitters,
            fading_sigma,
            threshold,
        }
    }

    pub fn antenna(&self) -> AntennaKind {
        self.antenna
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn n_transmitters(&self) -> usize {
        self.transmitters.len()
    }

    /// Expected RSSI in dBm from `target` at `at`, seen from `pose`.
    ///
    /// Targets without their own parameters reuse the last transmitter's.
    pub fn expected_rssi(&self, target: usize, pose: &SensorPose, at: (f64, f64)) -> f64 {
        let Some(tx) = self
            .transmitters
            .get(target)
            .or_else(|| self.transmitters.last())
        else {
            return f64::NEG_INFINITY;
        };
        let relative = wrap_delta(pose.azimuth_to(at) - pose.heading);
        tx.power_tx + 10.0 * tx.directivity_tx.max(f64::MIN_POSITIVE).log10()
            + self.antenna.gain_db(relative)
            - free_space_path_loss_db(pose.range_to(at), tx.freq)
    }

    /// True if `rssi` counts as a detection.
    pub fn detects(&self, rssi: f64) -> bool {
        rssi > self.threshold
    }

    /// Likelihood of observing `observed` when `expected` is predicted.
    pub fn likelihood(&self, observed: f64, expected: f64) -> f64 {
        if !self.detects(observed) {
            normal_cdf((self.threshold - expected) / self.fading_sigma)
        } else {
            let z = (observed - expected) / self.fading_sigma;
            (-0.5 * z * z).exp() / (self.fading_sigma * (2.0 * PI).sqrt())
        }
    }
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / SQRT_2))
}

/// Abramowitz and Stegun 7.1.26.
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}
