//! The fused per-tick snapshot of the sensor platform.

use serde::{Deserialize, Serialize};

use crate::geo::LatLon;

/// A control input: turn by `heading_delta` degrees, then move `distance` metres.
///
/// Serialized as a `[heading_delta, distance]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Action {
    pub heading_delta: f64,
    pub distance: f64,
}

impl Action {
    /// The zero control input.
    pub const HOLD: Self = Self {
        heading_delta: 0.0,
        distance: 0.0,
    };

    pub fn new(heading_delta: f64, distance: f64) -> Self {
        Self {
            heading_delta,
            distance,
        }
    }
}

impl From<(f64, f64)> for Action {
    fn from((heading_delta, distance): (f64, f64)) -> Self {
        Self::new(heading_delta, distance)
    }
}

impl From<Action> for (f64, f64) {
    fn from(action: Action) -> Self {
        (action.heading_delta, action.distance)
    }
}

/// Fused state of the sensor platform.
///
/// One instance is live per process. It is replaced whole on every telemetry
/// merge and copied out once per tick by the controller.
///
/// # Headings
///
/// `heading` is where the antenna faces, `course` is where the platform is
/// moving. Both use the sensor azimuth convention (0 = east,
/// counter-clockwise, degrees in `[0, 360)`).
///
/// # Serialization
///
/// Field names match the per-tick run log consumed by the offline analysis
/// tools (`rssi`, `course`, `distance`, `drone_position`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackState {
    /// Unix time of the telemetry that produced this state.
    pub timestamp: Option<f64>,

    /// Received signal strength in dBm.
    #[serde(rename = "rssi")]
    pub signal_strength: Option<f64>,

    pub position: Option<LatLon>,

    /// Position at the last consumed tick.
    pub previous_position: Option<LatLon>,

    pub heading: Option<f64>,

    /// Heading at the last consumed tick.
    pub previous_heading: Option<f64>,

    /// Course over ground derived from displacement.
    #[serde(rename = "course")]
    pub course_over_ground: Option<f64>,

    /// Metres moved since the last consumed tick.
    #[serde(rename = "distance")]
    pub distance_traveled: Option<f64>,

    /// Action the planner proposed for this tick (`null` = no further action).
    #[serde(rename = "action_proposal")]
    pub action_proposed: Option<Action>,

    /// Control input actually applied since the last consumed tick.
    pub action_taken: Action,

    /// Companion platform position, `(lat, lon)`.
    #[serde(rename = "drone_position")]
    pub other_platform_position: Option<LatLon>,

    /// Set by every merge, cleared when the controller consumes the state.
    pub needs_processing: bool,
}

impl TrackState {
    /// True once both position and heading are known.
    pub fn has_fix(&self) -> bool {
        self.position.is_some() && self.heading.is_some()
    }
}
