//! Sensor platform tracking.
//!
//! Telemetry records ([`TelemetryRecord`]) are fused into a single
//! [`TrackState`] held in a [`SharedTrackState`]. The telemetry handler
//! writes to it, the cadence controller consumes it once per tick.

mod fusion;
mod record;
mod state;

pub use fusion::{fuse, SharedTrackState, StaticOverrides};
pub use record::TelemetryRecord;
pub use state::{Action, TrackState};
