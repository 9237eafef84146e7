//! Telemetry sources for the sensor platform.
//!
//! Two interchangeable implementations sit behind [`TelemetrySource`]:
//!
//! - [`ReplaySource`] - pull-based, replays a recorded session in key order.
//!   `next()` pops one record per tick and the run ends when it is exhausted.
//! - [`LiveSource`] - push-based. A [`LiveTelemetryReceiver`] task fuses every
//!   datagram into the shared state as it arrives, so there is nothing to pull
//!   and `next()` always returns `None`. The controller then works from the
//!   latest fused snapshot, fresh or stale.
//!
//! # Example
//!
//! ```ignore
//! let fusion = SharedTrackState::new(StaticOverrides::default());
//! let mut source = ReplaySource::load("session.json")?;
//!
//! while let Some(record) = source.next() {
//!     fusion.merge(record);
//! }
//! ```

mod live;
mod replay;

pub use live::{LiveSource, LiveTelemetryReceiver, TelemetryError};
pub use replay::{ReplayError, ReplaySource};

use crate::track::TelemetryRecord;

/// How a source delivers records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Records are pushed into the shared state by a background task.
    Live,
    /// Records are pulled one per tick from a recorded session.
    Replay,
}

/// A stream of telemetry records driving the tracker.
pub trait TelemetrySource: Send {
    /// Next record to merge before this tick, if the source is pull-based.
    fn next(&mut self) -> Option<TelemetryRecord>;

    /// False once the source can produce nothing more.
    fn has_more(&self) -> bool;

    fn mode(&self) -> SourceMode;
}
