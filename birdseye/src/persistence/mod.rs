//! Durable per-tick history of a run.
//!
//! Every tick appends one JSON line ([`TickRecord`]) to the run log and
//! writes one particle snapshot per target. Both must succeed before the tick
//! is done; a failure is surfaced to the controller, which stops the run.

mod npy;
mod recorder;

pub use recorder::RunRecorder;

use std::path::PathBuf;

use serde::Serialize;

use crate::estimator::ParticleSet;
use crate::track::TrackState;

/// One line of the run log: the fused state plus the tick's wall clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickRecord {
    #[serde(flatten)]
    pub state: TrackState,
    /// Unix time at the start of the tick.
    pub utc_time: f64,
}

/// Errors writing run history.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to create run directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open run log {path}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to run log {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write particle snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },

    #[error("Failed to write run header {path}: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize run record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sink for the per-tick history.
pub trait Persistence: Send {
    /// Append one record to the run log.
    fn append(&mut self, record: &TickRecord) -> Result<(), PersistenceError>;

    /// Store `target`'s particles for the tick stamped `utc_time`.
    fn snapshot(
        &mut self,
        utc_time: f64,
        target: usize,
        particles: &ParticleSet,
    ) -> Result<(), PersistenceError>;

    /// Push buffered data to durable storage.
    fn flush(&mut self) -> Result<(), PersistenceError>;
}

/// Snapshot file name for `target` at `utc_time`.
pub fn snapshot_file_name(utc_time: f64, target: usize) -> String {
    format!("{utc_time:.6}_target{target}_particles.npy")
}
