//! Deterministic replay of a recorded telemetry session.
//!
//! A session file is a JSON object mapping timestamp keys to telemetry
//! records. Records are replayed in ascending key order (string order, which
//! matches numeric order for the fixed-width Unix timestamps the recorder
//! writes). A key that parses as a float becomes the record's
//! `received_at`, so replayed states carry the recorded time.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use tracing::info;

use super::{SourceMode, TelemetrySource};
use crate::track::TelemetryRecord;

/// Errors loading a replay session.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read replay file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Replay file {path} is not a JSON object of records: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid telemetry record at key '{key}': {source}")]
    Record {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Replays a recorded session one record per tick.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    records: VecDeque<TelemetryRecord>,
    total: usize,
}

impl ReplaySource {
    /// Load and order a session file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_slice(&data).map_err(|source| ReplayError::Format {
                path: path.to_path_buf(),
                source,
            })?;

        let source = Self::from_entries(raw)?;
        info!(
            path = %path.display(),
            records = source.total,
            "Loaded replay session"
        );
        Ok(source)
    }

    /// Build a source from already-parsed `key -> record` entries.
    pub fn from_entries(
        entries: BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, ReplayError> {
        let records = entries
            .into_iter()
            .map(|(key, value)| {
                let record: TelemetryRecord = serde_json::from_value(value)
                    .map_err(|source| ReplayError::Record {
                        key: key.clone(),
                        source,
                    })?;
                Ok(match key.trim().parse::<f64>() {
                    Ok(ts) if ts.is_finite() => record.with_received_at(ts),
                    _ => record,
                })
            })
            .collect::<Result<VecDeque<_>, ReplayError>>()?;

        let total = records.len();
        Ok(Self { records, total })
    }

    /// Records in the session.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Records not yet replayed.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl TelemetrySource for ReplaySource {
    fn next(&mut self) -> Option<TelemetryRecord> {
        self.records.pop_front()
    }

    fn has_more(&self) -> bool {
        !self.records.is_empty()
    }

    fn mode(&self) -> SourceMode {
        SourceMode::Replay
    }
}
