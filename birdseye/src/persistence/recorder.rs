//! File-backed run recorder.
//!
//! Layout under the data directory:
//!
//! ```text
//! {data_dir}/{experiment}/
//!     config.json                              effective configuration
//!     birdseye-{run_start}.log                 one JSON object per tick
//!     {utc_time}_target{t}_particles.npy       one per target per tick
//! ```
//!
//! The log is opened once in append mode and kept open. Each line goes out
//! in a single `write_all` and is flushed, so a killed process leaves at
//! most a partial last line.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use super::{npy, snapshot_file_name, Persistence, PersistenceError, TickRecord};
use crate::estimator::ParticleSet;

pub struct RunRecorder {
    run_dir: PathBuf,
    log_path: PathBuf,
    log: File,
    lines: u64,
}

impl RunRecorder {
    /// Create the run directory and open the run log.
    pub fn create(
        data_dir: &Path,
        experiment: &str,
        run_start: f64,
    ) -> Result<Self, PersistenceError> {
        let run_dir = data_dir.join(experiment);
        fs::create_dir_all(&run_dir).map_err(|source| PersistenceError::CreateDir {
            path: run_dir.clone(),
            source,
        })?;

        let log_path = run_dir.join(format!("birdseye-{run_start:.6}.log"));
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|source| PersistenceError::OpenLog {
                path: log_path.clone(),
                source,
            })?;

        info!(log = %log_path.display(), "Recording run");
        Ok(Self {
            run_dir,
            log_path,
            log,
            lines: 0,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Lines appended so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Write the effective configuration as `config.json`.
    pub fn write_header<C: Serialize>(&self, config: &C) -> Result<PathBuf, PersistenceError> {
        let path = self.run_dir.join("config.json");
        let mut body = serde_json::to_vec_pretty(config)?;
        body.push(b'\n');
        fs::write(&path, body).map_err(|source| PersistenceError::Header {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl Persistence for RunRecorder {
    fn append(&mut self, record: &TickRecord) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.log
            .write_all(&line)
            .and_then(|()| self.log.flush())
            .map_err(|source| PersistenceError::Append {
                path: self.log_path.clone(),
                source,
            })?;
        self.lines += 1;
        Ok(())
    }

    fn snapshot(
        &mut self,
        utc_time: f64,
        target: usize,
        particles: &ParticleSet,
    ) -> Result<(), PersistenceError> {
        let path = self.run_dir.join(snapshot_file_name(utc_time, target));
        npy::write(&path, particles.particles())
            .map_err(|source| PersistenceError::Snapshot { path, source })
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        self.log
            .sync_data()
            .map_err(|source| PersistenceError::Append {
                path: self.log_path.clone(),
                source,
            })
    }
}
