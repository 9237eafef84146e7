//! BirdsEye - real-time RF direction and range finding
//!
//! This library drives a mobile RF sensor platform that localises one or
//! more transmitters. It fuses asynchronous telemetry into a per-tick state,
//! runs a fixed-cadence control loop around a particle-filter estimator and
//! an optional path planner, and records every tick to disk.
//!
//! # High-Level API
//!
//! For most use cases, the [`session`] module wires everything from a
//! config file:
//!
//! ```ignore
//! use birdseye::config::GeolocateConfig;
//! use birdseye::session::TrackerSession;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = GeolocateConfig::load_from(path)?;
//! let session = TrackerSession::new(config, TrackerSession::experiment_name(path));
//! let summary = session.run(CancellationToken::new()).await?;
//! ```

pub mod config;
pub mod controller;
pub mod estimator;
pub mod geo;
pub mod live_view;
pub mod logging;
pub mod persistence;
pub mod planner;
pub mod session;
pub mod telemetry;
pub mod time;
pub mod track;

/// Version of the BirdsEye library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
