//! Tracker configuration.
//!
//! One INI file with a `[geolocate]` section is parsed into a typed
//! [`GeolocateConfig`] once at startup. Every key has a default and a
//! validated range, and the component settings for the estimator, planner
//! and controller are derived from it.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use birdseye::config::GeolocateConfig;
//!
//! let config = GeolocateConfig::load_from(Path::new("configs/field.ini"))?;
//! let planner = config.planner_settings();
//! # Ok::<(), birdseye::config::ConfigFileError>(())
//! ```

mod defaults;
mod file;
mod parser;
mod settings;

pub use defaults::*;
pub use file::ConfigFileError;
pub use settings::GeolocateConfig;
