//! Configuration file handling.
//!
//! The tracker is always started with an explicit INI file. Settings live in
//! [`super::settings`], defaults in [`super::defaults`] and key parsing in
//! [`super::parser`].

use std::path::Path;

use ini::Ini;
use thiserror::Error;

use super::settings::GeolocateConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the INI file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl GeolocateConfig {
    /// Load configuration from a specific path.
    ///
    /// A missing file is an error; a missing `[geolocate]` section yields
    /// the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }
}
