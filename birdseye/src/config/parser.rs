//! INI parsing logic for converting `Ini` → `GeolocateConfig`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use super::defaults::{
    DEFAULT_DIRECTIVITY_TX, DEFAULT_FREQ, DEFAULT_POWER_TX, MAX_PERIOD_SECS, SECTION,
};
use super::file::ConfigFileError;
use super::settings::GeolocateConfig;

const KNOWN_KEYS: &[&str] = &[
    "n_targets",
    "antenna_type",
    "planner_method",
    "use_planner",
    "target_speed",
    "sensor_speed",
    "power_tx",
    "directivity_tx",
    "freq",
    "fading_sigma",
    "threshold",
    "mcts_depth",
    "mcts_c",
    "mcts_simulations",
    "mcts_n_downsample",
    "static_position",
    "static_heading",
    "replay_file",
    "telemetry_host",
    "telemetry_port",
    "use_live_view",
    "live_view_host",
    "live_view_port",
    "make_gif",
    "local_plot",
    "horizon",
    "step_duration",
    "min_std_dev",
    "r_min",
    "min_bound",
    "num_particles",
    "particle_distance",
    "data_dir",
    "seed",
    "fix_poll_interval",
];

/// Parse an `Ini` object into a `GeolocateConfig`.
///
/// Starts from `GeolocateConfig::default()` and overlays any values found in
/// the `[geolocate]` section.
pub(super) fn parse_ini(ini: &Ini) -> Result<GeolocateConfig, ConfigFileError> {
    let mut config = GeolocateConfig::default();

    let Some(section) = ini.section(Some(SECTION)) else {
        tracing::debug!(section = SECTION, "No config section, using defaults");
        return Ok(config);
    };

    for (key, _) in section.iter() {
        if !KNOWN_KEYS.contains(&key) {
            tracing::warn!(section = SECTION, key, "Ignoring unknown configuration key");
        }
    }

    // Targets and models
    if let Some(v) = section.get("n_targets") {
        config.n_targets = parse_checked(
            "n_targets",
            v,
            |n: &usize| *n >= 1,
            "must be a positive integer",
        )?;
    }
    if let Some(v) = section.get("antenna_type") {
        config.antenna_type = v
            .parse()
            .map_err(|e: crate::estimator::UnknownAntennaType| invalid("antenna_type", v, e.to_string()))?;
    }
    if let Some(v) = section.get("planner_method") {
        config.planner_method = v
            .parse()
            .map_err(|e: crate::planner::UnknownPlannerMethod| invalid("planner_method", v, e.to_string()))?;
    }
    if let Some(v) = section.get("use_planner") {
        config.use_planner = parse_bool("use_planner", v)?;
    }
    if let Some(v) = section.get("target_speed") {
        config.target_speed = parse_checked("target_speed", v, non_negative, "must be >= 0 (m/s)")?;
    }
    if let Some(v) = section.get("sensor_speed") {
        config.sensor_speed = parse_checked("sensor_speed", v, non_negative, "must be >= 0 (m/s)")?;
    }

    // Transmitters
    let power_tx = section.get("power_tx").map(|v| parse_list("power_tx", v)).transpose()?;
    let directivity_tx = section
        .get("directivity_tx")
        .map(|v| parse_list("directivity_tx", v))
        .transpose()?;
    let freq = section.get("freq").map(|v| parse_list("freq", v)).transpose()?;
    if let Some(v) = section.get("fading_sigma") {
        config.fading_sigma = parse_checked("fading_sigma", v, positive, "must be > 0 (dB)")?;
    }
    if let Some(v) = section.get("threshold") {
        config.threshold = parse_checked("threshold", v, finite, "must be a number (dBm)")?;
    }

    // Tree search
    if let Some(v) = section.get("mcts_depth") {
        config.mcts_depth = parse_checked("mcts_depth", v, |n: &usize| *n >= 1, "must be a positive integer")?;
    }
    if let Some(v) = section.get("mcts_c") {
        config.mcts_c = parse_checked("mcts_c", v, non_negative, "must be >= 0")?;
    }
    if let Some(v) = section.get("mcts_simulations") {
        config.mcts_simulations = parse_checked(
            "mcts_simulations",
            v,
            |n: &usize| *n >= 1,
            "must be a positive integer",
        )?;
    }
    if let Some(v) = section.get("mcts_n_downsample") {
        config.mcts_n_downsample = parse_checked(
            "mcts_n_downsample",
            v,
            |n: &usize| *n >= 1,
            "must be a positive integer",
        )?;
    }

    // Static overrides
    if let Some(v) = section.get("static_position") {
        config.static_position = parse_position(v)?;
    }
    if let Some(v) = section.get("static_heading") {
        config.static_heading = parse_optional("static_heading", v, finite, "must be a number (degrees)")?;
    }

    // Telemetry
    if let Some(v) = section.get("replay_file") {
        config.replay_file = non_empty(v).map(PathBuf::from);
    }
    if let Some(v) = section.get("telemetry_host") {
        config.telemetry_host = parse_host("telemetry_host", v)?;
    }
    if let Some(v) = section.get("telemetry_port") {
        config.telemetry_port = parse_checked("telemetry_port", v, |_: &u16| true, "must be a port number")?;
    }

    // Live view
    if let Some(v) = section.get("use_live_view") {
        config.use_live_view = parse_bool("use_live_view", v)?;
    }
    if let Some(v) = section.get("live_view_host") {
        config.live_view_host = parse_host("live_view_host", v)?;
    }
    if let Some(v) = section.get("live_view_port") {
        config.live_view_port = parse_checked("live_view_port", v, |_: &u16| true, "must be a port number")?;
    }
    if let Some(v) = section.get("make_gif") {
        config.make_gif = parse_bool("make_gif", v)?;
    }
    if let Some(v) = section.get("local_plot") {
        if parse_bool("local_plot", v)? {
            tracing::warn!(
                section = SECTION,
                key = "local_plot",
                "On-screen plotting is not supported, use use_live_view or make_gif"
            );
        }
    }

    // Control loop and estimator
    if let Some(v) = section.get("horizon") {
        config.horizon = parse_checked("horizon", v, |n: &usize| *n >= 1, "must be a positive integer")?;
    }
    if let Some(v) = section.get("step_duration") {
        config.step_duration = parse_checked("step_duration", v, period, "must be > 0 and at most 86400 (seconds)")?;
    }
    if let Some(v) = section.get("min_std_dev") {
        config.min_std_dev = parse_checked("min_std_dev", v, positive, "must be > 0 (metres)")?;
    }
    if let Some(v) = section.get("r_min") {
        config.r_min = parse_checked("r_min", v, non_negative, "must be >= 0 (metres)")?;
    }
    if let Some(v) = section.get("min_bound") {
        config.min_bound = parse_checked(
            "min_bound",
            v,
            |b: &f64| *b > 0.0 && *b <= 1.0,
            "must be in (0, 1]",
        )?;
    }
    if let Some(v) = section.get("num_particles") {
        config.num_particles = parse_checked("num_particles", v, |n: &usize| *n >= 1, "must be a positive integer")?;
    }
    if let Some(v) = section.get("particle_distance") {
        config.particle_distance = parse_checked("particle_distance", v, positive, "must be > 0 (metres)")?;
    }

    // Output and repeatability
    if let Some(v) = section.get("data_dir") {
        if let Some(dir) = non_empty(v) {
            config.data_dir = PathBuf::from(dir);
        }
    }
    if let Some(v) = section.get("seed") {
        config.seed = parse_optional("seed", v, |_: &u64| true, "must be a non-negative integer")?;
    }
    if let Some(v) = section.get("fix_poll_interval") {
        config.fix_poll_interval = parse_checked("fix_poll_interval", v, period, "must be > 0 and at most 86400 (seconds)")?;
    }

    // Per-target lists depend on the final n_targets
    let n = config.n_targets;
    config.power_tx = broadcast("power_tx", power_tx, DEFAULT_POWER_TX, n)?;
    config.directivity_tx = broadcast("directivity_tx", directivity_tx, DEFAULT_DIRECTIVITY_TX, n)?;
    config.freq = broadcast("freq", freq, DEFAULT_FREQ, n)?;

    Ok(config)
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0 (case-insensitive)
pub(super) fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(key, value, "must be true/false, yes/no or 1/0")),
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: SECTION.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_checked<T: FromStr>(
    key: &str,
    value: &str,
    check: impl Fn(&T) -> bool,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse::<T>()
        .ok()
        .filter(|v| check(v))
        .ok_or_else(|| invalid(key, value, reason))
}

/// Like [`parse_checked`], but an empty value means "unset".
fn parse_optional<T: FromStr>(
    key: &str,
    value: &str,
    check: impl Fn(&T) -> bool,
    reason: &str,
) -> Result<Option<T>, ConfigFileError> {
    match non_empty(value) {
        Some(v) => parse_checked(key, v, check, reason).map(Some),
        None => Ok(None),
    }
}

fn parse_list(key: &str, value: &str) -> Result<Vec<f64>, ConfigFileError> {
    let values = value
        .split(',')
        .map(|item| item.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<_>>>()
        .filter(|values| !values.is_empty())
        .ok_or_else(|| invalid(key, value, "must be a comma-separated list of numbers"))?;
    Ok(values)
}

/// Repeat a single value for every target, or require one value per target.
fn broadcast(
    key: &str,
    parsed: Option<Vec<f64>>,
    default: f64,
    n_targets: usize,
) -> Result<Vec<f64>, ConfigFileError> {
    let Some(values) = parsed else {
        return Ok(vec![default; n_targets]);
    };
    match values.as_slice() {
        [single] => Ok(vec![*single; n_targets]),
        _ if values.len() == n_targets => Ok(values),
        _ => Err(invalid(
            key,
            &join(&values),
            format!("expected 1 or {n_targets} values (one per target), got {}", values.len()),
        )),
    }
}

fn parse_position(value: &str) -> Result<Option<(f64, f64)>, ConfigFileError> {
    let Some(v) = non_empty(value) else {
        return Ok(None);
    };
    let parts = v
        .split(',')
        .map(|p| p.trim().parse::<f64>().ok().filter(|x| x.is_finite()))
        .collect::<Option<Vec<_>>>();
    match parts.as_deref() {
        Some(&[lat, lon]) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) => {
            Ok(Some((lat, lon)))
        }
        _ => Err(invalid(
            "static_position",
            value,
            "expected 'lat,lon' in degrees",
        )),
    }
}

fn parse_host(key: &str, value: &str) -> Result<String, ConfigFileError> {
    non_empty(value)
        .map(str::to_string)
        .ok_or_else(|| invalid(key, value, "must not be empty"))
}

fn non_empty(value: &str) -> Option<&str> {
    let v = value.trim();
    (!v.is_empty()).then_some(v)
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn positive(v: &f64) -> bool {
    v.is_finite() && *v > 0.0
}

// Loop periods must convert to a `Duration`.
fn period(v: &f64) -> bool {
    positive(v) && *v <= MAX_PERIOD_SECS && Duration::try_from_secs_f64(*v).is_ok()
}

fn non_negative(v: &f64) -> bool {
    v.is_finite() && *v >= 0.0
}

fn finite(v: &f64) -> bool {
    v.is_finite()
}
