//! Telemetry record as it arrives on the wire or from a recorded session.

use serde::Deserialize;

use crate::geo::{yaw_to_azimuth, LatLon};

/// One telemetry message about the sensor platform.
///
/// Field names follow the recorded sessions (`rssi`, `drone_position`);
/// the descriptive names are accepted as aliases. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TelemetryRecord {
    /// Received signal strength in dBm.
    #[serde(default, alias = "signal_strength")]
    pub rssi: Option<f64>,

    /// Sensor position as `[lat, lon]`.
    #[serde(default)]
    pub position: Option<LatLon>,

    /// North-relative yaw in degrees. Reported as a number or a numeric
    /// string; anything else is treated as missing.
    #[serde(default)]
    pub heading: Option<serde_json::Value>,

    /// Position of the companion platform as `[lon, lat]` (wire order).
    #[serde(default, alias = "other_platform_position")]
    pub drone_position: Option<LatLon>,

    /// Unix time the record was received or recorded at.
    #[serde(skip)]
    pub received_at: Option<f64>,
}

impl TelemetryRecord {
    /// Parse a record from raw JSON bytes.
    pub fn from_json_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Reported yaw in degrees, if it is numeric and finite.
    pub fn yaw_degrees(&self) -> Option<f64> {
        let yaw = match self.heading.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        yaw.is_finite().then_some(yaw)
    }

    /// Reported yaw converted into the sensor azimuth convention.
    pub fn heading_azimuth(&self) -> Option<f64> {
        self.yaw_degrees().map(yaw_to_azimuth)
    }

    /// Companion platform position swapped into `(lat, lon)` order.
    pub fn other_platform_lat_lon(&self) -> Option<LatLon> {
        self.drone_position.map(|(lon, lat)| (lat, lon))
    }

    /// Set the time this record was received.
    pub fn with_received_at(mut self, unix_seconds: f64) -> Self {
        self.received_at = Some(unix_seconds);
        self
    }
}
