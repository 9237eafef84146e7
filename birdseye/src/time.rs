//! Wall-clock helpers.
//!
//! Tick scheduling uses tokio's monotonic clock; these functions only tag
//! records and name files.

use chrono::Utc;

/// Current Unix time in seconds with microsecond resolution.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_now_is_after_2020() {
        assert!(unix_now() > 1_577_836_800.0);
    }

    #[test]
    fn test_unix_now_tracks_chrono_seconds() {
        let secs = Utc::now().timestamp();
        let precise = unix_now();
        assert!((precise - secs as f64).abs() < 2.0);
    }
}
