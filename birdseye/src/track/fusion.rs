//! State fusion - merges telemetry records into the running [`TrackState`].
//!
//! [`fuse`] is the pure merge law. [`SharedTrackState`] wraps it in a
//! single-slot, most-recent-wins cell shared between the telemetry handler
//! and the cadence controller: writers compute a whole new state under the
//! lock and replace it, readers copy the state out.
//!
//! # "Previous" values
//!
//! `previous_position` and `previous_heading` only roll forward when the
//! current state has already been consumed by the controller
//! (`needs_processing == false`). If two records arrive within one tick the
//! earlier one is overwritten and "previous" keeps pointing at the last
//! consumed tick, so the control input derived from it stays correct.

use std::sync::Arc;

use parking_lot::Mutex;

use super::record::TelemetryRecord;
use super::state::{Action, TrackState};
use crate::geo::{course_between, distance_m, wrap_delta, yaw_to_azimuth, LatLon};

/// Fixed position and/or heading for stationary deployments.
///
/// When set, these replace the matching field of every incoming record
/// before it is merged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StaticOverrides {
    pub position: Option<LatLon>,
    /// North-relative yaw in degrees, same convention as the wire field.
    pub heading: Option<f64>,
}

impl StaticOverrides {
    fn apply(&self, record: &mut TelemetryRecord) {
        if let Some(position) = self.position {
            record.position = Some(position);
        }
        if let Some(heading) = self.heading {
            record.heading = serde_json::Number::from_f64(heading).map(serde_json::Value::Number);
        }
    }
}

/// Merge one telemetry record into the current state.
pub fn fuse(
    current: &TrackState,
    mut record: TelemetryRecord,
    overrides: &StaticOverrides,
) -> TrackState {
    overrides.apply(&mut record);

    let (previous_position, previous_heading) = if current.needs_processing {
        (current.previous_position, current.previous_heading)
    } else {
        (current.position, current.heading)
    };

    let position = record.position.or(current.position);

    let course_over_ground = match (previous_position, position) {
        (Some(from), Some(to)) => Some(course_between(from, to)),
        _ => None,
    };

    let heading = record.heading_azimuth().or(course_over_ground);

    let distance_traveled = match (previous_position, position) {
        (Some(from), Some(to)) => Some(distance_m(from, to)),
        _ => None,
    };

    let heading_delta = match (heading, previous_heading) {
        (Some(h), Some(p)) => Some(wrap_delta(h - p)),
        _ => None,
    };

    let action_taken = match (heading_delta, distance_traveled) {
        (Some(delta), Some(distance)) => Action::new(delta, distance),
        _ => Action::HOLD,
    };

    TrackState {
        timestamp: record.received_at.or(current.timestamp),
        signal_strength: record.rssi,
        position,
        previous_position,
        heading,
        previous_heading,
        course_over_ground,
        distance_traveled,
        action_proposed: current.action_proposed,
        action_taken,
        other_platform_position: record.other_platform_lat_lon(),
        needs_processing: true,
    }
}

/// Thread-safe holder of the live [`TrackState`].
///
/// Cloning is cheap and every clone refers to the same state.
#[derive(Debug, Clone)]
pub struct SharedTrackState {
    inner: Arc<Mutex<TrackState>>,
    overrides: StaticOverrides,
}

impl SharedTrackState {
    /// Create the shared state, seeded from any static overrides.
    pub fn new(overrides: StaticOverrides) -> Self {
        let seed = TrackState {
            position: overrides.position,
            heading: overrides.heading.map(yaw_to_azimuth),
            ..Default::default()
        };
        Self {
            inner: Arc::new(Mutex::new(seed)),
            overrides,
        }
    }

    /// The configured static overrides.
    pub fn overrides(&self) -> &StaticOverrides {
        &self.overrides
    }

    /// Merge a telemetry record, replacing the whole state.
    ///
    /// Returns a copy of the new state.
    pub fn merge(&self, record: TelemetryRecord) -> TrackState {
        let mut guard = self.inner.lock();
        if guard.needs_processing {
            tracing::debug!("Received multiple telemetry records in one step");
        }
        let next = fuse(&guard, record, &self.overrides);
        *guard = next.clone();
        next
    }

    /// Copy out the current state without consuming it.
    pub fn snapshot(&self) -> TrackState {
        self.inner.lock().clone()
    }

    /// Copy out the current state and mark it consumed.
    ///
    /// The returned copy keeps the `needs_processing` flag it had, so the
    /// caller can tell fresh telemetry from a reused stale state.
    pub fn consume(&self) -> TrackState {
        let mut guard = self.inner.lock();
        let snapshot = guard.clone();
        guard.needs_processing = false;
        snapshot
    }

    /// Record the planner's proposal for the current tick.
    ///
    /// Carried forward by later merges until replaced.
    pub fn propose(&self, action: Option<Action>) {
        self.inner.lock().action_proposed = action;
    }

    /// True if a merge happened since the last [`SharedTrackState::consume`].
    pub fn needs_processing(&self) -> bool {
        self.inner.lock().needs_processing
    }

    /// True once both position and heading are known.
    pub fn has_fix(&self) -> bool {
        self.inner.lock().has_fix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> TelemetryRecord {
        TelemetryRecord::from_json_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_first_record_has_no_derived_motion() {
        let state = fuse(
            &TrackState::default(),
            record(r#"{"rssi": -50, "position": [10, 20], "heading": "30"}"#),
            &StaticOverrides::default(),
        );

        assert_eq!(state.position, Some((10.0, 20.0)));
        assert_eq!(state.heading, Some(60.0));
        assert_eq!(state.previous_position, None);
        assert_eq!(state.course_over_ground, None);
        assert_eq!(state.distance_traveled, None);
        assert_eq!(state.action_taken, Action::HOLD);
        assert!(state.needs_processing);
    }

    #[test]
    fn test_worked_example_two_consumed_ticks() {
        let prior = TrackState {
            previous_heading: Some(20.0),
            ..Default::default()
        };
        let first = fuse(
            &prior,
            record(r#"{"heading": "30", "position": [10, 20]}"#),
            &StaticOverrides::default(),
        );
        let consumed = TrackState {
            needs_processing: false,
            ..first
        };
        let second = fuse(
            &consumed,
            record(r#"{"heading": "40", "position": [10, 21]}"#),
            &StaticOverrides::default(),
        );

        assert_eq!(second.heading, Some(50.0));
        assert_eq!(second.previous_heading, Some(60.0));
        assert_eq!(second.previous_position, Some((10.0, 20.0)));
        let expected_course = course_between((10.0, 20.0), (10.0, 21.0));
        assert_eq!(second.course_over_ground, Some(expected_course));
        assert!((second.action_taken.heading_delta - -10.0).abs() < 1e-9);
        let expected_distance = distance_m((10.0, 20.0), (10.0, 21.0));
        assert!((second.action_taken.distance - expected_distance).abs() < 1e-6);
    }

    #[test]
    fn test_unconsumed_state_keeps_previous_values() {
        let consumed = TrackState {
            position: Some((1.0, 1.0)),
            heading: Some(10.0),
            ..Default::default()
        };
        let first = fuse(
            &consumed,
            record(r#"{"position": [1.0, 1.001], "heading": 5}"#),
            &StaticOverrides::default(),
        );
        // Not consumed before the next record arrives
        let second = fuse(
            &first,
            record(r#"{"position": [1.0, 1.002], "heading": 6}"#),
            &StaticOverrides::default(),
        );

        assert_eq!(second.previous_position, Some((1.0, 1.0)));
        assert_eq!(second.previous_heading, Some(10.0));
        let expected = distance_m((1.0, 1.0), (1.0, 1.002));
        assert!((second.distance_traveled.unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_heading_delta_wraps_across_north_east_boundary() {
        let at = |heading: f64| TrackState {
            position: Some((0.0, 0.0)),
            heading: Some(heading),
            ..Default::default()
        };

        // Azimuth 5 -> 350 is a 15 degree clockwise turn
        let state = fuse(
            &at(5.0),
            record(r#"{"position": [0.0001, 0.0], "heading": 100}"#),
            &StaticOverrides::default(),
        );
        assert_eq!(state.heading, Some(350.0));
        assert!((state.action_taken.heading_delta - -15.0).abs() < 1e-9);

        // Azimuth 355 -> 10 is a 15 degree counter-clockwise turn
        let state = fuse(
            &at(355.0),
            record(r#"{"position": [0.0001, 0.0], "heading": 80}"#),
            &StaticOverrides::default(),
        );
        assert_eq!(state.heading, Some(10.0));
        assert!((state.action_taken.heading_delta - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_heading_falls_back_to_course() {
        let consumed = TrackState {
            position: Some((0.0, 0.0)),
            heading: Some(0.0),
            ..Default::default()
        };
        let state = fuse(
            &consumed,
            record(r#"{"position": [0.001, 0.0], "heading": "n/a"}"#),
            &StaticOverrides::default(),
        );
        assert!((state.heading.unwrap() - 90.0).abs() < 1e-6);
        assert_eq!(state.heading, state.course_over_ground);
    }

    #[test]
    fn test_missing_position_keeps_current() {
        let consumed = TrackState {
            position: Some((5.0, 5.0)),
            ..Default::default()
        };
        let state = fuse(&consumed, record(r#"{"rssi": -90}"#), &StaticOverrides::default());
        assert_eq!(state.position, Some((5.0, 5.0)));
        assert_eq!(state.distance_traveled, Some(0.0));
    }

    #[test]
    fn test_rssi_not_carried_over() {
        let current = TrackState {
            signal_strength: Some(-40.0),
            ..Default::default()
        };
        let state = fuse(&current, record("{}"), &StaticOverrides::default());
        assert_eq!(state.signal_strength, None);
    }

    #[test]
    fn test_other_platform_position_swapped() {
        let state = fuse(
            &TrackState::default(),
            record(r#"{"drone_position": [-76.6, 39.1]}"#),
            &StaticOverrides::default(),
        );
        assert_eq!(state.other_platform_position, Some((39.1, -76.6)));
    }

    #[test]
    fn test_static_overrides_replace_record_fields() {
        let overrides = StaticOverrides {
            position: Some((39.0, -76.0)),
            heading: Some(0.0),
        };
        let state = fuse(
            &TrackState::default(),
            record(r#"{"position": [12, 34], "heading": "270"}"#),
            &overrides,
        );
        assert_eq!(state.position, Some((39.0, -76.0)));
        assert_eq!(state.heading, Some(90.0));
    }

    #[test]
    fn test_shared_state_seeded_from_overrides() {
        let shared = SharedTrackState::new(StaticOverrides {
            position: Some((1.0, 2.0)),
            heading: Some(30.0),
        });
        let state = shared.snapshot();
        assert_eq!(state.position, Some((1.0, 2.0)));
        assert_eq!(state.heading, Some(60.0));
        assert!(shared.has_fix());
        assert!(!shared.needs_processing());
    }

    #[test]
    fn test_shared_state_consume_clears_flag() {
        let shared = SharedTrackState::new(StaticOverrides::default());
        shared.merge(record(r#"{"position": [1, 2], "heading": 0}"#));
        assert!(shared.needs_processing());

        let consumed = shared.consume();
        assert!(consumed.needs_processing);
        assert!(!shared.needs_processing());

        // Stale reuse reports the flag as cleared
        assert!(!shared.consume().needs_processing);
    }

    #[test]
    fn test_proposal_carried_through_merges() {
        let shared = SharedTrackState::new(StaticOverrides::default());
        shared.propose(Some(Action::new(30.0, 1.0)));
        let state = shared.merge(record(r#"{"rssi": -60}"#));
        assert_eq!(state.action_proposed, Some(Action::new(30.0, 1.0)));

        shared.propose(None);
        assert_eq!(shared.snapshot().action_proposed, None);
    }

    #[test]
    fn test_shared_state_concurrent_merges() {
        let shared = SharedTrackState::new(StaticOverrides::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let lat = i as f64 + j as f64 * 1e-4;
                        let json = format!(r#"{{"position": [{}, 0.0], "heading": 1}}"#, lat);
                        shared.merge(TelemetryRecord::from_json_slice(json.as_bytes()).unwrap());
                    }
                })
            })
            .collect();
        for _ in 0..50 {
            let state = shared.consume();
            if state.position.is_some() {
                assert_eq!(state.heading, Some(89.0));
            }
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(shared.snapshot().position.is_some());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_position() -> impl Strategy<Value = Option<LatLon>> {
            prop::option::of((-60.0f64..60.0, -170.0f64..170.0))
        }

        fn arb_record() -> impl Strategy<Value = TelemetryRecord> {
            (
                prop::option::of(-130.0f64..-20.0),
                arb_position(),
                prop::option::of(0.0f64..360.0),
            )
                .prop_map(|(rssi, position, yaw)| TelemetryRecord {
                    rssi,
                    position,
                    heading: yaw.and_then(serde_json::Number::from_f64).map(serde_json::Value::Number),
                    ..Default::default()
                })
        }

        fn arb_state() -> impl Strategy<Value = TrackState> {
            (arb_position(), prop::option::of(0.0f64..360.0), any::<bool>()).prop_map(
                |(position, heading, needs_processing)| TrackState {
                    position,
                    heading,
                    previous_position: Some((0.0, 0.0)),
                    previous_heading: Some(45.0),
                    needs_processing,
                    ..Default::default()
                },
            )
        }

        proptest! {
            #[test]
            fn test_previous_lags_last_consumed_tick(
                state in arb_state(),
                first in arb_record(),
                second in arb_record(),
            ) {
                let overrides = StaticOverrides::default();
                let consumed = TrackState { needs_processing: false, ..state.clone() };
                let a = fuse(&consumed, first, &overrides);
                let b = fuse(&a, second, &overrides);
                prop_assert_eq!(b.previous_position, consumed.position);
                prop_assert_eq!(b.previous_heading, consumed.heading);
            }

            #[test]
            fn test_action_taken_is_zero_iff_inputs_undefined(
                state in arb_state(),
                record in arb_record(),
            ) {
                let fused = fuse(&state, record, &StaticOverrides::default());
                let undefined = fused.heading.is_none()
                    || fused.previous_heading.is_none()
                    || fused.distance_traveled.is_none();
                if undefined {
                    prop_assert_eq!(fused.action_taken, Action::HOLD);
                } else {
                    prop_assert_eq!(fused.action_taken.distance, fused.distance_traveled.unwrap());
                }
                prop_assert!(fused.needs_processing);
            }

            #[test]
            fn test_static_position_always_wins(
                state in arb_state(),
                record in arb_record(),
                lat in -60.0f64..60.0,
                lon in -170.0f64..170.0,
            ) {
                let overrides = StaticOverrides { position: Some((lat, lon)), heading: None };
                let fused = fuse(&state, record, &overrides);
                prop_assert_eq!(fused.position, Some((lat, lon)));
            }

            #[test]
            fn test_heading_stays_in_range(state in arb_state(), record in arb_record()) {
                let fused = fuse(&state, record, &StaticOverrides::default());
                if let Some(heading) = fused.heading {
                    prop_assert!((0.0..360.0).contains(&heading));
                }
            }
        }
    }
}
