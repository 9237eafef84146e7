//! Cadence controller - the tracker's control loop.
//!
//! # Phases
//!
//! ```text
//! WaitingForFix --(position and heading known)--> Running --> Terminated
//! ```
//!
//! While waiting for a fix the controller polls every `fix_poll_interval`
//! and makes no estimator progress. Each running tick:
//!
//! 1. takes the next record (replay) or the latest fused state (live)
//! 2. every `horizon` ticks, either detects that all targets are localised
//!    or asks the planner for exactly `horizon` actions; in between, one
//!    queued action is consumed per tick
//! 3. waits out the minimum step period
//! 4. steps the estimator
//! 5. appends the run log and writes particle snapshots
//! 6. publishes to the live view (never blocks)
//!
//! The run ends when the source is exhausted, when all targets are
//! localised, or when the shutdown token is cancelled. Persistence failures
//! end it with an error.

mod cadence;

pub use cadence::Cadence;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::estimator::{targets_found, Environment};
use crate::live_view::{LiveView, TickSnapshot};
use crate::persistence::{Persistence, PersistenceError, TickRecord};
use crate::planner::Planner;
use crate::telemetry::TelemetrySource;
use crate::time::unix_now;
use crate::track::{Action, SharedTrackState};

/// Errors that stop the control loop.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Tick {tick} could not be recorded: {source}")]
    Persistence {
        tick: u64,
        #[source]
        source: PersistenceError,
    },
}

/// Control loop tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Minimum time between estimator steps.
    pub step_duration: Duration,
    /// Ticks between planner invocations.
    pub horizon: usize,
    /// Localisation precision for the termination check, metres.
    pub min_std_dev: f64,
    /// Poll period while waiting for a fix.
    pub fix_poll_interval: Duration,
    /// Half-width of the live view map, metres.
    pub map_extent: f64,
}

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerPhase {
    WaitingForFix,
    Running,
    Terminated,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The telemetry source has nothing more.
    SourceExhausted,
    /// Every target was localised and the action queue drained.
    TargetsLocalized,
    /// Shutdown was requested.
    Cancelled,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks fully processed and recorded.
    pub ticks: u64,
    pub planner_invocations: u64,
    pub termination: Termination,
}

/// Drives the tracker one tick at a time.
pub struct CadenceController {
    config: ControllerConfig,
    fusion: SharedTrackState,
    source: Box<dyn TelemetrySource>,
    env: Box<dyn Environment>,
    planner: Option<Box<dyn Planner>>,
    persistence: Box<dyn Persistence>,
    live_view: Arc<dyn LiveView>,
    shutdown: CancellationToken,
    cadence: Cadence,
    pending: VecDeque<Action>,
    phase: ControllerPhase,
    ticks: u64,
    planner_invocations: u64,
}

impl CadenceController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ControllerConfig,
        fusion: SharedTrackState,
        source: Box<dyn TelemetrySource>,
        env: Box<dyn Environment>,
        planner: Option<Box<dyn Planner>>,
        persistence: Box<dyn Persistence>,
        live_view: Arc<dyn LiveView>,
        shutdown: CancellationToken,
    ) -> Self {
        let cadence = Cadence::new(config.step_duration);
        Self {
            config,
            fusion,
            source,
            env,
            planner,
            persistence,
            live_view,
            shutdown,
            cadence,
            pending: VecDeque::new(),
            phase: ControllerPhase::WaitingForFix,
            ticks: 0,
            planner_invocations: 0,
        }
    }

    /// Run until termination.
    pub async fn run(mut self) -> Result<RunSummary, ControllerError> {
        let belief = self.env.reset();
        debug!(targets = belief.targets.len(), "Initial belief");

        let carry_fix = match self.wait_for_fix().await {
            Ok(carry_fix) => carry_fix,
            Err(termination) => return self.finish(termination),
        };

        self.set_phase(ControllerPhase::Running);
        let termination = self.run_ticks(carry_fix).await?;
        self.finish(termination)
    }

    /// Poll until position and heading are known.
    ///
    /// Returns whether the record that completed the fix is still
    /// unprocessed and should be used by the first tick.
    async fn wait_for_fix(&mut self) -> Result<bool, Termination> {
        loop {
            if self.shutdown.is_cancelled() {
                return Err(Termination::Cancelled);
            }

            let merged = match self.source.next() {
                Some(record) => {
                    self.fusion.merge(record);
                    true
                }
                None if !self.source.has_more() => return Err(Termination::SourceExhausted),
                None => false,
            };

            if self.fusion.has_fix() {
                let state = self.fusion.snapshot();
                info!(position = ?state.position, heading = ?state.heading, "Position fix acquired");
                return Ok(merged);
            }

            if merged {
                // Pre-fix records are folded into "previous" and skipped
                self.fusion.consume();
            }

            info!("Waiting for GPS...");
            tokio::select! {
                _ = self.shutdown.cancelled() => return Err(Termination::Cancelled),
                _ = tokio::time::sleep(self.config.fix_poll_interval) => {}
            }
        }
    }

    async fn run_ticks(&mut self, mut carry_fix: bool) -> Result<Termination, ControllerError> {
        let horizon = self.config.horizon.max(1);

        loop {
            let loop_start = Instant::now();
            if self.shutdown.is_cancelled() {
                return Ok(Termination::Cancelled);
            }
            let tick = self.ticks;
            let utc_time = unix_now();

            // 1. Telemetry
            if carry_fix {
                carry_fix = false;
            } else {
                match self.source.next() {
                    Some(record) => {
                        self.fusion.merge(record);
                    }
                    None if !self.source.has_more() => return Ok(Termination::SourceExhausted),
                    None => {}
                }
            }

            // 2. Action selection
            let action_start = Instant::now();
            let mut localized = false;
            if self.planner.is_some() {
                if tick % horizon as u64 == 0 {
                    if targets_found(self.env.as_ref(), self.config.min_std_dev) {
                        info!(tick, "All targets localized");
                        localized = true;
                    } else {
                        self.plan(horizon);
                    }
                }
                let proposal = if localized {
                    None
                } else {
                    self.pending.pop_front()
                };
                self.fusion.propose(proposal);
            }
            let state = self.fusion.consume();
            if !state.needs_processing {
                debug!(tick, "No new telemetry, reusing last state");
            }
            let action_elapsed = action_start.elapsed();

            // 3. Cadence
            let waited = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(Termination::Cancelled),
                waited = self.cadence.wait() => waited,
            };

            // 4. Estimator
            let step_start = Instant::now();
            let observation = self.env.step(&state);
            let step_elapsed = step_start.elapsed();

            // 5. Persistence
            let data_start = Instant::now();
            let record = TickRecord {
                state: state.clone(),
                utc_time,
            };
            self.persistence
                .append(&record)
                .map_err(|source| ControllerError::Persistence { tick, source })?;
            let data_elapsed = data_start.elapsed();

            let particle_start = Instant::now();
            for t in 0..self.env.n_targets() {
                self.persistence
                    .snapshot(utc_time, t, self.env.particles(t))
                    .map_err(|source| ControllerError::Persistence { tick, source })?;
            }
            let particle_elapsed = particle_start.elapsed();

            // 6. Live view
            let publish_start = Instant::now();
            self.live_view.publish(TickSnapshot::capture(
                tick,
                utc_time,
                &state,
                self.env.as_ref(),
                self.config.map_extent,
            ));
            let publish_elapsed = publish_start.elapsed();

            self.ticks += 1;
            debug!(
                tick,
                rssi = ?observation.rssi,
                action_ms = as_ms(action_elapsed),
                wait_ms = as_ms(waited),
                step_ms = as_ms(step_elapsed),
                particle_save_ms = as_ms(particle_elapsed),
                data_save_ms = as_ms(data_elapsed),
                publish_ms = as_ms(publish_elapsed),
                loop_ms = as_ms(loop_start.elapsed()),
                "Tick timing"
            );

            if localized && self.pending.is_empty() {
                return Ok(Termination::TargetsLocalized);
            }
        }
    }

    /// Ask the planner for exactly `horizon` actions and queue them.
    fn plan(&mut self, horizon: usize) {
        let Some(planner) = self.planner.as_mut() else {
            return;
        };
        let started = Instant::now();
        let mut actions = planner.get_action(self.env.as_ref());
        self.planner_invocations += 1;

        if actions.len() != horizon {
            warn!(
                expected = horizon,
                got = actions.len(),
                method = %planner.method(),
                "Planner returned wrong number of actions, padding with hold"
            );
            actions.resize(horizon, Action::HOLD);
        }
        debug!(
            method = %planner.method(),
            plan_ms = as_ms(started.elapsed()),
            actions = ?actions,
            "Planned actions"
        );
        self.pending.extend(actions);
    }

    fn finish(mut self, termination: Termination) -> Result<RunSummary, ControllerError> {
        self.persistence
            .flush()
            .map_err(|source| ControllerError::Persistence {
                tick: self.ticks,
                source,
            })?;
        self.set_phase(ControllerPhase::Terminated);

        let summary = RunSummary {
            ticks: self.ticks,
            planner_invocations: self.planner_invocations,
            termination,
        };
        info!(
            ticks = summary.ticks,
            planner_invocations = summary.planner_invocations,
            termination = ?summary.termination,
            "Run finished"
        );
        Ok(summary)
    }

    fn set_phase(&mut self, phase: ControllerPhase) {
        debug!(from = ?self.phase, to = ?phase, "Controller phase change");
        self.phase = phase;
    }
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{Observation, ParticleSet, SensorPose};
    use crate::geo::LocalFrame;
    use crate::live_view::NoopLiveView;
    use crate::planner::PlannerMethod;
    use crate::telemetry::SourceMode;
    use crate::track::{StaticOverrides, TelemetryRecord, TrackState};
    use parking_lot::Mutex;

    // ==================== Test doubles ====================

    struct ScriptedSource {
        records: VecDeque<TelemetryRecord>,
        live: bool,
    }

    impl ScriptedSource {
        fn replay(records: Vec<TelemetryRecord>) -> Self {
            Self {
                records: records.into(),
                live: false,
            }
        }

        fn live() -> Self {
            Self {
                records: VecDeque::new(),
                live: true,
            }
        }
    }

    impl TelemetrySource for ScriptedSource {
        fn next(&mut self) -> Option<TelemetryRecord> {
            self.records.pop_front()
        }

        fn has_more(&self) -> bool {
            self.live || !self.records.is_empty()
        }

        fn mode(&self) -> SourceMode {
            if self.live {
                SourceMode::Live
            } else {
                SourceMode::Replay
            }
        }
    }

    #[derive(Default)]
    struct Probe {
        step_times: Vec<tokio::time::Instant>,
        stepped_states: Vec<TrackState>,
    }

    struct FakeEnvironment {
        targets: Vec<ParticleSet>,
        probe: Arc<Mutex<Probe>>,
    }

    impl FakeEnvironment {
        fn new(n_targets: usize, spread: f64, probe: Arc<Mutex<Probe>>) -> Self {
            let cloud = ParticleSet::new(vec![[-spread, -spread, 0.0, 0.0], [spread, spread, 0.0, 0.0]]);
            Self {
                targets: vec![cloud; n_targets],
                probe,
            }
        }
    }

    impl Environment for FakeEnvironment {
        fn reset(&mut self) -> crate::estimator::Belief {
            self.belief()
        }

        fn step(&mut self, state: &TrackState) -> Observation {
            let mut probe = self.probe.lock();
            probe.step_times.push(tokio::time::Instant::now());
            probe.stepped_states.push(state.clone());
            Observation {
                rssi: state.signal_strength,
                detected: state.signal_strength.is_some(),
            }
        }

        fn n_targets(&self) -> usize {
            self.targets.len()
        }

        fn particles(&self, target: usize) -> &ParticleSet {
            &self.targets[target]
        }

        fn sensor_pose(&self) -> SensorPose {
            SensorPose::default()
        }

        fn frame(&self) -> Option<LocalFrame> {
            None
        }

        fn expected_rssi(&self, _target: usize, _pose: &SensorPose, _at: (f64, f64)) -> f64 {
            -60.0
        }
    }

    struct CountingPlanner {
        plan: Vec<Action>,
        calls: Arc<Mutex<u64>>,
    }

    impl Planner for CountingPlanner {
        fn get_action(&mut self, _env: &dyn Environment) -> Vec<Action> {
            let mut calls = self.calls.lock();
            *calls += 1;
            // Tag each action with the invocation number
            self.plan
                .iter()
                .map(|a| Action::new(a.heading_delta, *calls as f64))
                .collect()
        }

        fn method(&self) -> PlannerMethod {
            PlannerMethod::Repp
        }
    }

    #[derive(Default)]
    struct Recorded {
        records: Vec<TickRecord>,
        snapshots: Vec<(f64, usize)>,
        flushes: u32,
    }

    struct MemoryPersistence {
        recorded: Arc<Mutex<Recorded>>,
        fail_on_append: Option<usize>,
        fail_on_snapshot: Option<usize>,
    }

    impl Persistence for MemoryPersistence {
        fn append(&mut self, record: &TickRecord) -> Result<(), PersistenceError> {
            let mut recorded = self.recorded.lock();
            if self.fail_on_append == Some(recorded.records.len()) {
                return Err(PersistenceError::Append {
                    path: "memory".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            recorded.records.push(record.clone());
            Ok(())
        }

        fn snapshot(
            &mut self,
            utc_time: f64,
            target: usize,
            _particles: &ParticleSet,
        ) -> Result<(), PersistenceError> {
            let mut recorded = self.recorded.lock();
            if self.fail_on_snapshot == Some(recorded.snapshots.len()) {
                return Err(PersistenceError::Snapshot {
                    path: format!("memory/target{target}").into(),
                    source: std::io::Error::other("read-only filesystem").into(),
                });
            }
            recorded.snapshots.push((utc_time, target));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), PersistenceError> {
            self.recorded.lock().flushes += 1;
            Ok(())
        }
    }

    // ==================== Harness ====================

    struct Harness {
        probe: Arc<Mutex<Probe>>,
        recorded: Arc<Mutex<Recorded>>,
        planner_calls: Arc<Mutex<u64>>,
        shutdown: CancellationToken,
    }

    struct Setup {
        source: ScriptedSource,
        overrides: StaticOverrides,
        spread: f64,
        planner_plan: Option<Vec<Action>>,
        horizon: usize,
        fail_on_append: Option<usize>,
        fail_on_snapshot: Option<usize>,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                source: ScriptedSource::replay(Vec::new()),
                overrides: StaticOverrides::default(),
                spread: 500.0,
                planner_plan: None,
                horizon: 1,
                fail_on_append: None,
                fail_on_snapshot: None,
            }
        }
    }

    fn config(horizon: usize) -> ControllerConfig {
        ControllerConfig {
            step_duration: Duration::from_secs(1),
            horizon,
            min_std_dev: 35.0,
            fix_poll_interval: Duration::from_secs(1),
            map_extent: 200.0,
        }
    }

    fn build(setup: Setup) -> (CadenceController, Harness) {
        let probe = Arc::new(Mutex::new(Probe::default()));
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let planner_calls = Arc::new(Mutex::new(0));
        let shutdown = CancellationToken::new();

        let planner = setup.planner_plan.map(|plan| {
            Box::new(CountingPlanner {
                plan,
                calls: Arc::clone(&planner_calls),
            }) as Box<dyn Planner>
        });

        let controller = CadenceController::new(
            config(setup.horizon),
            SharedTrackState::new(setup.overrides),
            Box::new(setup.source),
            Box::new(FakeEnvironment::new(2, setup.spread, Arc::clone(&probe))),
            planner,
            Box::new(MemoryPersistence {
                recorded: Arc::clone(&recorded),
                fail_on_append: setup.fail_on_append,
                fail_on_snapshot: setup.fail_on_snapshot,
            }),
            Arc::new(NoopLiveView),
            shutdown.clone(),
        );

        (
            controller,
            Harness {
                probe,
                recorded,
                planner_calls,
                shutdown,
            },
        )
    }

    fn fix_record(i: usize) -> TelemetryRecord {
        TelemetryRecord {
            rssi: Some(-60.0 - i as f64),
            position: Some((39.0, -76.0 + i as f64 * 1e-5)),
            heading: Some(serde_json::json!(i.to_string())),
            ..Default::default()
        }
    }

    fn fix_records(n: usize) -> Vec<TelemetryRecord> {
        (0..n).map(fix_record).collect()
    }

    // ==================== Termination ====================

    #[tokio::test(start_paused = true)]
    async fn test_replay_exhaustion_terminates_after_every_record() {
        let (controller, harness) = build(Setup {
            source: ScriptedSource::replay(fix_records(5)),
            ..Default::default()
        });

        let summary = controller.run().await.unwrap();
        assert_eq!(summary.termination, Termination::SourceExhausted);
        assert_eq!(summary.ticks, 5);

        let recorded = harness.recorded.lock();
        assert_eq!(recorded.records.len(), 5);
        assert_eq!(recorded.snapshots.len(), 10);
        assert_eq!(recorded.flushes, 1);
        let rssi: Vec<_> = recorded
            .records
            .iter()
            .map(|r| r.state.signal_strength.unwrap())
            .collect();
        assert_eq!(rssi, vec![-60.0, -61.0, -62.0, -63.0, -64.0]);
        assert!(recorded.records.iter().all(|r| r.state.needs_processing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_replay_terminates_without_ticks() {
        let (controller, harness) = build(Setup::default());
        let summary = controller.run().await.unwrap();
        assert_eq!(summary.termination, Termination::SourceExhausted);
        assert_eq!(summary.ticks, 0);
        assert_eq!(harness.recorded.lock().flushes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_localized_targets_terminate_with_sentinel() {
        let (controller, harness) = build(Setup {
            source: ScriptedSource::replay(fix_records(10)),
            spread: 1.0,
            planner_plan: Some(vec![Action::new(30.0, 1.0)]),
            ..Default::default()
        });

        let summary = controller.run().await.unwrap();
        assert_eq!(summary.termination, Termination::TargetsLocalized);
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.planner_invocations, 0);

        let recorded = harness.recorded.lock();
        assert_eq!(recorded.records.len(), 1);
        assert_eq!(recorded.records[0].state.action_proposed, None);
        assert_eq!(recorded.flushes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_finishes_cleanly() {
        let (controller, harness) = build(Setup {
            source: ScriptedSource::live(),
            overrides: StaticOverrides {
                position: Some((39.0, -76.0)),
                heading: Some(0.0),
            },
            ..Default::default()
        });

        let shutdown = harness.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(4500)).await;
            shutdown.cancel();
        });

        let summary = controller.run().await.unwrap();
        assert_eq!(summary.termination, Termination::Cancelled);
        // Steps at t = 0, 1, 2, 3, 4
        assert_eq!(summary.ticks, 5);
        assert_eq!(harness.recorded.lock().flushes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistence_failure_is_fatal() {
        let (controller, harness) = build(Setup {
            source: ScriptedSource::replay(fix_records(5)),
            fail_on_append: Some(2),
            ..Default::default()
        });

        let err = controller.run().await.unwrap_err();
        let ControllerError::Persistence { tick, .. } = err;
        assert_eq!(tick, 2);
        assert_eq!(harness.recorded.lock().records.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_failure_stops_mid_tick() {
        // Two targets: snapshots 0 and 1 belong to tick 0, 2 and 3 to tick 1
        let (controller, harness) = build(Setup {
            source: ScriptedSource::replay(fix_records(5)),
            fail_on_snapshot: Some(3),
            ..Default::default()
        });

        let err = controller.run().await.unwrap_err();
        let ControllerError::Persistence { tick, ref source } = err;
        assert_eq!(tick, 1);
        assert!(matches!(source, PersistenceError::Snapshot { .. }));

        let recorded = harness.recorded.lock();
        // Tick 1 was logged and its first target saved before the failure
        assert_eq!(recorded.records.len(), 2);
        assert_eq!(recorded.snapshots.len(), 3);
        assert_eq!(recorded.flushes, 0);
        assert_eq!(harness.probe.lock().step_times.len(), 2);
    }

    // ==================== Waiting for fix ====================

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_position_and_heading() {
        let mut records = vec![
            TelemetryRecord {
                rssi: Some(-90.0),
                ..Default::default()
            },
            TelemetryRecord {
                position: Some((39.0, -76.0)),
                ..Default::default()
            },
        ];
        records.extend(fix_records(3));
        let (controller, harness) = build(Setup {
            source: ScriptedSource::replay(records),
            ..Default::default()
        });

        let start = tokio::time::Instant::now();
        let summary = controller.run().await.unwrap();
        assert_eq!(summary.ticks, 3);

        let probe = harness.probe.lock();
        // Two polls without a fix before the first step
        assert_eq!(probe.step_times[0] - start, Duration::from_secs(2));
        assert!(probe.stepped_states.iter().all(|s| s.has_fix()));
        assert_eq!(probe.stepped_states[0].signal_strength, Some(-60.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_mode_reuses_stale_state() {
        let (controller, harness) = build(Setup {
            source: ScriptedSource::live(),
            overrides: StaticOverrides {
                position: Some((39.0, -76.0)),
                heading: Some(90.0),
            },
            ..Default::default()
        });
        let shutdown = harness.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            shutdown.cancel();
        });

        controller.run().await.unwrap();
        let probe = harness.probe.lock();
        assert_eq!(probe.stepped_states.len(), 3);
        assert!(probe.stepped_states.iter().all(|s| !s.needs_processing));
        assert!(probe.stepped_states.iter().all(|s| s.heading == Some(0.0)));
    }

    // ==================== Cadence ====================

    #[tokio::test(start_paused = true)]
    async fn test_steps_never_closer_than_step_duration() {
        let (controller, harness) = build(Setup {
            source: ScriptedSource::replay(fix_records(100)),
            ..Default::default()
        });

        let summary = controller.run().await.unwrap();
        assert_eq!(summary.ticks, 100);

        let probe = harness.probe.lock();
        assert_eq!(probe.step_times.len(), 100);
        for pair in probe.step_times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
        let total = *probe.step_times.last().unwrap() - probe.step_times[0];
        assert_eq!(total, Duration::from_secs(99));
    }

    // ==================== Planning ====================

    #[tokio::test(start_paused = true)]
    async fn test_planner_invoked_once_per_horizon() {
        let (controller, harness) = build(Setup {
            source: ScriptedSource::replay(fix_records(10)),
            planner_plan: Some(vec![
                Action::new(-30.0, 0.0),
                Action::new(0.0, 0.0),
                Action::new(30.0, 0.0),
            ]),
            horizon: 3,
            ..Default::default()
        });

        let summary = controller.run().await.unwrap();
        assert_eq!(summary.ticks, 10);
        assert_eq!(summary.planner_invocations, 4);
        assert_eq!(*harness.planner_calls.lock(), 4);

        let recorded = harness.recorded.lock();
        let proposals: Vec<Action> = recorded
            .records
            .iter()
            .map(|r| r.state.action_proposed.unwrap())
            .collect();
        let expected: Vec<Action> = (0..10)
            .map(|i| Action::new([-30.0, 0.0, 30.0][i % 3], (i / 3 + 1) as f64))
            .collect();
        assert_eq!(proposals, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_plan_is_padded_with_hold() {
        let (controller, harness) = build(Setup {
            source: ScriptedSource::replay(fix_records(4)),
            planner_plan: Some(vec![Action::new(30.0, 0.0)]),
            horizon: 2,
            ..Default::default()
        });

        let summary = controller.run().await.unwrap();
        assert_eq!(summary.planner_invocations, 2);

        let recorded = harness.recorded.lock();
        let proposals: Vec<Action> = recorded
            .records
            .iter()
            .map(|r| r.state.action_proposed.unwrap())
            .collect();
        assert_eq!(
            proposals,
            vec![
                Action::new(30.0, 1.0),
                Action::HOLD,
                Action::new(30.0, 2.0),
                Action::HOLD
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_planner_leaves_proposal_empty() {
        let (controller, harness) = build(Setup {
            source: ScriptedSource::replay(fix_records(3)),
            spread: 1.0,
            ..Default::default()
        });
        let summary = controller.run().await.unwrap();
        // Localisation only ends runs that plan
        assert_eq!(summary.termination, Termination::SourceExhausted);
        assert!(harness
            .recorded
            .lock()
            .records
            .iter()
            .all(|r| r.state.action_proposed.is_none()));
    }
}
