//! Live view of a running tracker.
//!
//! The controller hands a [`TickSnapshot`] to a [`LiveView`] once per tick.
//! Publishing never blocks and never fails: the HTTP server keeps only the
//! most recent snapshot and renders it on its own task, and the tracking
//! animation encodes frames on a blocking worker. [`LiveViewSet`] feeds
//! several views at once.

mod animation;
mod render;
mod server;

pub use animation::{AnimationError, GifAnimation, ANIMATION_FILE};
pub use render::{render_frame, render_png};
pub use server::LiveViewServer;

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;

use crate::estimator::{Belief, Environment, SensorPose};
use crate::track::TrackState;

/// Particles per target included in a snapshot.
pub const SNAPSHOT_PARTICLES: usize = 500;

/// Everything the live view needs to draw one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSnapshot {
    pub tick: u64,
    pub utc_time: f64,
    pub state: TrackState,
    pub sensor: SensorPose,
    pub belief: Belief,
    /// Downsampled `(east, north)` particle positions per target.
    pub particles: Vec<Vec<(f64, f64)>>,
    /// Companion platform in the local frame, if known.
    pub other_platform: Option<(f64, f64)>,
    /// Half-width of the rendered map, metres.
    pub map_extent: f64,
}

impl TickSnapshot {
    /// Capture the estimator and fused state after a tick.
    pub fn capture(
        tick: u64,
        utc_time: f64,
        state: &TrackState,
        env: &dyn Environment,
        map_extent: f64,
    ) -> Self {
        let particles = (0..env.n_targets())
            .map(|t| {
                env.particles(t)
                    .downsample(SNAPSHOT_PARTICLES)
                    .into_iter()
                    .map(|p| (p[0], p[1]))
                    .collect()
            })
            .collect();
        let other_platform = env
            .frame()
            .zip(state.other_platform_position)
            .map(|(frame, position)| frame.to_local(position));

        Self {
            tick,
            utc_time,
            state: state.clone(),
            sensor: env.sensor_pose(),
            belief: env.belief(),
            particles,
            other_platform,
            map_extent,
        }
    }
}

/// Errors starting the live view server.
#[derive(Debug, thiserror::Error)]
pub enum LiveViewError {
    #[error("Failed to bind live view on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read live view address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Best-effort consumer of per-tick snapshots.
pub trait LiveView: Send + Sync {
    /// Hand over the latest snapshot. Must return immediately.
    fn publish(&self, snapshot: TickSnapshot);

    /// Address the view is served on, if any.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Live view that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLiveView;

impl LiveView for NoopLiveView {
    fn publish(&self, _snapshot: TickSnapshot) {}
}

/// Publishes every snapshot to each of its views.
pub struct LiveViewSet {
    views: Vec<Arc<dyn LiveView>>,
}

impl LiveViewSet {
    pub fn new(views: Vec<Arc<dyn LiveView>>) -> Self {
        Self { views }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

impl LiveView for LiveViewSet {
    fn publish(&self, snapshot: TickSnapshot) {
        if let Some((last, rest)) = self.views.split_last() {
            for view in rest {
                view.publish(snapshot.clone());
            }
            last.publish(snapshot);
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.views.iter().find_map(|view| view.local_addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collecting {
        ticks: Mutex<Vec<u64>>,
        addr: Option<SocketAddr>,
    }

    impl LiveView for Collecting {
        fn publish(&self, snapshot: TickSnapshot) {
            self.ticks.lock().push(snapshot.tick);
        }

        fn local_addr(&self) -> Option<SocketAddr> {
            self.addr
        }
    }

    fn snapshot(tick: u64) -> TickSnapshot {
        TickSnapshot {
            tick,
            utc_time: 0.0,
            state: TrackState::default(),
            sensor: SensorPose::default(),
            belief: Belief::default(),
            particles: vec![],
            other_platform: None,
            map_extent: 50.0,
        }
    }

    #[test]
    fn test_set_publishes_to_every_view() {
        let first = Arc::new(Collecting::default());
        let second = Arc::new(Collecting {
            addr: Some("127.0.0.1:4999".parse().unwrap()),
            ..Default::default()
        });
        let views: Vec<Arc<dyn LiveView>> = vec![first.clone(), second.clone()];
        let set = LiveViewSet::new(views);

        set.publish(snapshot(1));
        set.publish(snapshot(2));

        assert_eq!(*first.ticks.lock(), vec![1, 2]);
        assert_eq!(*second.ticks.lock(), vec![1, 2]);
        assert_eq!(set.local_addr(), second.addr);
    }

    #[test]
    fn test_empty_set_is_silent() {
        let set = LiveViewSet::new(Vec::new());
        assert!(set.is_empty());
        set.publish(snapshot(0));
        assert_eq!(set.local_addr(), None);
    }
}
