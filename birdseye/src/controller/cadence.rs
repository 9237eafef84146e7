//! Minimum step period enforcement.

use std::time::Duration;

use tokio::time::Instant;

/// Keeps consecutive estimator steps at least `period` apart.
///
/// The deadline is absolute (`previous step + period`), so a step that
/// overruns makes the next one start immediately without any catch-up.
#[derive(Debug, Clone)]
pub struct Cadence {
    period: Duration,
    last_step: Option<Instant>,
}

impl Cadence {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_step: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Deadline for the next step, `None` before the first.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_step.map(|last| last + self.period)
    }

    /// Sleep until the next step may start, then mark it started.
    ///
    /// Returns how long was spent waiting.
    pub async fn wait(&mut self) -> Duration {
        let before = Instant::now();
        if let Some(deadline) = self.deadline() {
            tokio::time::sleep_until(deadline).await;
        }
        let now = Instant::now();
        self.last_step = Some(now);
        now - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_step_does_not_wait() {
        let mut cadence = Cadence::new(Duration::from_secs(1));
        assert!(cadence.deadline().is_none());
        assert_eq!(cadence.wait().await, Duration::ZERO);
        assert!(cadence.deadline().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_work_waits_out_the_period() {
        let mut cadence = Cadence::new(Duration::from_secs(1));
        cadence.wait().await;
        tokio::time::advance(Duration::from_millis(300)).await;

        let start = Instant::now();
        let waited = cadence.wait().await;
        assert_eq!(waited, Duration::from_millis(700));
        assert_eq!(start.elapsed(), Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_starts_immediately_without_catch_up() {
        let mut cadence = Cadence::new(Duration::from_secs(1));
        cadence.wait().await;
        tokio::time::advance(Duration::from_millis(2500)).await;

        assert_eq!(cadence.wait().await, Duration::ZERO);
        // Next deadline counts from the late step, not the missed slots
        let start = Instant::now();
        assert_eq!(cadence.wait().await, Duration::from_secs(1));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
