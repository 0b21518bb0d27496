//! Watch-progress reporting
//!
//! The playback clock ticks several times per second; the backend only needs
//! a position every few seconds. [`ProgressReporter`] samples every tick and
//! lets a report through once the interval since the previous one has
//! elapsed. Sending is best effort: failures are logged and forgotten.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::backend::ProgressSink;
use crate::models::{watched_percent, ProgressSample};

/// Default minimum time between two reports
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Default watched percentage at which an episode counts as completed
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 80.0;

/// Throttles playback-clock samples into progress reports
#[derive(Debug)]
pub struct ProgressReporter {
    episode_id: u64,
    interval: Duration,
    completion_threshold: f64,
    last_emit: Instant,
    last_position: f64,
    last_duration: f64,
    paused: bool,
}

impl ProgressReporter {
    /// Create a reporter; the first interval starts now
    pub fn new(episode_id: u64) -> Self {
        Self::with_settings(episode_id, DEFAULT_INTERVAL, DEFAULT_COMPLETION_THRESHOLD)
    }

    pub fn with_settings(episode_id: u64, interval: Duration, completion_threshold: f64) -> Self {
        Self {
            episode_id,
            interval,
            completion_threshold,
            last_emit: Instant::now(),
            last_position: 0.0,
            last_duration: 0.0,
            paused: false,
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Forget the clock state of a detached session
    ///
    /// The throttle window carries over, so a quick switch does not trigger
    /// an immediate report.
    pub fn reset_session(&mut self) {
        self.paused = false;
        self.last_position = 0.0;
        self.last_duration = 0.0;
    }

    /// Sample one clock tick at `now`
    ///
    /// Returns a report when playing and strictly more than the interval
    /// has passed since the last one.
    pub fn sample(&mut self, now: Instant, position: f64, duration: f64) -> Option<ProgressSample> {
        self.last_position = position;
        self.last_duration = duration;

        if self.paused {
            return None;
        }
        if now.saturating_duration_since(self.last_emit) <= self.interval {
            return None;
        }

        self.last_emit = now;
        Some(self.build(position, duration, false))
    }

    /// Final report when playback ends, regardless of throttling
    ///
    /// Uses the clock values of the most recent tick.
    pub fn finish(&mut self, now: Instant) -> ProgressSample {
        self.last_emit = now;
        self.build(self.last_position, self.last_duration, true)
    }

    fn build(&self, position: f64, duration: f64, ended: bool) -> ProgressSample {
        let completed = ended || watched_percent(position, duration) >= self.completion_threshold;
        ProgressSample {
            episode_id: self.episode_id,
            position_seconds: position.max(0.0),
            duration_seconds: duration.max(0.0),
            completed,
        }
    }
}

/// Send a report, logging instead of failing
pub async fn emit(sink: &dyn ProgressSink, sample: ProgressSample) {
    match sink.report(&sample).await {
        Ok(()) => tracing::debug!(%sample, "progress reported"),
        Err(e) => tracing::warn!(%sample, error = %e, "progress report failed"),
    }
}

/// Send a report without holding up the caller
///
/// The handle may be awaited to make sure the report went out.
pub fn emit_detached(sink: Arc<dyn ProgressSink>, sample: ProgressSample) -> JoinHandle<()> {
    tokio::spawn(async move {
        emit(sink.as_ref(), sample).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ticks(
        reporter: &mut ProgressReporter,
        start: Instant,
        step: Duration,
        total: Duration,
    ) -> usize {
        let mut emitted = 0;
        let mut elapsed = step;
        while elapsed <= total {
            let position = elapsed.as_secs_f64();
            if reporter.sample(start + elapsed, position, 1440.0).is_some() {
                emitted += 1;
            }
            elapsed += step;
        }
        emitted
    }

    #[tokio::test(start_paused = true)]
    async fn test_twelve_seconds_emit_twice() {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(1);
        let emitted = run_ticks(
            &mut reporter,
            start,
            Duration::from_millis(250),
            Duration::from_secs(12),
        );
        assert_eq!(emitted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_second_ticks_emit_twice() {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(1);
        let emitted = run_ticks(
            &mut reporter,
            start,
            Duration::from_secs(1),
            Duration::from_secs(12),
        );
        assert_eq!(emitted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_interval_is_not_enough() {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(1);
        assert!(reporter.sample(start + Duration::from_secs(5), 5.0, 100.0).is_none());
        assert!(reporter
            .sample(start + Duration::from_millis(5001), 5.0, 100.0)
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_never_reports() {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(1);
        reporter.set_paused(true);
        let emitted = run_ticks(
            &mut reporter,
            start,
            Duration::from_secs(1),
            Duration::from_secs(30),
        );
        assert_eq!(emitted, 0);

        reporter.set_paused(false);
        assert!(reporter
            .sample(start + Duration::from_secs(31), 31.0, 100.0)
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_session_clears_pause_and_clock() {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(1);
        reporter.set_paused(true);
        assert!(reporter
            .sample(start + Duration::from_secs(2), 700.0, 1000.0)
            .is_none());

        reporter.reset_session();
        assert!(!reporter.is_paused());
        let sample = reporter.finish(start + Duration::from_secs(3));
        assert_eq!(sample.position_seconds, 0.0);
        assert_eq!(sample.duration_seconds, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_threshold() {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(9);

        let sample = reporter
            .sample(start + Duration::from_secs(6), 790.0, 1000.0)
            .unwrap();
        assert!(!sample.completed);

        let sample = reporter
            .sample(start + Duration::from_secs(12), 800.0, 1000.0)
            .unwrap();
        assert!(sample.completed);
        assert_eq!(sample.episode_id, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_forces_completed_report() {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(1);
        assert!(reporter
            .sample(start + Duration::from_secs(1), 10.0, 100.0)
            .is_none());
        let sample = reporter.finish(start + Duration::from_secs(1));
        assert!(sample.completed);
        assert_eq!(sample.position_seconds, 10.0);
        assert_eq!(sample.duration_seconds, 100.0);
        // The forced report restarts the interval
        assert!(reporter
            .sample(start + Duration::from_secs(4), 13.0, 100.0)
            .is_none());
    }
}
