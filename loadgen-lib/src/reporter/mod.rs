//! Progress reporting while a run is in flight.

use std::time::Duration;

use crate::{config::RunContext, scheduler::RunOutcome};

mod human;
mod json;

pub use self::{human::HumanProgressSink, json::JsonlProgressSink};

/// Default cadence at which progress is reported.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Receives the progress notifications of a run.
pub trait ProgressSink: Send + Sync + 'static {
    fn on_progress(&mut self, progress: &ProgressSnapshot);
    fn finish(&mut self, run: &RunOutcome);
}

/// Point in time view on a running load test.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub elapsed: Duration,
    pub remaining: Duration,
    /// requests sent so far
    pub dispatched: u64,
    /// requests for which an outcome was recorded
    pub completed: usize,
    pub successful: usize,
    /// dispatched requests per second of elapsed run time
    pub rate: f64,
    /// percentage of completed requests which succeeded
    pub success_rate: f64,
}

impl ProgressSnapshot {
    /// Read-only capture of the given run at `elapsed` run time.
    pub fn capture(ctx: &RunContext, elapsed: Duration) -> Self {
        let dispatched = ctx.dispatched();
        let counts = ctx.log().counts();

        let elapsed_secs = elapsed.as_secs_f64();
        let rate = if elapsed_secs > 0. {
            dispatched as f64 / elapsed_secs
        } else {
            0.
        };
        let success_rate = if counts.total > 0 {
            counts.successful as f64 / counts.total as f64 * 100.
        } else {
            0.
        };

        Self {
            elapsed,
            remaining: ctx.config().duration().saturating_sub(elapsed),
            dispatched,
            completed: counts.total,
            successful: counts.successful,
            rate,
            success_rate,
        }
    }
}

/// Emits a [`ProgressSnapshot`] to its sink once every interval of run time.
pub struct ProgressReporter {
    interval: Duration,
    last_report: Duration,
    sink: Box<dyn ProgressSink>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("interval", &self.interval)
            .field("last_report", &self.last_report)
            .finish()
    }
}

impl ProgressReporter {
    pub fn new(interval: Duration, sink: impl ProgressSink) -> Self {
        Self::new_boxed(interval, Box::new(sink))
    }

    pub fn new_boxed(interval: Duration, sink: Box<dyn ProgressSink>) -> Self {
        Self {
            interval,
            last_report: Duration::ZERO,
            sink,
        }
    }

    /// Report progress if at least one interval passed since the previous report.
    ///
    /// Returns whether a report was emitted.
    pub fn maybe_report(&mut self, ctx: &RunContext, elapsed: Duration) -> bool {
        if self.interval.is_zero() || elapsed.saturating_sub(self.last_report) < self.interval {
            return false;
        }
        self.last_report = elapsed;

        let progress = ProgressSnapshot::capture(ctx, elapsed);
        self.sink.on_progress(&progress);
        true
    }

    pub fn finish(&mut self, run: &RunOutcome) {
        self.sink.finish(run);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::{config::RunConfig, outcome::RequestOutcome};

    /// Sink remembering everything it was handed.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingSink {
        pub(crate) progress: Arc<Mutex<Vec<ProgressSnapshot>>>,
        pub(crate) finished: Arc<Mutex<Option<RunOutcome>>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_progress(&mut self, progress: &ProgressSnapshot) {
            self.progress.lock().push(progress.clone());
        }

        fn finish(&mut self, run: &RunOutcome) {
            *self.finished.lock() = Some(run.clone());
        }
    }

    /// In-memory writer for testing the console sinks.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct SharedBuffer(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn test_ctx(duration_secs: u64, rate: f64) -> RunContext {
        RunContext::new(
            RunConfig::try_new(
                "http://localhost:8080",
                Duration::from_secs(duration_secs),
                rate,
            )
            .unwrap(),
        )
    }

    fn outcome(status_code: u16) -> RequestOutcome {
        RequestOutcome::responded(1, status_code, Duration::from_millis(20), None, None)
    }

    #[test]
    fn test_snapshot_capture() {
        let ctx = test_ctx(60, 2.);
        ctx.record_dispatched(60);
        for status in [201, 201, 201, 500] {
            ctx.log().append(outcome(status));
        }

        let progress = ProgressSnapshot::capture(&ctx, Duration::from_secs(30));
        assert_eq!(progress.dispatched, 60);
        assert_eq!(progress.completed, 4);
        assert_eq!(progress.successful, 3);
        assert_eq!(progress.remaining, Duration::from_secs(30));
        assert!((progress.rate - 2.).abs() < 1e-9);
        assert!((progress.success_rate - 75.).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_without_data() {
        let ctx = test_ctx(10, 1.);
        let progress = ProgressSnapshot::capture(&ctx, Duration::ZERO);
        assert_eq!(progress.rate, 0.);
        assert_eq!(progress.success_rate, 0.);
        assert_eq!(progress.remaining, Duration::from_secs(10));
    }

    #[test]
    fn test_reporter_cadence() {
        let ctx = test_ctx(120, 1.);
        let sink = RecordingSink::default();
        let mut reporter = ProgressReporter::new(PROGRESS_INTERVAL, sink.clone());

        let fired: Vec<_> = [1, 29, 30, 31, 59, 61, 90, 91]
            .into_iter()
            .map(|secs| reporter.maybe_report(&ctx, Duration::from_secs(secs)))
            .collect();

        assert_eq!(
            fired,
            vec![false, false, true, false, false, true, false, true]
        );
        let elapsed: Vec<_> = sink.progress.lock().iter().map(|p| p.elapsed).collect();
        assert_eq!(
            elapsed,
            vec![
                Duration::from_secs(30),
                Duration::from_secs(61),
                Duration::from_secs(91)
            ]
        );
    }

    #[test]
    fn test_reporter_does_not_touch_the_log() {
        let ctx = test_ctx(60, 1.);
        ctx.log().append(outcome(201));
        let mut reporter = ProgressReporter::new(Duration::from_secs(1), RecordingSink::default());

        assert!(reporter.maybe_report(&ctx, Duration::from_secs(5)));
        assert_eq!(ctx.log().len(), 1);
        assert_eq!(ctx.dispatched(), 0);
    }
}
