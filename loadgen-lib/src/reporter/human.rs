use std::io::Write;

use rama::telemetry::tracing;

use super::{ProgressSink, ProgressSnapshot};
use crate::{scheduler::RunOutcome, utils::fmt::thousands};

/// [`ProgressSink`] writing single line, human readable, progress updates.
#[derive(Debug)]
pub struct HumanProgressSink<W = std::io::Stdout> {
    writer: W,
}

impl HumanProgressSink {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W> HumanProgressSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send + Sync + 'static> ProgressSink for HumanProgressSink<W> {
    fn on_progress(&mut self, p: &ProgressSnapshot) {
        if let Err(err) = writeln!(
            self.writer,
            "t={:.0}s remaining={:.0}s sent={} completed={} rate={:.2}/s success={:.1}%",
            p.elapsed.as_secs_f64(),
            p.remaining.as_secs_f64(),
            thousands(p.dispatched),
            thousands(p.completed as u64),
            p.rate,
            p.success_rate,
        ) {
            tracing::debug!("failed to write progress line: {err}");
        }
    }

    fn finish(&mut self, run: &RunOutcome) {
        let status = if run.cancelled { "interrupted" } else { "done" };
        if let Err(err) = writeln!(
            self.writer,
            "{status} t={:.1}s sent={} completed={}",
            run.elapsed.as_secs_f64(),
            thousands(run.dispatched),
            thousands(run.completed as u64),
        ) {
            tracing::debug!("failed to write final progress line: {err}");
        }
    }
}
