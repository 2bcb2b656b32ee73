use std::io::Write;

use rama::telemetry::tracing;

use super::{ProgressSink, ProgressSnapshot};
use crate::scheduler::RunOutcome;

/// [`ProgressSink`] writing one JSON object per line,
/// for consumption by other tools.
#[derive(Debug)]
pub struct JsonlProgressSink<W = std::io::Stdout> {
    writer: W,
}

impl JsonlProgressSink {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W> JsonlProgressSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send + Sync + 'static> JsonlProgressSink<W> {
    fn write_line(&mut self, line: serde_json::Value) {
        if let Err(err) = writeln!(self.writer, "{line}") {
            tracing::debug!("failed to write json progress line: {err}");
        }
    }
}

impl<W: Write + Send + Sync + 'static> ProgressSink for JsonlProgressSink<W> {
    fn on_progress(&mut self, p: &ProgressSnapshot) {
        self.write_line(serde_json::json!({
            "type": "progress",
            "t_ms": p.elapsed.as_millis() as u64,
            "remaining_ms": p.remaining.as_millis() as u64,
            "sent": p.dispatched,
            "completed": p.completed,
            "ok": p.successful,
            "rps": p.rate,
            "success_rate": p.success_rate,
        }));
    }

    fn finish(&mut self, run: &RunOutcome) {
        self.write_line(serde_json::json!({
            "type": "final",
            "t_ms": run.elapsed.as_millis() as u64,
            "state": run.state.as_str(),
            "cancelled": run.cancelled,
            "sent": run.dispatched,
            "completed": run.completed,
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{reporter::tests::SharedBuffer, scheduler::RunState};

    #[test]
    fn test_jsonl_progress_lines() {
        let buffer = SharedBuffer::default();
        let mut sink = JsonlProgressSink::new(buffer.clone());

        sink.on_progress(&ProgressSnapshot {
            elapsed: Duration::from_secs(30),
            remaining: Duration::from_secs(3570),
            dispatched: 9,
            completed: 8,
            successful: 7,
            rate: 0.3,
            success_rate: 87.5,
        });
        sink.finish(&RunOutcome {
            state: RunState::Done,
            dispatched: 9,
            completed: 9,
            cancelled: true,
            elapsed: Duration::from_secs(31),
        });

        let lines: Vec<serde_json::Value> = buffer
            .contents()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(
            lines,
            vec![
                serde_json::json!({
                    "type": "progress",
                    "t_ms": 30_000,
                    "remaining_ms": 3_570_000,
                    "sent": 9,
                    "completed": 8,
                    "ok": 7,
                    "rps": 0.3,
                    "success_rate": 87.5,
                }),
                serde_json::json!({
                    "type": "final",
                    "t_ms": 31_000,
                    "state": "done",
                    "cancelled": true,
                    "sent": 9,
                    "completed": 9,
                }),
            ]
        );
    }
}
