use std::time::Duration;

use rama::telemetry::tracing;
use tokio::time::{Instant, sleep};

/// Target duration of a single dispatch cycle.
pub const CYCLE: Duration = Duration::from_secs(1);

/// Keeps every dispatch cycle about one [`CYCLE`] long.
///
/// Slack left after the work of a cycle is slept off.
/// A cycle that overran gets no compensation at all:
/// the next cycle starts right away and the achieved rate drops
/// below the target, which is what makes overload visible.
#[derive(Debug, Clone)]
pub struct Pacer {
    cycle: Duration,
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(CYCLE)
    }
}

impl Pacer {
    pub fn new(cycle: Duration) -> Self {
        Self { cycle }
    }

    /// Time left to sleep after `work` was spent in the current cycle.
    #[inline(always)]
    pub fn slack(&self, work: Duration) -> Duration {
        self.cycle.saturating_sub(work)
    }

    /// Sleep for what remains of the cycle started at `cycle_start`.
    pub async fn pace(&self, cycle_start: Instant) {
        let work = cycle_start.elapsed();
        let slack = self.slack(work);
        if slack.is_zero() {
            tracing::debug!(?work, cycle = ?self.cycle, "cycle overran its budget: no pacing sleep");
            return;
        }
        sleep(slack).await;
    }
}
