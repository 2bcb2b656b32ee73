//! Drives a run: dispatches one batch of concurrent order requests per cycle,
//! records every outcome and hands the full log to the analyzer once done.

use std::{collections::HashMap, pin::pin, sync::Arc, time::Duration};

use rama::telemetry::tracing;
use rand::{RngExt as _, SeedableRng as _, rngs::StdRng};
use tokio::{
    task::{self, JoinSet},
    time::Instant,
};

use crate::{
    analyzer::{self, Summary},
    collector::ResultLog,
    config::RunContext,
    executor::RequestExecutor,
    outcome::RequestOutcome,
    payload::{MAX_CUSTOMER_ID, OrderGenerator},
    reporter::ProgressReporter,
};

pub mod batch;
pub mod pacer;

pub use self::{
    batch::batch_size,
    pacer::{CYCLE, Pacer},
};

/// Default time in-flight requests get to complete after a run was interrupted.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a run.
///
/// `Running -> Draining -> Reporting -> Done`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    /// batches are being dispatched
    Running,
    /// no new batches, outstanding requests are awaited
    Draining,
    /// the log is being analysed
    Reporting,
    Done,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Reporting => "reporting",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub state: RunState,
    /// requests handed to the executor
    pub dispatched: u64,
    /// outcomes recorded in the log
    pub completed: usize,
    /// the run was interrupted before its duration elapsed
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// `None` if no outcome was recorded at all
    pub summary: Option<Summary>,
    /// the full log, in append order
    pub results: Vec<RequestOutcome>,
}

/// Batch scheduler of a single run.
pub struct Scheduler<E, G> {
    executor: Arc<E>,
    generator: Arc<G>,
    reporter: ProgressReporter,
    pacer: Pacer,
    drain_timeout: Duration,
    rng: StdRng,
    state: RunState,
}

impl<E, G> std::fmt::Debug for Scheduler<E, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("reporter", &self.reporter)
            .field("pacer", &self.pacer)
            .field("drain_timeout", &self.drain_timeout)
            .field("state", &self.state)
            .finish()
    }
}

impl<E, G> Scheduler<E, G>
where
    E: RequestExecutor,
    G: OrderGenerator,
{
    pub fn new(executor: E, generator: G, reporter: ProgressReporter) -> Self {
        Self {
            executor: Arc::new(executor),
            generator: Arc::new(generator),
            reporter,
            pacer: Pacer::default(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            rng: StdRng::from_rng(&mut rand::rng()),
            state: RunState::Running,
        }
    }

    /// Time in-flight requests get to complete once the run is interrupted.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Seed batch sizes and customer ids for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[inline(always)]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run the load test described by `ctx` to completion.
    ///
    /// The run ends once its duration elapsed or `cancel` resolves,
    /// whichever comes first. On cancellation the requests in flight
    /// get the drain timeout to complete; whatever is still outstanding
    /// afterwards is abandoned and never recorded.
    pub async fn run<F>(&mut self, ctx: &RunContext, cancel: F) -> RunReport
    where
        F: Future,
    {
        let mut cancel = pin!(cancel);
        let cfg = ctx.config();

        let start = Instant::now();
        let end = start + cfg.duration();

        self.state = RunState::Running;
        tracing::info!(
            endpoint = %cfg.orders_endpoint(),
            duration = ?cfg.duration(),
            target_rate = cfg.target_rate(),
            expected_requests = cfg.expected_requests(),
            "load test run started",
        );

        let mut cycle: u64 = 0;
        let cancelled = loop {
            let cycle_start = Instant::now();
            if cycle_start >= end {
                break false;
            }
            cycle += 1;

            let mut batch = self.dispatch_batch(ctx);
            tracing::trace!(cycle, batch_size = batch.len(), "batch dispatched");

            let interrupted = tokio::select! {
                biased;
                _ = cancel.as_mut() => true,
                _ = batch.collect(ctx.log()) => false,
            };
            if interrupted {
                self.transition(RunState::Draining);
                self.drain(batch, ctx.log()).await;
                break true;
            }

            self.reporter.maybe_report(ctx, start.elapsed());

            let interrupted = tokio::select! {
                biased;
                _ = cancel.as_mut() => true,
                _ = self.pacer.pace(cycle_start) => false,
            };
            if interrupted {
                break true;
            }
        };

        if cancelled {
            tracing::info!(cycle, "load test run interrupted");
        }
        if self.state == RunState::Running {
            // every batch is joined before the next cycle: nothing left in flight
            self.transition(RunState::Draining);
        }

        self.transition(RunState::Reporting);
        let results = ctx.log().snapshot();
        let summary = analyzer::analyze(&results);

        self.transition(RunState::Done);
        let outcome = RunOutcome {
            state: self.state,
            dispatched: ctx.dispatched(),
            completed: results.len(),
            cancelled,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            dispatched = outcome.dispatched,
            completed = outcome.completed,
            cancelled,
            elapsed = ?outcome.elapsed,
            "load test run finished",
        );
        self.reporter.finish(&outcome);

        RunReport {
            outcome,
            summary,
            results,
        }
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "run state transition");
        self.state = next;
    }

    fn dispatch_batch(&mut self, ctx: &RunContext) -> InFlightBatch {
        let size = batch_size(ctx.config().target_rate(), &mut self.rng);
        let mut batch = InFlightBatch::new();

        for _ in 0..size {
            let customer_id = self.rng.random_range(1..=MAX_CUSTOMER_ID);
            let executor = self.executor.clone();
            let generator = self.generator.clone();

            let handle = batch.tasks.spawn(async move {
                let order = generator.generate(customer_id);
                executor.execute(customer_id, order).await
            });
            batch.customers.insert(handle.id(), customer_id);
        }

        ctx.record_dispatched(size);
        batch
    }

    async fn drain(&self, mut batch: InFlightBatch, log: &ResultLog) {
        if batch.is_empty() {
            return;
        }

        tracing::info!(
            in_flight = batch.len(),
            timeout = ?self.drain_timeout,
            "wait for in-flight requests to complete",
        );
        if tokio::time::timeout(self.drain_timeout, batch.collect(log))
            .await
            .is_err()
        {
            tracing::warn!(
                abandoned = batch.len(),
                "drain timeout reached: abandon outstanding requests",
            );
            batch.tasks.detach_all();
        }
    }
}

/// Requests of a single cycle which are still in flight.
struct InFlightBatch {
    tasks: JoinSet<RequestOutcome>,
    customers: HashMap<task::Id, u32>,
    dispatched_at: Instant,
}

impl InFlightBatch {
    fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
            customers: HashMap::new(),
            dispatched_at: Instant::now(),
        }
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append the outcome of every request to `log` as it completes.
    ///
    /// A request task which failed to produce an outcome (e.g. it panicked)
    /// is recorded as a failed request, so that no dispatched request
    /// silently goes missing.
    async fn collect(&mut self, log: &ResultLog) {
        while let Some(result) = self.tasks.join_next_with_id().await {
            let outcome = match result {
                Ok((id, outcome)) => {
                    self.customers.remove(&id);
                    outcome
                }
                Err(err) => {
                    let customer_id = self.customers.remove(&err.id()).unwrap_or_default();
                    tracing::warn!(customer_id, "order request task failed: {err}");
                    RequestOutcome::transport_failure(
                        customer_id,
                        self.dispatched_at.elapsed(),
                        format_args!("request task failed: {err}"),
                    )
                }
            };
            log.append(outcome);
        }
    }
}
