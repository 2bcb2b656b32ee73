//! Post-run statistics and validation against the service level targets.
//!
//! Analysis is a pure fold over the outcomes of a run:
//! analysing the same log twice yields the same [`Summary`].

use std::time::Duration;

use crate::outcome::RequestOutcome;

/// Minimum orders per day the service has to be able to handle.
pub const TARGET_DAILY_CAPACITY: f64 = 10_000.;
/// Mean latency of successful requests has to stay below this (ms).
pub const TARGET_AVG_LATENCY_MS: f64 = 300.;
/// p95 latency of successful requests has to stay below this (ms).
pub const TARGET_P95_LATENCY_MS: f64 = 500.;
/// Success rate (percentage) which has to be exceeded.
pub const TARGET_SUCCESS_RATE: f64 = 99.9;

const SECONDS_PER_DAY: f64 = 86_400.;

/// Sample sizes up to this use the maximum as p95.
const SMALL_SAMPLE_SIZE: usize = 20;

/// Aggregated view on all outcomes of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    /// percentage in `[0, 100]`
    pub success_rate: f64,
    /// absent when no request succeeded
    pub latency: Option<LatencyStats>,
    /// absent when fewer than two outcomes or no time span between them
    pub throughput: Option<Throughput>,
    pub validation: Validation,
}

/// Latency distribution of the successful requests, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub avg_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    /// time between the first and last recorded outcome
    pub duration: Duration,
    pub rate_per_sec: f64,
    /// `rate_per_sec` extrapolated to a full day
    pub daily_capacity: f64,
}

/// Verdict of a single service level target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    /// the metric could not be computed for this run
    Unavailable,
}

impl Verdict {
    #[inline(always)]
    fn from_check(ok: bool) -> Self {
        if ok { Self::Pass } else { Self::Fail }
    }

    #[inline(always)]
    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }

    pub fn daily_capacity(daily_capacity: Option<f64>) -> Self {
        daily_capacity.map_or(Self::Unavailable, |c| {
            Self::from_check(c >= TARGET_DAILY_CAPACITY)
        })
    }

    pub fn avg_latency(avg_ms: Option<f64>) -> Self {
        avg_ms.map_or(Self::Unavailable, |ms| {
            Self::from_check(ms < TARGET_AVG_LATENCY_MS)
        })
    }

    pub fn p95_latency(p95_ms: Option<f64>) -> Self {
        p95_ms.map_or(Self::Unavailable, |ms| {
            Self::from_check(ms < TARGET_P95_LATENCY_MS)
        })
    }

    pub fn success_rate(success_rate: f64) -> Self {
        Self::from_check(success_rate > TARGET_SUCCESS_RATE)
    }
}

/// Independent verdicts for each service level target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub daily_capacity: Verdict,
    pub avg_latency: Verdict,
    pub p95_latency: Verdict,
    pub success_rate: Verdict,
}

impl Validation {
    /// All targets are met; unavailable metrics count as not met.
    pub fn passed(&self) -> bool {
        self.daily_capacity.is_pass()
            && self.avg_latency.is_pass()
            && self.p95_latency.is_pass()
            && self.success_rate.is_pass()
    }
}

impl Summary {
    #[inline(always)]
    pub fn daily_capacity(&self) -> Option<f64> {
        self.throughput.map(|t| t.daily_capacity)
    }

    #[inline(always)]
    pub fn avg_latency_ms(&self) -> Option<f64> {
        self.latency.map(|l| l.avg_ms)
    }

    #[inline(always)]
    pub fn p95_latency_ms(&self) -> Option<f64> {
        self.latency.map(|l| l.p95_ms)
    }
}

/// Summarise the outcomes of a run, `None` if there is nothing to analyse.
pub fn analyze(log: &[RequestOutcome]) -> Option<Summary> {
    if log.is_empty() {
        return None;
    }

    let total_requests = log.len();
    let mut latencies: Vec<f64> = log
        .iter()
        .filter(|outcome| outcome.success)
        .map(|outcome| outcome.response_time_ms)
        .collect();
    let successful_requests = latencies.len();
    let success_rate = successful_requests as f64 / total_requests as f64 * 100.;

    latencies.sort_by(f64::total_cmp);
    let latency = latency_stats(&latencies);
    let throughput = throughput(log);

    let validation = Validation {
        daily_capacity: Verdict::daily_capacity(throughput.map(|t| t.daily_capacity)),
        avg_latency: Verdict::avg_latency(latency.map(|l| l.avg_ms)),
        p95_latency: Verdict::p95_latency(latency.map(|l| l.p95_ms)),
        success_rate: Verdict::success_rate(success_rate),
    };

    Some(Summary {
        total_requests,
        successful_requests,
        failed_requests: total_requests - successful_requests,
        success_rate,
        latency,
        throughput,
        validation,
    })
}

/// Latency statistics over ascending sorted latencies.
pub fn latency_stats(sorted: &[f64]) -> Option<LatencyStats> {
    let (&min_ms, &max_ms) = (sorted.first()?, sorted.last()?);
    Some(LatencyStats {
        avg_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
        median_ms: median(sorted)?,
        p95_ms: p95(sorted)?,
        min_ms,
        max_ms,
    })
}

/// Median of ascending sorted values,
/// the mean of both middle values for an even amount.
pub fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        n if n % 2 == 1 => Some(sorted[n / 2]),
        n => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.),
    }
}

/// 95th percentile of ascending sorted values.
///
/// Samples of [`SMALL_SAMPLE_SIZE`] values or less report their maximum,
/// larger samples the value at index `floor(0.95 * n)`.
pub fn p95(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n > SMALL_SAMPLE_SIZE {
        let idx = ((n as f64 * 0.95).floor() as usize).min(n - 1);
        Some(sorted[idx])
    } else {
        sorted.last().copied()
    }
}

fn throughput(log: &[RequestOutcome]) -> Option<Throughput> {
    if log.len() < 2 {
        return None;
    }

    let first = log.iter().map(|outcome| outcome.timestamp).min()?;
    let last = log.iter().map(|outcome| outcome.timestamp).max()?;
    let duration = last.duration_since(first).ok()?;

    let secs = duration.as_secs_f64();
    if secs <= 0. {
        return None;
    }

    let rate_per_sec = log.len() as f64 / secs;
    Some(Throughput {
        duration,
        rate_per_sec,
        daily_capacity: rate_per_sec * SECONDS_PER_DAY,
    })
}

#[cfg(test)]
mod tests;
