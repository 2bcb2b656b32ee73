use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use rama::{
    error::{BoxError, ErrorContext as _},
    http::Uri,
};

use crate::collector::ResultLog;

/// Path of the order creation endpoint, relative to the base url.
pub const ORDERS_PATH: &str = "/api/orders";

/// Longest run a [`RunConfig`] accepts.
pub const MAX_RUN_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Highest target rate a [`RunConfig`] accepts, in requests per second.
///
/// Every cycle spawns about this many concurrent requests.
pub const MAX_TARGET_RATE: f64 = 10_000.;

/// Convert user supplied seconds into a [`Duration`].
///
/// Negative, NaN and out of range values are refused.
pub fn duration_from_secs(secs: f64) -> Result<Duration, BoxError> {
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("convert {secs} seconds into a duration"))
}

/// Immutable parameters of a single load test run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    base_url: Uri,
    orders_endpoint: Uri,
    duration: Duration,
    target_rate: f64,
}

impl RunConfig {
    /// Validate and create a new [`RunConfig`].
    ///
    /// The target rate is expressed in requests per second and may be fractional.
    pub fn try_new(base_url: &str, duration: Duration, target_rate: f64) -> Result<Self, BoxError> {
        if duration.is_zero() {
            return Err(BoxError::from("run duration has to be greater than zero"));
        }
        if duration > MAX_RUN_DURATION {
            return Err(BoxError::from(format!(
                "run duration of {}s exceeds the maximum of {}s",
                duration.as_secs_f64(),
                MAX_RUN_DURATION.as_secs()
            )));
        }
        if !target_rate.is_finite() || target_rate <= 0. {
            return Err(BoxError::from(format!(
                "target rate has to be a finite number greater than zero, got: {target_rate}"
            )));
        }
        if target_rate > MAX_TARGET_RATE {
            return Err(BoxError::from(format!(
                "target rate of {target_rate} req/s exceeds the maximum of {MAX_TARGET_RATE} req/s"
            )));
        }

        let base_url: Uri = base_url
            .parse()
            .with_context(|| format!("parse base url '{base_url}'"))?;
        if base_url.scheme().is_none() || base_url.authority().is_none() {
            return Err(BoxError::from(format!(
                "base url '{base_url}' has to be absolute (e.g. http://localhost:8080)"
            )));
        }

        let orders_endpoint: Uri = format!(
            "{}{ORDERS_PATH}",
            base_url.to_string().trim_end_matches('/')
        )
        .parse()
        .context("create orders endpoint uri from base url")?;

        Ok(Self {
            base_url,
            orders_endpoint,
            duration,
            target_rate,
        })
    }

    #[inline(always)]
    pub fn base_url(&self) -> &Uri {
        &self.base_url
    }

    #[inline(always)]
    pub fn orders_endpoint(&self) -> &Uri {
        &self.orders_endpoint
    }

    #[inline(always)]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[inline(always)]
    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    /// Amount of requests a run is expected to dispatch in total.
    pub fn expected_requests(&self) -> u64 {
        (self.duration.as_secs_f64() * self.target_rate) as u64
    }
}

/// State of a single run, shared by the scheduler, reporter and analyzer.
///
/// Only the scheduler writes: it appends outcomes to the [`ResultLog`]
/// and counts dispatched requests. Everything else reads.
#[derive(Debug)]
pub struct RunContext {
    config: RunConfig,
    log: ResultLog,
    dispatched: AtomicU64,
}

impl RunContext {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            log: ResultLog::new(),
            dispatched: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    #[inline(always)]
    pub fn log(&self) -> &ResultLog {
        &self.log
    }

    #[inline(always)]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Acquire)
    }

    pub(crate) fn record_dispatched(&self, n: u64) {
        self.dispatched.fetch_add(n, Ordering::AcqRel);
    }
}
