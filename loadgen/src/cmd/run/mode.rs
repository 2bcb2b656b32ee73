use std::time::Duration;

use clap::Args;
use order_loadgen_lib::config::{self, RunConfig};
use rama::error::{BoxError, ErrorContext as _};

const QUICK_DURATION: Duration = Duration::from_secs(60);
const QUICK_RATE: f64 = 1.67;

const DAILY_DURATION: Duration = Duration::from_secs(3600);
const DAILY_RATE: f64 = 0.28;

/// Load test preset, each resolving to a duration and target rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// about 100 orders in one minute
    Quick,
    /// about 1000 orders in one hour
    Daily,
    /// `orders` spread evenly over `duration`
    Burst { orders: u64, duration: Duration },
}

impl Mode {
    pub fn duration(&self) -> Duration {
        match self {
            Self::Quick => QUICK_DURATION,
            Self::Daily => DAILY_DURATION,
            Self::Burst { duration, .. } => *duration,
        }
    }

    /// Target rate in orders per second.
    pub fn target_rate(&self) -> f64 {
        match self {
            Self::Quick => QUICK_RATE,
            Self::Daily => DAILY_RATE,
            Self::Burst { orders, duration } => *orders as f64 / duration.as_secs_f64(),
        }
    }

    pub fn run_config(&self, base_url: &str) -> Result<RunConfig, BoxError> {
        RunConfig::try_new(base_url, self.duration(), self.target_rate())
            .with_context(|| format!("create run config for mode {self}"))
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quick => f.write_str("quick"),
            Self::Daily => f.write_str("daily"),
            Self::Burst { orders, duration } => {
                write!(f, "burst ({orders} orders in {}s)", duration.as_secs_f64())
            }
        }
    }
}

#[derive(Debug, Clone, Args)]
/// burst test: a given amount of orders in a given time
pub struct BurstCommand {
    /// amount of orders to send
    #[arg(long, default_value_t = 500)]
    orders: u64,

    /// time in which to send all orders
    #[arg(long, value_name = "SECONDS", default_value_t = 300.)]
    duration: f64,
}

impl BurstCommand {
    pub fn try_into_mode(self) -> Result<Mode, BoxError> {
        if !self.duration.is_finite() || self.duration <= 0. {
            return Err(BoxError::from(format!(
                "burst duration has to be greater than zero, got: {}",
                self.duration
            )));
        }
        if self.orders == 0 {
            return Err(BoxError::from("burst has to send at least one order"));
        }
        let duration = config::duration_from_secs(self.duration).context("burst duration")?;
        Ok(Mode::Burst {
            orders: self.orders,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(Mode::Quick.duration(), Duration::from_secs(60));
        assert_eq!(Mode::Quick.target_rate(), 1.67);
        assert_eq!(Mode::Daily.duration(), Duration::from_secs(3600));
        assert_eq!(Mode::Daily.target_rate(), 0.28);

        let cfg = Mode::Quick.run_config("http://localhost:8080").unwrap();
        assert_eq!(cfg.expected_requests(), 100);
        let cfg = Mode::Daily.run_config("http://localhost:8080").unwrap();
        assert_eq!(cfg.expected_requests(), 1008);
    }

    #[test]
    fn test_burst_defaults() {
        let mode = BurstCommand {
            orders: 500,
            duration: 300.,
        }
        .try_into_mode()
        .unwrap();

        assert_eq!(mode.duration(), Duration::from_secs(300));
        assert!((mode.target_rate() - 500. / 300.).abs() < 1e-12);
    }

    #[test]
    fn test_burst_rejects_invalid_input() {
        for (orders, duration) in [
            (500, 0.),
            (500, -5.),
            (500, f64::NAN),
            (500, f64::INFINITY),
            (500, 1e30),
            (0, 60.),
        ] {
            assert!(
                BurstCommand { orders, duration }.try_into_mode().is_err(),
                "orders = {orders}, duration = {duration}"
            );
        }
    }

    #[test]
    fn test_burst_out_of_bounds_is_refused_before_the_run() {
        for (orders, duration) in [(500, 1e12), (1_000_000_000, 1.)] {
            let mode = BurstCommand { orders, duration }.try_into_mode().unwrap();
            assert!(
                mode.run_config("http://localhost:8080").is_err(),
                "orders = {orders}, duration = {duration}"
            );
        }
    }

    #[test]
    fn test_run_config_rejects_invalid_url() {
        assert!(Mode::Quick.run_config("localhost").is_err());
    }
}
