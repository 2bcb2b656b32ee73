use std::time::Duration;

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful,
    telemetry::tracing,
};

use clap::{Parser, Subcommand};
use order_loadgen_lib::{config, utils};

pub mod cmd;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Load test driver for the order service.
#[derive(Debug, Clone, Parser)]
#[command(name = "order-loadgen")]
#[command(bin_name = "order-loadgen")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    cmds: CliCommands,

    #[clap(flatten)]
    run: self::cmd::run::RunArgs,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false, global = true)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false, global = true)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o', global = true)]
    pub output: Option<std::path::PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 0., global = true)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,
}

#[derive(Debug, Clone, Subcommand)]
enum CliCommands {
    /// quick test: 60 seconds at 1.67 orders per second
    Quick,
    /// daily simulation: one hour at 0.28 orders per second
    Daily,
    Burst(self::cmd::run::BurstCommand),
    Mock(self::cmd::mock::MockCommand),
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(Some(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    }))?;

    let base_shutdown_signal = graceful::default_signal();
    if let Err(err) = run_with_args(base_shutdown_signal, args).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

/// run an order-loadgen cmd with the given args
async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    let graceful_timeout = graceful_timeout(args.graceful)?;

    let (error_tx, error_rx) = tokio::sync::oneshot::channel::<BoxError>();
    let (fatal_tx, mut fatal_rx) = tokio::sync::oneshot::channel::<BoxError>();
    let graceful = graceful::Shutdown::new(new_shutdown_signal(
        error_rx,
        fatal_tx,
        base_shutdown_signal,
    ));

    graceful.spawn_task_fn(async move |guard| {
        let result = match args.cmds {
            CliCommands::Quick => {
                self::cmd::run::exec(guard, args.run, self::cmd::run::Mode::Quick).await
            }
            CliCommands::Daily => {
                self::cmd::run::exec(guard, args.run, self::cmd::run::Mode::Daily).await
            }
            CliCommands::Burst(burst_args) => match burst_args.try_into_mode() {
                Ok(mode) => self::cmd::run::exec(guard, args.run, mode).await,
                Err(err) => Err(err),
            },
            CliCommands::Mock(mock_args) => self::cmd::mock::exec(guard, mock_args).await,
        };
        if let Err(err) = result {
            let _ = error_tx.send(err);
        }
    });

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::debug!("gracefully shutdown with a delay of: {delay:?}");

    match fatal_rx.try_recv() {
        Ok(err) => Err(err),
        Err(_) => Ok(()),
    }
}

/// `None` for zero or a negative amount of seconds: no timeout.
fn graceful_timeout(secs: f64) -> Result<Option<Duration>, BoxError> {
    if secs.is_nan() {
        return Err(BoxError::from("graceful shutdown timeout is not a number"));
    }
    if secs <= 0. {
        return Ok(None);
    }
    config::duration_from_secs(secs)
        .context("graceful shutdown timeout")
        .map(Some)
}

fn new_shutdown_signal(
    error_rx: tokio::sync::oneshot::Receiver<BoxError>,
    fatal_tx: tokio::sync::oneshot::Sender<BoxError>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        tokio::select! {
            _ = base_shutdown_signal => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            result = error_rx => {
                match result {
                    Ok(err) => {
                        tracing::error!("fatal err received: {err}; abort");
                        let _ = fatal_tx.send(err);
                    },
                    Err(_) => {
                        tracing::debug!("command is finished without error, return control");
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graceful_timeout() {
        assert_eq!(graceful_timeout(0.).unwrap(), None);
        assert_eq!(graceful_timeout(-3.).unwrap(), None);
        assert_eq!(
            graceful_timeout(1.5).unwrap(),
            Some(Duration::from_millis(1_500))
        );
        for secs in [1e30, f64::INFINITY, f64::NAN] {
            assert!(graceful_timeout(secs).is_err(), "{secs}");
        }
    }
}
