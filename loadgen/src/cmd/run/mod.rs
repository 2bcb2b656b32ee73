use std::{path::PathBuf, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    rt::Executor,
    telemetry::tracing,
};

use clap::Args;
use order_loadgen_lib::{
    config::{self, RunContext},
    executor::HttpOrderExecutor,
    payload::RandomOrderGenerator,
    report::{self, Report, ReportSummary},
    reporter::{
        HumanProgressSink, JsonlProgressSink, PROGRESS_INTERVAL, ProgressReporter, ProgressSink,
    },
    scheduler::{RunReport, Scheduler},
};

mod mode;

pub use self::mode::{BurstCommand, Mode};

/// Options shared by all load test modes.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// base url of the order service
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    url: String,

    /// directory in which the results file is written
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    output_dir: PathBuf,

    /// report json lines instead of a human-friendly format
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// time in-flight requests get to complete when interrupted
    #[arg(long, value_name = "SECONDS", default_value_t = 5., global = true)]
    drain: f64,
}

impl RunArgs {
    fn drain_timeout(&self) -> Result<Duration, BoxError> {
        config::duration_from_secs(self.drain).with_context(|| {
            format!(
                "drain timeout has to be zero or more seconds, got: {}",
                self.drain
            )
        })
    }
}

pub async fn exec(guard: ShutdownGuard, args: RunArgs, mode: Mode) -> Result<(), BoxError> {
    let cfg = mode.run_config(&args.url)?;
    let drain_timeout = args.drain_timeout()?;

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| {
            format!(
                "create output directory at path '{}'",
                args.output_dir.display()
            )
        })?;

    let executor = HttpOrderExecutor::try_new(Executor::graceful(guard.clone()), &cfg)
        .context("create order executor")?;

    if !args.json {
        println!("🍜 Order Service Load Test ({mode})");
        println!("   Target: {}", cfg.base_url());
        println!(
            "   Duration: {}s ({:.1} min)",
            cfg.duration().as_secs_f64(),
            cfg.duration().as_secs_f64() / 60.
        );
        println!("   Target Rate: {:.2} req/s", cfg.target_rate());
        println!("   Expected Total: {} orders", cfg.expected_requests());
        println!();
    }

    let sink: Box<dyn ProgressSink> = if args.json {
        Box::new(JsonlProgressSink::stdout())
    } else {
        Box::new(HumanProgressSink::stdout())
    };

    let ctx = RunContext::new(cfg);
    let mut scheduler = Scheduler::new(
        executor,
        RandomOrderGenerator::new(),
        ProgressReporter::new_boxed(PROGRESS_INTERVAL, sink),
    )
    .with_drain_timeout(drain_timeout);

    let RunReport {
        outcome,
        summary,
        results,
    } = scheduler
        .run(&ctx, guard.clone_weak().into_cancelled())
        .await;

    if outcome.cancelled && !args.json {
        println!("⚠️  Test interrupted, reporting partial results");
    }

    let Some(summary) = summary else {
        tracing::warn!(dispatched = outcome.dispatched, "no results to analyze");
        if !args.json {
            println!("❌ No results to analyze");
        }
        return Ok(());
    };

    let report = Report::new(&summary, results);
    let path = report::write_report(&args.output_dir, &report)
        .await
        .context("write results file")?;
    tracing::info!(path = %path.display(), passed = summary.validation.passed(), "results saved");

    if args.json {
        print_json_summary(&report.summary, summary.validation.passed(), &path);
    } else {
        print!("{}", report::render_human(&summary));
        println!();
        println!("📄 Results saved to: {}", path.display());
    }

    Ok(())
}

fn print_json_summary(summary: &ReportSummary, passed: bool, path: &std::path::Path) {
    println!(
        "{}",
        serde_json::json!({
            "type": "summary",
            "summary": summary,
            "passed": passed,
            "results_file": path.display().to_string(),
        })
    );
}
