//! Report artifact and console rendering of a finished run.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    time::SystemTime,
};

use rama::error::{BoxError, ErrorContext as _};
use serde::{Deserialize, Serialize};

use crate::{
    analyzer::{
        Summary, TARGET_AVG_LATENCY_MS, TARGET_DAILY_CAPACITY, TARGET_P95_LATENCY_MS,
        TARGET_SUCCESS_RATE, Verdict,
    },
    outcome::RequestOutcome,
    utils::fmt::thousands,
};

const REPORT_FILE_PREFIX: &str = "load_test_results_";

/// Persisted result of a run: the headline metrics and every outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub results: Vec<RequestOutcome>,
}

/// Headline metrics of a [`Report`], `null` when not available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_requests: usize,
    pub success_rate: f64,
    pub avg_response_ms: Option<f64>,
    pub p95_response_ms: Option<f64>,
    pub daily_capacity: Option<f64>,
}

impl From<&Summary> for ReportSummary {
    fn from(summary: &Summary) -> Self {
        Self {
            total_requests: summary.total_requests,
            success_rate: summary.success_rate,
            avg_response_ms: summary.avg_latency_ms(),
            p95_response_ms: summary.p95_latency_ms(),
            daily_capacity: summary.daily_capacity(),
        }
    }
}

impl Report {
    pub fn new(summary: &Summary, results: Vec<RequestOutcome>) -> Self {
        Self {
            summary: summary.into(),
            results,
        }
    }
}

/// File name of a report created at `at`,
/// e.g. `load_test_results_20240131_235959.json` (UTC).
pub fn report_file_name(at: SystemTime) -> String {
    // 2024-01-31T23:59:59Z
    let ts = humantime::format_rfc3339_seconds(at).to_string();
    let (date, time) = ts.split_once('T').unwrap_or((ts.as_str(), ""));
    let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();
    format!("{REPORT_FILE_PREFIX}{}_{}.json", digits(date), digits(time))
}

/// Write `report` as pretty JSON into `dir`, returning the path of the new file.
pub async fn write_report(dir: &Path, report: &Report) -> Result<PathBuf, BoxError> {
    write_report_at(dir, report, SystemTime::now()).await
}

pub async fn write_report_at(
    dir: &Path,
    report: &Report,
    at: SystemTime,
) -> Result<PathBuf, BoxError> {
    let path = dir.join(report_file_name(at));
    let data = serde_json::to_vec_pretty(report).context("serialize load test report")?;
    tokio::fs::write(&path, data)
        .await
        .with_context(|| format!("write load test report to '{}'", path.display()))?;
    Ok(path)
}

/// Console rendering of a run summary.
pub fn render_human(summary: &Summary) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_human(&mut out, summary);
    out
}

fn write_human(out: &mut String, summary: &Summary) -> std::fmt::Result {
    let rule = "=".repeat(70);
    writeln!(out, "{rule}")?;
    writeln!(out, "📊 PERFORMANCE TEST RESULTS")?;
    writeln!(out, "{rule}")?;

    writeln!(out, "📈 VOLUME:")?;
    writeln!(out, "   Total Requests: {}", thousands(summary.total_requests as u64))?;
    writeln!(out, "   Successful: {}", thousands(summary.successful_requests as u64))?;
    writeln!(out, "   Failed: {}", thousands(summary.failed_requests as u64))?;
    writeln!(out, "   Success Rate: {:.2}%", summary.success_rate)?;

    if let Some(latency) = summary.latency {
        writeln!(out)?;
        writeln!(out, "⏱️  RESPONSE TIMES:")?;
        writeln!(out, "   Average: {:.2}ms", latency.avg_ms)?;
        writeln!(out, "   Median: {:.2}ms", latency.median_ms)?;
        writeln!(out, "   95th Percentile: {:.2}ms", latency.p95_ms)?;
        writeln!(out, "   Min: {:.2}ms", latency.min_ms)?;
        writeln!(out, "   Max: {:.2}ms", latency.max_ms)?;
    }

    if let Some(throughput) = summary.throughput {
        writeln!(out)?;
        writeln!(out, "🚀 THROUGHPUT:")?;
        writeln!(out, "   Test Duration: {:.2}s", throughput.duration.as_secs_f64())?;
        writeln!(out, "   Actual Rate: {:.2} req/s", throughput.rate_per_sec)?;
        writeln!(out, "   Daily Capacity: {:.0} orders/day", throughput.daily_capacity)?;
    }

    let validation = &summary.validation;
    writeln!(out)?;
    writeln!(
        out,
        "🎯 VALIDATION ({}+ orders/day):",
        thousands(TARGET_DAILY_CAPACITY as u64)
    )?;
    writeln!(
        out,
        "   {} Daily Capacity: {} (need: {}+)",
        mark(validation.daily_capacity),
        fmt_metric(summary.daily_capacity(), "/day"),
        thousands(TARGET_DAILY_CAPACITY as u64),
    )?;
    writeln!(
        out,
        "   {} Avg Response: {} (target: <{TARGET_AVG_LATENCY_MS:.0}ms)",
        mark(validation.avg_latency),
        fmt_metric(summary.avg_latency_ms(), "ms"),
    )?;
    writeln!(
        out,
        "   {} P95 Response: {} (target: <{TARGET_P95_LATENCY_MS:.0}ms)",
        mark(validation.p95_latency),
        fmt_metric(summary.p95_latency_ms(), "ms"),
    )?;
    writeln!(
        out,
        "   {} Success Rate: {:.2}% (target: >{TARGET_SUCCESS_RATE}%)",
        mark(validation.success_rate),
        summary.success_rate,
    )?;
    writeln!(
        out,
        "   {} Overall",
        if validation.passed() { "✅" } else { "❌" }
    )
}

fn mark(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Pass => "✅",
        Verdict::Fail => "❌",
        Verdict::Unavailable => "❔",
    }
}

fn fmt_metric(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(value) => format!("{value:.0}{unit}"),
        None => "n/a".to_owned(),
    }
}
