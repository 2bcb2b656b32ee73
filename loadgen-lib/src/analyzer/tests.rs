use std::time::{Duration, SystemTime};

use super::*;

fn outcome_at(offset: Duration, status_code: u16, latency_ms: f64) -> RequestOutcome {
    RequestOutcome {
        timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000) + offset,
        status_code,
        response_time_ms: latency_ms,
        success: status_code == 201,
        customer_id: 1,
        order_number: None,
        error: (status_code != 201).then(|| "failure".to_owned()),
    }
}

fn ok(offset_secs: u64, latency_ms: f64) -> RequestOutcome {
    outcome_at(Duration::from_secs(offset_secs), 201, latency_ms)
}

#[test]
fn test_analyze_empty_log_has_no_data() {
    assert_eq!(analyze(&[]), None);
}

#[test]
fn test_p95_small_sample_uses_maximum() {
    let sorted: Vec<f64> = (1..=20).map(f64::from).collect();
    assert_eq!(p95(&sorted), Some(20.));
}

#[test]
fn test_p95_large_sample_uses_floor_index() {
    let sorted: Vec<f64> = (1..=21).map(f64::from).collect();
    // floor(0.95 * 21) = 19
    assert_eq!(p95(&sorted), Some(sorted[19]));
    assert_eq!(p95(&sorted), Some(20.));

    let sorted: Vec<f64> = (1..=100).map(f64::from).collect();
    assert_eq!(p95(&sorted), Some(96.));
}

#[test]
fn test_p95_edge_cases() {
    assert_eq!(p95(&[]), None);
    assert_eq!(p95(&[42.]), Some(42.));
}

#[test]
fn test_p95_boundary_through_analyze() {
    // latencies arrive unsorted: the analyzer sorts them
    let log: Vec<_> = (1..=20).rev().map(|i| ok(i, f64::from(i) * 10.)).collect();
    let summary = analyze(&log).unwrap();
    assert_eq!(summary.p95_latency_ms(), Some(200.));

    let log: Vec<_> = (1..=21).rev().map(|i| ok(i, f64::from(i) * 10.)).collect();
    let summary = analyze(&log).unwrap();
    assert_eq!(summary.p95_latency_ms(), Some(200.));
    assert_eq!(summary.latency.unwrap().max_ms, 210.);
}

#[test]
fn test_median() {
    assert_eq!(median(&[]), None);
    assert_eq!(median(&[3.]), Some(3.));
    assert_eq!(median(&[1., 2., 10.]), Some(2.));
    assert_eq!(median(&[1., 2., 4., 10.]), Some(3.));
}

#[test]
fn test_capacity_boundary_is_inclusive() {
    assert_eq!(Verdict::daily_capacity(Some(9_999.)), Verdict::Fail);
    assert_eq!(Verdict::daily_capacity(Some(10_000.)), Verdict::Pass);
    assert_eq!(Verdict::daily_capacity(Some(250_000.)), Verdict::Pass);
    assert_eq!(Verdict::daily_capacity(None), Verdict::Unavailable);
}

#[test]
fn test_latency_and_success_boundaries_are_exclusive() {
    assert_eq!(Verdict::avg_latency(Some(299.99)), Verdict::Pass);
    assert_eq!(Verdict::avg_latency(Some(300.)), Verdict::Fail);
    assert_eq!(Verdict::avg_latency(None), Verdict::Unavailable);

    assert_eq!(Verdict::p95_latency(Some(499.9)), Verdict::Pass);
    assert_eq!(Verdict::p95_latency(Some(500.)), Verdict::Fail);
    assert_eq!(Verdict::p95_latency(None), Verdict::Unavailable);

    assert_eq!(Verdict::success_rate(100.), Verdict::Pass);
    assert_eq!(Verdict::success_rate(99.95), Verdict::Pass);
    assert_eq!(Verdict::success_rate(99.9), Verdict::Fail);
    assert_eq!(Verdict::success_rate(0.), Verdict::Fail);
}

#[test]
fn test_analyze_mixed_log() {
    let log = vec![
        ok(0, 100.),
        ok(10, 200.),
        outcome_at(Duration::from_secs(20), 500, 50.),
        ok(30, 300.),
        outcome_at(Duration::from_secs(40), 0, 30_000.),
    ];

    let summary = analyze(&log).unwrap();
    assert_eq!(summary.total_requests, 5);
    assert_eq!(summary.successful_requests, 3);
    assert_eq!(summary.failed_requests, 2);
    assert!((summary.success_rate - 60.).abs() < 1e-9);

    // failed requests do not count towards latency
    let latency = summary.latency.unwrap();
    assert!((latency.avg_ms - 200.).abs() < 1e-9);
    assert_eq!(latency.median_ms, 200.);
    assert_eq!(latency.p95_ms, 300.);
    assert_eq!(latency.min_ms, 100.);
    assert_eq!(latency.max_ms, 300.);

    // but they do count towards throughput
    let throughput = summary.throughput.unwrap();
    assert_eq!(throughput.duration, Duration::from_secs(40));
    assert!((throughput.rate_per_sec - 0.125).abs() < 1e-9);
    assert!((throughput.daily_capacity - 10_800.).abs() < 1e-6);

    assert_eq!(
        summary.validation,
        Validation {
            daily_capacity: Verdict::Pass,
            avg_latency: Verdict::Pass,
            p95_latency: Verdict::Pass,
            success_rate: Verdict::Fail,
        }
    );
    assert!(!summary.validation.passed());
}

#[test]
fn test_analyze_passing_run() {
    // one order every 4 seconds: 21_600 orders per day
    let log: Vec<_> = (0..30).map(|i| ok(i * 4, 120.)).collect();
    let summary = analyze(&log).unwrap();

    assert_eq!(summary.success_rate, 100.);
    assert!(summary.daily_capacity().unwrap() > TARGET_DAILY_CAPACITY);
    assert!(summary.validation.passed());
}

#[test]
fn test_analyze_all_failures() {
    let log: Vec<_> = (0..10)
        .map(|i| outcome_at(Duration::from_secs(i), 0, 5.))
        .collect();

    let summary = analyze(&log).unwrap();
    assert_eq!(summary.successful_requests, 0);
    assert_eq!(summary.success_rate, 0.);
    assert_eq!(summary.latency, None);
    assert!(summary.throughput.is_some());
    assert_eq!(summary.validation.avg_latency, Verdict::Unavailable);
    assert_eq!(summary.validation.p95_latency, Verdict::Unavailable);
    assert_eq!(summary.validation.success_rate, Verdict::Fail);
    assert!(!summary.validation.passed());
}

#[test]
fn test_single_outcome_has_no_throughput() {
    let summary = analyze(&[ok(0, 80.)]).unwrap();
    assert_eq!(summary.throughput, None);
    assert_eq!(summary.daily_capacity(), None);
    assert_eq!(summary.validation.daily_capacity, Verdict::Unavailable);
    assert!(!summary.validation.passed());
}

#[test]
fn test_zero_time_span_has_no_throughput() {
    let summary = analyze(&[ok(5, 80.), ok(5, 90.)]).unwrap();
    assert_eq!(summary.throughput, None);
}

#[test]
fn test_analyze_is_idempotent() {
    let log: Vec<_> = (0..57)
        .map(|i| {
            if i % 7 == 0 {
                outcome_at(Duration::from_millis(i * 350), 503, 12.)
            } else {
                ok(i, (i * 37 % 400) as f64 + 0.5)
            }
        })
        .collect();

    let first = analyze(&log).unwrap();
    let second = analyze(&log).unwrap();
    assert_eq!(first, second);
}
