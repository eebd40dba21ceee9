mod utils;
#[allow(unused)]
use utils::*;

use reqwest::{Method, Request, Url};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use volley::workload::{BoxError, Outcome};
use volley::ErrorKind;

#[tokio::test]
async fn round_mode_produces_concurrency_times_rounds() {
    init();
    let (addr, state) = mock_service::spawn().await;

    let report = volley::benchmark(get_builder(addr, "/ok"))
        .concurrency(3)
        .rounds(10)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 30);
    assert_eq!(report.summary.total_requests, 30);
    assert_eq!(report.summary.success_count.get(&true), Some(&30));
    assert_eq!(report.summary.success_count.get(&false), None);
    assert_eq!(report.summary.status_count.get(&200), Some(&30));

    // One untimed warmup per worker reached the server but left no record.
    assert_eq!(state.hits(), 33);

    let summary = &report.summary;
    assert!(summary.min <= summary.median);
    assert!(summary.median <= summary.max);
    assert!(summary.total_time > Duration::ZERO);
    assert!(summary.throughput > 0.0);

    // Percentile points are real records annotated with their position in the
    // latency-sorted view.
    let mut by_elapsed = report.records.clone();
    volley::stats::sort_by_elapsed(&mut by_elapsed);
    for p in [75u8, 90, 95, 99] {
        let percentile = &summary.percentiles[&p];
        assert!(percentile.index < 30);
        assert_eq!(percentile.record.elapsed, by_elapsed[percentile.index].elapsed);
    }
}

#[tokio::test]
async fn duration_mode_bounds_new_request_starts() {
    init();
    let (addr, _state) = mock_service::spawn().await;

    let duration = Duration::from_millis(250);
    let report = volley::benchmark(get_builder(addr, "/delay/ms/10"))
        .concurrency(2)
        .duration(duration)
        .await
        .unwrap();

    assert!(!report.records.is_empty());
    // The window bounds new starts only; in-flight requests may finish after
    // it, so total time is at least the budget.
    assert!(report.summary.total_time >= duration);
    assert_eq!(
        report.summary.success_count.get(&true),
        Some(&report.records.len())
    );

    // No request may be dispatched after the window closes: the spread of the
    // dispatch timestamps stays within the budget (plus scheduling slack).
    let first = report.records.iter().map(|r| r.sequence).min().unwrap();
    let last = report.records.iter().map(|r| r.sequence).max().unwrap();
    let span = Duration::from_micros((last - first) as u64);
    assert!(
        span <= duration + Duration::from_millis(100),
        "dispatch span {span:?} exceeds the {duration:?} window"
    );
}

#[tokio::test]
async fn non_ok_status_is_a_failure_by_default() {
    init();
    let (addr, _state) = mock_service::spawn().await;

    let report = volley::benchmark(get_builder(addr, "/status/503"))
        .concurrency(2)
        .rounds(4)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 8);
    assert_eq!(report.summary.status_count.get(&503), Some(&8));
    assert_eq!(report.summary.success_count.get(&false), Some(&8));
}

#[tokio::test]
async fn custom_classifier_overrides_default_policy() {
    init();
    let (addr, _state) = mock_service::spawn().await;

    let report = volley::benchmark(get_builder(addr, "/status/503"))
        .concurrency(2)
        .rounds(4)
        .classifier(|_body: &[u8], status: u16| {
            if status == 503 {
                Outcome::pass()
            } else {
                Outcome::fail()
            }
        })
        .await
        .unwrap();

    assert_eq!(report.summary.success_count.get(&true), Some(&8));
    // The classifier never changes the recorded status code.
    assert_eq!(report.summary.status_count.get(&503), Some(&8));
}

#[tokio::test]
async fn build_failure_is_recorded_not_fatal() {
    init();

    let report = volley::benchmark(|| -> Result<Request, BoxError> {
        Err("template expansion failed".into())
    })
    .rounds(5)
    .await
    .unwrap();

    assert_eq!(report.records.len(), 5);
    for record in &report.records {
        assert!(!record.success);
        assert_eq!(record.status, 0);
        let error = record.metadata.get(volley::ledger::ERROR_METADATA_KEY);
        assert_eq!(error.map(String::as_str), Some("template expansion failed"));
    }
}

#[tokio::test]
async fn transport_failure_is_recorded_not_fatal() {
    init();

    // Nothing listens here; every dispatch fails at the connection level.
    let builder = get_builder("127.0.0.1:9".parse().unwrap(), "/ok");
    let report = volley::benchmark(builder).rounds(3).await.unwrap();

    assert_eq!(report.records.len(), 3);
    for record in &report.records {
        assert!(!record.success);
        assert_eq!(record.status, 0);
        assert!(record
            .metadata
            .contains_key(volley::ledger::ERROR_METADATA_KEY));
    }
}

#[tokio::test]
async fn panicking_warmup_aborts_run_instead_of_hanging() {
    init();
    let (addr, _state) = mock_service::spawn().await;

    // Panics on the first call only; every later build succeeds, so exactly
    // one worker dies during its warmup.
    let url: Url = format!("http://{addr}/ok").parse().unwrap();
    let blown = Arc::new(AtomicBool::new(false));
    let builder = {
        let blown = Arc::clone(&blown);
        move || -> Result<Request, BoxError> {
            if !blown.swap(true, Ordering::SeqCst) {
                panic!("callback blew up");
            }
            Ok(Request::new(Method::GET, url.clone()))
        }
    };

    // The dead worker must not strand its sibling at the warmup barrier: the
    // run aborts with a worker error instead of hanging forever.
    let run = volley::benchmark(builder).concurrency(2).rounds(3);
    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run must abort, not hang");

    let err = result.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Worker(..)));
    // The surviving worker still finished its rounds.
    assert_eq!(err.partial.len(), 3);
}

#[tokio::test]
async fn running_success_rate_is_globally_consistent() {
    init();
    let (addr, _state) = mock_service::spawn().await;

    let report = volley::benchmark(get_builder(addr, "/flaky/50"))
        .concurrency(4)
        .rounds(25)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 100);

    // Records come back in completion (append) order, so the stamped rate on
    // the k-th record must equal successes-so-far / k no matter which worker
    // produced it.
    let mut successes = 0u64;
    for (i, record) in report.records.iter().enumerate() {
        if record.success {
            successes += 1;
        }
        let expected = successes as f64 / (i as u64 + 1) as f64;
        assert!((record.running_success_rate - expected).abs() < 1e-12);
    }
}

#[tokio::test]
async fn summary_recomputation_matches_report() {
    init();
    let (addr, _state) = mock_service::spawn().await;

    let report = volley::benchmark(get_builder(addr, "/ok"))
        .concurrency(2)
        .rounds(5)
        .percentiles(&[50, 95])
        .await
        .unwrap();

    // The summary is a pure function of the frozen record set.
    let again = volley::stats::Summary::compute(
        &report.records,
        report.summary.total_time,
        &[50, 95],
    );
    assert_eq!(again.median, report.summary.median);
    assert_eq!(again.avg, report.summary.avg);
    assert_eq!(again.percentiles[&95].index, report.summary.percentiles[&95].index);
}
