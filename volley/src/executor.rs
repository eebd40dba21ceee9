//! Executes exactly one unit of work: build, dispatch, drain, classify.
use crate::ledger::Record;
use crate::workload::{Classifier, UnitBuilder};
use reqwest::Client;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::error;

/// HTTP client used by a single worker. Keep-alive stays enabled so the warmup
/// request actually primes the connection pool.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Runs one build-dispatch-classify cycle and produces its record. Per-request
/// failures are absorbed into the record; this function never errors.
pub(crate) async fn execute_unit<B, C>(client: &Client, builder: &B, classifier: &C) -> Record
where
    B: UnitBuilder,
    C: Classifier,
{
    let record = send_once(client, builder, classifier).await;

    #[cfg(feature = "metrics")]
    {
        metrics::histogram!("volley.latency").record(record.elapsed.as_nanos() as f64);
        if record.success {
            metrics::counter!("volley.success").increment(1);
        } else {
            metrics::counter!("volley.error").increment(1);
        }
    }

    record
}

/// Like [`execute_unit`], but without the metrics emission. Used for warmup
/// units, which must not show up in the measured series.
pub(crate) async fn send_once<B, C>(client: &Client, builder: &B, classifier: &C) -> Record
where
    B: UnitBuilder,
    C: Classifier,
{
    let sequence = unix_micros();
    let start = Instant::now();

    let request = match builder.build() {
        Ok(request) => request,
        Err(err) => {
            error!("failed to build request: {err}");
            // No network attempt is made for a build failure.
            return Record::failed(sequence, start.elapsed(), 0, err.to_string());
        }
    };

    let response = match client.execute(request).await {
        Ok(response) => response,
        Err(err) => {
            let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
            return Record::failed(sequence, start.elapsed(), status, err.to_string());
        }
    };

    let status = response.status().as_u16();
    // The body is fully consumed before the timer stops so that transfer cost
    // counts towards the measured latency.
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => return Record::failed(sequence, start.elapsed(), status, err.to_string()),
    };
    let elapsed = start.elapsed();

    let outcome = classifier.classify(&body, status);
    Record {
        sequence,
        elapsed,
        success: outcome.success,
        // The real response status always wins over anything provisional.
        status,
        metadata: outcome.metadata,
        running_success_rate: 0.0,
    }
}

fn unix_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as i64
}
