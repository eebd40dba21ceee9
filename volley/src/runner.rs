//! The concurrent execution engine: worker pool, warmup barrier and the
//! per-worker load loop.
use crate::config::{LoadMode, RunConfig};
use crate::error::{ErrorKind, RunError};
use crate::executor::{self, execute_unit};
use crate::ledger::{Ledger, Record};
use crate::stats::Summary;
use crate::workload::{Classifier, StatusOkClassifier, UnitBuilder};
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::Barrier;
use tokio::task::JoinHandle;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Everything a finished run hands across the output boundary: the frozen
/// record set (in completion order) plus the derived statistics. Consumers
/// (printers, file writers, renderers) receive this and nothing mutates it.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records: Vec<Record>,
    pub summary: Summary,
}

/// Handle for a configured benchmark run.
///
/// Built with [`benchmark`] and configured fluently; awaiting it starts the
/// run and resolves once every worker has joined.
///
/// # Example
/// ```no_run
/// use reqwest::{Method, Request, Url};
/// use std::time::Duration;
/// use volley::workload::BoxError;
///
/// #[tokio::main]
/// async fn main() {
///     let url: Url = "http://localhost:3000/ok".parse().unwrap();
///     let report = volley::benchmark(move || -> Result<Request, BoxError> {
///         Ok(Request::new(Method::GET, url.clone()))
///     })
///     .concurrency(4)
///     .duration(Duration::from_secs(30))
///     .await
///     .unwrap();
///     println!("throughput: {:.0} req/s", report.summary.throughput);
/// }
/// ```
#[pin_project::pin_project]
pub struct Benchmark<B, C = StatusOkClassifier> {
    builder: Arc<B>,
    classifier: Arc<C>,
    config: RunConfig,
    runner_fut: Option<Pin<Box<dyn Future<Output = Result<RunReport, RunError>> + Send>>>,
}

/// Starts describing a benchmark against the given unit builder, with the
/// default classifier (success iff status 200) and a default configuration of
/// one worker running one round.
pub fn benchmark<B: UnitBuilder>(builder: B) -> Benchmark<B> {
    Benchmark {
        builder: Arc::new(builder),
        classifier: Arc::new(StatusOkClassifier),
        config: RunConfig::default(),
        runner_fut: None,
    }
}

impl<B, C> Benchmark<B, C>
where
    B: UnitBuilder,
    C: Classifier,
{
    /// Number of parallel workers.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Rounds per worker. Ignored when a duration is set.
    pub fn rounds(mut self, rounds: u32) -> Self {
        self.config.rounds = rounds;
        self
    }

    /// Wall-clock budget; takes precedence over rounds. Bounds new request
    /// starts only, in-flight requests always finish.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = Some(duration);
        self
    }

    /// Per-request timeout enforced by the transport.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Percentile cut points (0-100) to compute in the summary.
    pub fn percentiles(mut self, percentiles: &[u8]) -> Self {
        self.config.percentiles = percentiles.to_vec();
        self
    }

    /// Replaces the whole configuration at once.
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Swaps in a custom outcome classifier.
    pub fn classifier<C2: Classifier>(self, classifier: C2) -> Benchmark<B, C2> {
        Benchmark {
            builder: self.builder,
            classifier: Arc::new(classifier),
            config: self.config,
            runner_fut: None,
        }
    }
}

impl<B, C> Future for Benchmark<B, C>
where
    B: UnitBuilder,
    C: Classifier,
{
    type Output = Result<RunReport, RunError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.runner_fut.is_none() {
            let builder = Arc::clone(&self.builder);
            let classifier = Arc::clone(&self.classifier);
            let config = self.config.clone();
            self.runner_fut = Some(Box::pin(run_benchmark(builder, classifier, config)));
        }

        if let Some(runner) = &mut self.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

struct Worker<B, C> {
    ordinal: usize,
    client: Client,
    builder: Arc<B>,
    classifier: Arc<C>,
    ledger: Arc<Ledger>,
    barrier: Arc<Barrier>,
    started: Arc<OnceLock<Instant>>,
    mode: LoadMode,
}

#[instrument(name = "benchmark", skip_all, fields(concurrency = config.normalized_concurrency()))]
pub(crate) async fn run_benchmark<B, C>(
    builder: Arc<B>,
    classifier: Arc<C>,
    config: RunConfig,
) -> Result<RunReport, RunError>
where
    B: UnitBuilder,
    C: Classifier,
{
    let concurrency = config.normalized_concurrency();
    let mode = config.mode();
    info!("Starting benchmark with {mode:?}");

    // Clients are built up front so that no worker is spawned unless the whole
    // pool can start; a worker stuck waiting for a sibling that was never
    // spawned would deadlock the warmup barrier.
    let mut clients = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        match executor::http_client(config.request_timeout) {
            Ok(client) => clients.push(client),
            Err(err) => return Err(RunError::new(ErrorKind::Client(err), Vec::new())),
        }
    }

    let ledger = Arc::new(Ledger::with_capacity(config.capacity_hint()));
    let barrier = Arc::new(Barrier::new(concurrency));
    let started: Arc<OnceLock<Instant>> = Arc::new(OnceLock::new());

    let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(concurrency);
    for (ordinal, client) in clients.into_iter().enumerate() {
        let worker = Worker {
            ordinal,
            client,
            builder: Arc::clone(&builder),
            classifier: Arc::clone(&classifier),
            ledger: Arc::clone(&ledger),
            barrier: Arc::clone(&barrier),
            started: Arc::clone(&started),
            mode,
        };
        workers.push(tokio::spawn(run_worker(worker)));
    }

    // Join in submission order; an unexpected worker failure (panic or abort)
    // is fatal to the run, but the remaining workers are still drained so the
    // partial ledger is complete.
    let mut failure = None;
    for (ordinal, handle) in workers.into_iter().enumerate() {
        if let Err(err) = handle.await {
            error!("Worker {ordinal} failed: {err}");
            failure.get_or_insert(ErrorKind::Worker(ordinal, err));
        }
    }

    // Total wall time runs from the canonical start (set by the first worker
    // past the barrier) to the moment the last worker joined.
    let total_time = started.get().map(Instant::elapsed).unwrap_or_default();

    if let Some(kind) = failure {
        return Err(RunError::new(kind, ledger.snapshot()));
    }

    let records = match Arc::try_unwrap(ledger) {
        Ok(ledger) => ledger.into_records(),
        Err(shared) => shared.snapshot(),
    };
    let summary = Summary::compute(&records, total_time, &config.percentiles);
    info!(
        "Benchmark complete: {} requests in {:?}",
        summary.total_requests, summary.total_time
    );
    Ok(RunReport { records, summary })
}

async fn run_worker<B, C>(w: Worker<B, C>)
where
    B: UnitBuilder,
    C: Classifier,
{
    // One untimed unit to prime connections and caches; its record is
    // discarded and it emits no metrics. The barrier holds every worker until
    // all warmups are done, so no timed request can start against a cold
    // sibling. The warmup runs in a child task: a panicking user callback
    // must not skip the barrier below and strand the siblings there, so the
    // barrier is always reached and the panic only resumes afterwards, as an
    // ordinary worker failure.
    let warmup = {
        let client = w.client.clone();
        let builder = Arc::clone(&w.builder);
        let classifier = Arc::clone(&w.classifier);
        tokio::spawn(async move {
            let _ = executor::send_once(&client, builder.as_ref(), classifier.as_ref()).await;
        })
        .await
    };
    w.barrier.wait().await;
    if let Err(err) = warmup {
        match err.try_into_panic() {
            Ok(payload) => std::panic::resume_unwind(payload),
            Err(err) => panic!("warmup task failed: {err}"),
        }
    }

    // One-shot, race-protected write: the first worker past the barrier sets
    // the canonical timed-phase start, everyone else reads it.
    let start = *w.started.get_or_init(Instant::now);
    debug!(worker = w.ordinal, "warmup complete, entering timed phase");

    match w.mode {
        LoadMode::Rounds(rounds) => {
            for _ in 0..rounds {
                let record =
                    execute_unit(&w.client, w.builder.as_ref(), w.classifier.as_ref()).await;
                w.ledger.append(record);
            }
        }
        LoadMode::Duration(limit) => {
            // Checked before each new request; a request in flight is always
            // allowed to finish.
            while start.elapsed() <= limit {
                let record =
                    execute_unit(&w.client, w.builder.as_ref(), w.classifier.as_ref()).await;
                w.ledger.append(record);
            }
        }
    }
    debug!(worker = w.ordinal, "worker finished");
}
