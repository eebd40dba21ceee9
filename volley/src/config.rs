//! Run configuration and termination-mode selection.
use std::time::Duration;

/// Rough estimate of how many records one worker produces in duration mode.
/// Purely a capacity hint; the ledger grows past it without issue.
pub const DEFAULT_RESULT_QUEUE_SIZE: usize = 1000;

/// Per-request ceiling enforced by the HTTP client, independent of the run's
/// own duration budget.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Percentile cut points computed when none are requested explicitly.
pub const DEFAULT_PERCENTILES: [u8; 4] = [75, 90, 95, 99];

/// Configuration for a single benchmark run. Created once per invocation and
/// immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of parallel workers. Values below 1 are treated as 1.
    pub concurrency: usize,
    /// Rounds per worker in round mode. Values below 1 are treated as 1.
    pub rounds: u32,
    /// Wall-clock budget. When set (and non-zero) it takes precedence over
    /// `rounds`; workers stop issuing new requests once it elapses.
    pub duration: Option<Duration>,
    /// Per-request timeout applied to the HTTP client.
    pub request_timeout: Duration,
    /// Percentile cut points (0-100) to compute in the summary.
    pub percentiles: Vec<u8>,
    /// Per-worker result capacity hint used in duration mode.
    pub worker_queue_hint: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            rounds: 1,
            duration: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            worker_queue_hint: DEFAULT_RESULT_QUEUE_SIZE,
        }
    }
}

/// Stopping rule for each worker's timed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Stop after exactly this many rounds.
    Rounds(u32),
    /// Stop issuing new requests once this much time has elapsed since the
    /// canonical timed-phase start. In-flight requests always finish.
    Duration(Duration),
}

impl RunConfig {
    /// Resolves the termination mode. Duration wins when both are given; with
    /// neither set meaningfully, the run defaults to a single round per worker.
    pub fn mode(&self) -> LoadMode {
        match self.duration {
            Some(duration) if !duration.is_zero() => LoadMode::Duration(duration),
            _ => LoadMode::Rounds(self.rounds.max(1)),
        }
    }

    pub(crate) fn normalized_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Pre-sizing estimate for the ledger. A hint only, never a bound.
    pub(crate) fn capacity_hint(&self) -> usize {
        let concurrency = self.normalized_concurrency();
        match self.mode() {
            LoadMode::Rounds(rounds) => concurrency * rounds as usize,
            LoadMode::Duration(_) => concurrency * self.worker_queue_hint,
        }
    }
}
