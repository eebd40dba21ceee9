//! Unit records and the shared, append-only result ledger.
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Metadata key under which build/transport error messages are recorded.
pub const ERROR_METADATA_KEY: &str = "ERROR";

/// One completed (or failed) request attempt. Immutable once appended.
#[derive(Debug, Clone)]
pub struct Record {
    /// Microseconds since the Unix epoch, captured immediately before
    /// dispatch. Used only for request-order sorting, never for correctness.
    pub sequence: i64,
    /// Measured from just before dispatch to just after the body (or failure)
    /// was fully consumed.
    pub elapsed: Duration,
    /// Outcome as classified by the caller-supplied classifier.
    pub success: bool,
    /// Protocol status code, or 0 if the attempt never received one.
    pub status: u16,
    /// Caller-supplied diagnostic context.
    pub metadata: HashMap<String, String>,
    /// Cumulative success fraction across all records appended so far, at the
    /// moment this record was appended. Independent of any later sort order.
    pub running_success_rate: f64,
}

impl Record {
    pub(crate) fn failed(sequence: i64, elapsed: Duration, status: u16, error: String) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(ERROR_METADATA_KEY.to_string(), error);
        Self {
            sequence,
            elapsed,
            success: false,
            status,
            metadata,
            running_success_rate: 0.0,
        }
    }
}

#[derive(Default)]
struct LedgerState {
    records: Vec<Record>,
    successes: u64,
    failures: u64,
}

/// Thread-safe, append-only collection of completed records shared by all
/// workers. A single lock guards both the record storage and the success/
/// failure tally; it is held only for the counter update and the push, never
/// across network I/O. Readers only run after every writer has joined.
pub struct Ledger {
    inner: Mutex<LedgerState>,
}

impl Ledger {
    /// `capacity` is a pre-sizing hint, not a bound.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LedgerState {
                records: Vec::with_capacity(capacity),
                successes: 0,
                failures: 0,
            }),
        }
    }

    /// Appends one record and returns the running success rate. The fraction
    /// is computed while the lock is held, so it is always consistent with the
    /// counters at the moment of computation, and is stamped onto the record
    /// before it is stored.
    pub fn append(&self, mut record: Record) -> f64 {
        let mut state = self.inner.lock().expect("ledger lock poisoned");
        if record.success {
            state.successes += 1;
        } else {
            state.failures += 1;
        }
        let rate = state.successes as f64 / (state.successes + state.failures) as f64;
        record.running_success_rate = rate;
        state.records.push(record);
        rate
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("ledger lock poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones all records appended so far, in append order.
    pub fn snapshot(&self) -> Vec<Record> {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .records
            .clone()
    }

    /// Consumes the ledger, yielding the records in append order.
    pub fn into_records(self) -> Vec<Record> {
        self.inner
            .into_inner()
            .expect("ledger lock poisoned")
            .records
    }
}
