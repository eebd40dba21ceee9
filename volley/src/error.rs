//! Run-level errors. Per-request failures never surface here; they are
//! absorbed into the record stream.
use crate::ledger::Record;
use thiserror::Error;
use tokio::task::JoinError;

/// Fatal failure of the scheduling machinery itself. Carries whatever records
/// were already gathered so callers can inspect the partial run.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct RunError {
    #[source]
    pub kind: ErrorKind,
    /// Records collected before the run aborted, in append order.
    pub partial: Vec<Record>,
}

impl RunError {
    pub(crate) fn new(kind: ErrorKind, partial: Vec<Record>) -> Self {
        Self { kind, partial }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("failed to construct HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("worker {0} failed")]
    Worker(usize, #[source] JoinError),
}
