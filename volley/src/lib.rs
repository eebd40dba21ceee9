//! A concurrent HTTP benchmarking library with built-in latency statistics.
//!
//! `volley` drives a target endpoint with N concurrent workers, either for a fixed
//! number of rounds per worker or for a fixed wall-clock duration. Every worker runs
//! one untimed warmup request and then waits at a barrier, so the measurement window
//! only opens once all workers are warm. Each completed request becomes an immutable
//! [`Record`](ledger::Record) carrying its latency, status, outcome and the running
//! success rate at the moment it finished; once all workers have joined, the record
//! set is reduced into a [`Summary`](stats::Summary) with min/max/avg/median,
//! nearest-rank percentiles and throughput.
//!
//! # Example
//! ```no_run
//! use reqwest::{Method, Request, Url};
//! use volley::workload::BoxError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url: Url = "http://localhost:3000/ok".parse()?;
//!     let report = volley::benchmark(move || -> Result<Request, BoxError> {
//!         Ok(Request::new(Method::GET, url.clone()))
//!     })
//!     .concurrency(8)
//!     .rounds(100)
//!     .await?;
//!
//!     println!("median: {:?}", report.summary.median);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod report;
pub mod runner;
pub mod stats;
pub mod workload;

pub(crate) mod executor;

pub use error::{ErrorKind, RunError};
pub use runner::{benchmark, Benchmark, RunReport};

pub mod prelude {
    pub use crate::config::RunConfig;
    pub use crate::ledger::Record;
    pub use crate::runner::{benchmark, Benchmark, RunReport};
    pub use crate::stats::Summary;
    pub use crate::workload::{BoxError, Classifier, Outcome, UnitBuilder};
}
