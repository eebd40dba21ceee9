//! Plain-text rendering of a finished run: the summary sections and the flat
//! record ledger file.
use crate::config::{LoadMode, RunConfig};
use crate::ledger::Record;
use crate::stats::{sort_by_sequence, Summary};
use humantime::format_duration;
use std::fmt::Write as _;
use std::io;
use std::path::Path;

/// Default filename for the flat record ledger.
pub const DEFAULT_RECORDS_FILENAME: &str = "benchmark_records.txt";

/// Renders the summary in flat sections suitable for a terminal or a log.
pub fn render_summary(config: &RunConfig, summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--------- Brief ---------------");
    let _ = writeln!(out, "total_time: {}", format_duration(summary.total_time));
    let _ = writeln!(out, "total_requests: {}", summary.total_requests);
    let _ = writeln!(out, "throughput: {:.0} req/sec", summary.throughput);
    let _ = writeln!(out, "concurrency: {}", config.concurrency.max(1));
    match config.mode() {
        LoadMode::Duration(duration) => {
            let _ = writeln!(out, "duration: {}", format_duration(duration));
        }
        LoadMode::Rounds(rounds) => {
            let _ = writeln!(out, "rounds (for each worker): {rounds}");
        }
    }

    let mut statuses: Vec<_> = summary.status_count.iter().collect();
    statuses.sort();
    let _ = write!(out, "status_count:");
    for (status, count) in statuses {
        let _ = write!(out, " {status}:{count}");
    }
    let _ = writeln!(out);

    let successes = summary.success_count.get(&true).copied().unwrap_or(0);
    let failures = summary.success_count.get(&false).copied().unwrap_or(0);
    let _ = writeln!(out, "success_count: true:{successes} false:{failures}");

    let _ = writeln!(out, "--------- Latency -------------");
    let _ = writeln!(out, "min: {:?}", summary.min);
    let _ = writeln!(out, "max: {:?}", summary.max);
    let _ = writeln!(out, "median: {:?}", summary.median);
    let _ = writeln!(out, "avg: {:?}", summary.avg);
    for (p, percentile) in &summary.percentiles {
        let _ = writeln!(out, "P{p}: {:?}", percentile.record.elapsed);
    }
    out
}

/// Writes the flat record ledger, one line per record in request order.
pub fn write_records<P: AsRef<Path>>(path: P, records: &[Record]) -> io::Result<()> {
    let mut ordered = records.to_vec();
    // Request order reads better than completion order in the data file.
    sort_by_sequence(&mut ordered);

    let mut out = String::new();
    for r in &ordered {
        let _ = writeln!(
            out,
            "Timestamp: {}, Took: {:?}, Success: {} ({:.2}%), Status: {}, Extra: {:?}",
            r.sequence,
            r.elapsed,
            r.success,
            r.running_success_rate * 100.0,
            r.status,
            r.metadata,
        );
    }
    std::fs::write(path, out)
}
