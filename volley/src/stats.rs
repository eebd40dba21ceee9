//! Reduction of a finished record set into aggregate statistics.
//!
//! Pure functions over a frozen ledger: computing the summary twice from the
//! same record set yields identical results. When several records share the
//! same elapsed time their relative order after sorting is unspecified, so
//! which physical record lands at a given percentile index is an accepted
//! non-determinism.
use crate::ledger::Record;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// A record chosen as a percentile cut point, together with its position in
/// the latency-sorted view of the ledger. The index lets downstream renderers
/// mark the point against an axis sorted by the same criterion.
#[derive(Debug, Clone)]
pub struct Percentile {
    pub record: Record,
    pub index: usize,
}

/// Immutable snapshot of aggregate statistics over a finished run.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// Wall-clock time from the canonical timed-phase start to the last join.
    pub total_time: Duration,
    pub total_requests: usize,
    /// Records per second over `total_time`, not the sum of request latencies.
    pub throughput: f64,
    pub status_count: HashMap<u16, usize>,
    pub success_count: HashMap<bool, usize>,
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub median: Duration,
    pub percentiles: BTreeMap<u8, Percentile>,
}

impl Summary {
    /// Reduces `records` into a summary. An empty record set yields
    /// zero-valued aggregates and an empty percentile map.
    pub fn compute(records: &[Record], total_time: Duration, percentiles: &[u8]) -> Self {
        let total = records.len();
        let mut summary = Summary {
            total_time,
            total_requests: total,
            ..Summary::default()
        };
        if total == 0 {
            return summary;
        }

        let mut by_elapsed: Vec<&Record> = records.iter().collect();
        by_elapsed.sort_by_key(|r| r.elapsed);

        summary.min = by_elapsed[0].elapsed;
        summary.max = by_elapsed[total - 1].elapsed;
        summary.median = if total % 2 == 0 {
            (by_elapsed[total / 2 - 1].elapsed + by_elapsed[total / 2].elapsed) / 2
        } else {
            by_elapsed[total / 2].elapsed
        };

        let mut sum = Duration::ZERO;
        for record in records {
            sum += record.elapsed;
            *summary.status_count.entry(record.status).or_insert(0) += 1;
            *summary.success_count.entry(record.success).or_insert(0) += 1;
        }
        summary.avg = sum / total as u32;

        if !total_time.is_zero() {
            summary.throughput = total as f64 / total_time.as_secs_f64();
        }

        for &p in percentiles {
            summary.percentiles.insert(p, nearest_rank(&by_elapsed, p));
        }

        summary
    }
}

/// Nearest-rank percentile: index `ceil(p/100 * n) - 1` into the ascending
/// latency-sorted view. Selects an actual data point, no interpolation.
fn nearest_rank(by_elapsed: &[&Record], p: u8) -> Percentile {
    let rank = (f64::from(p) / 100.0 * by_elapsed.len() as f64).ceil() as usize;
    let index = rank.clamp(1, by_elapsed.len()) - 1;
    Percentile {
        record: (*by_elapsed[index]).clone(),
        index,
    }
}

/// Sorts by latency ascending. Ties resolve arbitrarily.
pub fn sort_by_elapsed(records: &mut [Record]) {
    records.sort_by_key(|r| r.elapsed);
}

/// Sorts by sequence key, i.e. request order.
pub fn sort_by_sequence(records: &mut [Record]) {
    records.sort_by_key(|r| r.sequence);
}
