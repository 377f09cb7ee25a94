// crates/crossbridge-service/src/stats.rs
// ============================================================================
// Module: Ingest Statistics
// Description: Counts by framework/event type and a bounded latency sample
//              for the `/stats` endpoint's p50/p95/p99 figures.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! [`Stats`] is a plain `Mutex`-guarded accumulator, not a metrics-exporter
//! integration — §1.1's `tracing` spans are the observability surface that
//! matters operationally; this is the minimal bookkeeping `GET /stats` (§6)
//! and the supplemental `spill_log_depth` figure (§2) need directly.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// How many recent end-to-end processing latencies are kept for the
/// percentile estimate. Older samples are dropped FIFO.
const LATENCY_SAMPLE_CAPACITY: usize = 2_048;

/// Accumulated ingest counters and a rolling latency sample.
#[derive(Debug, Default)]
pub struct Stats {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    by_framework: BTreeMap<String, u64>,
    by_event_type: BTreeMap<String, u64>,
    accepted: u64,
    rejected: u64,
    latencies_ms: VecDeque<f64>,
}

/// A snapshot of [`Stats`] suitable for serializing in the `/stats` response.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    /// Accepted event counts keyed by framework name.
    pub by_framework: BTreeMap<String, u64>,
    /// Accepted event counts keyed by wire event type.
    pub by_event_type: BTreeMap<String, u64>,
    /// Total events accepted onto the queue.
    pub accepted: u64,
    /// Total events rejected (validation failure or backpressure).
    pub rejected: u64,
    /// 50th percentile end-to-end processing latency, in milliseconds.
    pub p50_ms: f64,
    /// 95th percentile end-to-end processing latency, in milliseconds.
    pub p95_ms: f64,
    /// 99th percentile end-to-end processing latency, in milliseconds.
    pub p99_ms: f64,
}

impl Stats {
    /// Builds an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one accepted event, bucketed by framework and wire event type.
    pub fn record_accepted(&self, framework: &str, event_type: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.accepted += 1;
        *inner.by_framework.entry(framework.to_string()).or_insert(0) += 1;
        *inner.by_event_type.entry(event_type.to_string()).or_insert(0) += 1;
    }

    /// Records one rejected event (validation failure or backpressure).
    pub fn record_rejected(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.rejected += 1;
    }

    /// Records one worker's end-to-end processing latency for a single event.
    pub fn record_latency(&self, elapsed: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if inner.latencies_ms.len() >= LATENCY_SAMPLE_CAPACITY {
            inner.latencies_ms.pop_front();
        }
        inner.latencies_ms.push_back(elapsed.as_secs_f64() * 1_000.0);
    }

    /// Takes a point-in-time snapshot for `/stats`.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut sorted: Vec<f64> = inner.latencies_ms.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        StatsSnapshot {
            by_framework: inner.by_framework.clone(),
            by_event_type: inner.by_event_type.clone(),
            accepted: inner.accepted,
            rejected: inner.rejected,
            p50_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
        }
    }
}

/// Nearest-rank percentile over an already-sorted sample. Returns `0.0` for
/// an empty sample rather than panicking.
fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss, reason = "sample capacity is bounded and small")]
    let rank = ((sorted.len() - 1) as f64 * fraction).round();
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "rank is non-negative and bounded by len")]
    let index = rank as usize;
    sorted[index.min(sorted.len() - 1)]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use super::*;

    #[test]
    fn records_accrue_into_the_snapshot() {
        let stats = Stats::new();
        stats.record_accepted("pytest", "test_end");
        stats.record_accepted("pytest", "test_end");
        stats.record_accepted("selenium", "test_end");
        stats.record_rejected();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.by_framework.get("pytest"), Some(&2));
        assert_eq!(snapshot.by_framework.get("selenium"), Some(&1));
        assert_eq!(snapshot.accepted, 3);
        assert_eq!(snapshot.rejected, 1);
    }

    #[test]
    fn percentiles_over_a_uniform_sample_are_monotonic() {
        let stats = Stats::new();
        for ms in 1..=100 {
            stats.record_latency(Duration::from_millis(ms));
        }
        let snapshot = stats.snapshot();
        assert!(snapshot.p50_ms <= snapshot.p95_ms);
        assert!(snapshot.p95_ms <= snapshot.p99_ms);
        assert!((snapshot.p50_ms - 50.0).abs() < 2.0);
    }

    #[test]
    fn empty_sample_yields_zero_percentiles() {
        let stats = Stats::new();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.p50_ms, 0.0);
        assert_eq!(snapshot.p99_ms, 0.0);
    }

    #[test]
    fn latency_sample_is_bounded_and_drops_oldest_first() {
        let stats = Stats::new();
        for ms in 0..(LATENCY_SAMPLE_CAPACITY + 10) {
            #[allow(clippy::cast_possible_truncation, reason = "loop bound is small in tests")]
            stats.record_latency(Duration::from_millis(ms as u64));
        }
        let inner = stats.inner.lock().expect("lock");
        assert_eq!(inner.latencies_ms.len(), LATENCY_SAMPLE_CAPACITY);
        assert_eq!(inner.latencies_ms.front().copied(), Some(10.0));
    }
}
