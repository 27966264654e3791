//! In-process metrics collection for the consume loop.
//!
//! Lock-free counters/gauges/histograms, the same shapes the teacher
//! crate uses, scoped to what a `Consumer` can observe about itself:
//! messages/batches processed, commit/heartbeat/fetch latency, and
//! consumer lag per the highwater mark reported on each fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for a single `Consumer`.
#[derive(Debug, Default)]
pub struct Metrics {
    // Dispatch counters
    pub messages_processed: Counter,
    pub batches_processed: Counter,
    pub callback_failures: Counter,

    // Collaborator RPC counters
    pub fetches_issued: Counter,
    pub fetch_errors: Counter,
    pub heartbeats_sent: Counter,
    pub heartbeat_errors: Counter,
    pub commits_issued: Counter,
    pub commit_errors: Counter,
    pub rejoins: Counter,

    // Latency histograms
    pub callback_latency_ms: Histogram,
    pub fetch_latency_ms: Histogram,
    pub commit_latency_ms: Histogram,
    pub heartbeat_latency_ms: Histogram,

    // Gauges
    pub consumer_lag: Gauge,
    pub assigned_partitions: Gauge,
    pub generation: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub messages_processed: u64,
    pub batches_processed: u64,
    pub callback_failures: u64,
    pub fetches_issued: u64,
    pub fetch_errors: u64,
    pub heartbeats_sent: u64,
    pub heartbeat_errors: u64,
    pub commits_issued: u64,
    pub commit_errors: u64,
    pub rejoins: u64,
    pub callback_latency_mean_ms: f64,
    pub fetch_latency_mean_ms: f64,
    pub commit_latency_mean_ms: f64,
    pub heartbeat_latency_mean_ms: f64,
    pub consumer_lag: u64,
    pub assigned_partitions: u64,
    pub generation: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            messages_processed: self.messages_processed.get(),
            batches_processed: self.batches_processed.get(),
            callback_failures: self.callback_failures.get(),
            fetches_issued: self.fetches_issued.get(),
            fetch_errors: self.fetch_errors.get(),
            heartbeats_sent: self.heartbeats_sent.get(),
            heartbeat_errors: self.heartbeat_errors.get(),
            commits_issued: self.commits_issued.get(),
            commit_errors: self.commit_errors.get(),
            rejoins: self.rejoins.get(),
            callback_latency_mean_ms: self.callback_latency_ms.mean(),
            fetch_latency_mean_ms: self.fetch_latency_ms.mean(),
            commit_latency_mean_ms: self.commit_latency_ms.mean(),
            heartbeat_latency_mean_ms: self.heartbeat_latency_ms.mean(),
            consumer_lag: self.consumer_lag.get(),
            assigned_partitions: self.assigned_partitions.get(),
            generation: self.generation.get(),
        }
    }
}

/// Global metrics registry, shared across every `Consumer` in this process
/// unless the host application constructs per-consumer `Metrics` instances
/// itself and wires them through a custom `Instrumenter`.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
