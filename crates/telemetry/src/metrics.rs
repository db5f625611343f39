//! In-process metrics collection.

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

/// Collected metrics for the provisioner.
#[derive(Debug, Default)]
pub struct Metrics {
    // Directory metrics
    pub directory_operations: Counter,
    pub directory_errors: Counter,

    // Provisioning metrics
    pub environments_created: Counter,
    pub accounts_created: Counter,
    pub accounts_existing: Counter,
    pub account_failures: Counter,
    pub membership_failures: Counter,
    pub structural_failures: Counter,
    pub jobs_rejected: Counter,
    pub jobs_timed_out: Counter,

    // Host inventory metrics
    pub host_probes: Counter,
    pub host_probe_failures: Counter,

    // Latency histograms
    pub job_latency_ms: Histogram,
    pub probe_latency_ms: Histogram,

    // Gauges
    pub queue_depth: Gauge,
    pub hosts_locked: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub directory_operations: u64,
    pub directory_errors: u64,
    pub environments_created: u64,
    pub accounts_created: u64,
    pub accounts_existing: u64,
    pub account_failures: u64,
    pub membership_failures: u64,
    pub structural_failures: u64,
    pub jobs_rejected: u64,
    pub jobs_timed_out: u64,
    pub host_probes: u64,
    pub host_probe_failures: u64,
    pub job_latency_mean_ms: f64,
    pub probe_latency_mean_ms: f64,
    pub queue_depth: u64,
    pub hosts_locked: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            directory_operations: self.directory_operations.get(),
            directory_errors: self.directory_errors.get(),
            environments_created: self.environments_created.get(),
            accounts_created: self.accounts_created.get(),
            accounts_existing: self.accounts_existing.get(),
            account_failures: self.account_failures.get(),
            membership_failures: self.membership_failures.get(),
            structural_failures: self.structural_failures.get(),
            jobs_rejected: self.jobs_rejected.get(),
            jobs_timed_out: self.jobs_timed_out.get(),
            host_probes: self.host_probes.get(),
            host_probe_failures: self.host_probe_failures.get(),
            job_latency_mean_ms: self.job_latency_ms.mean(),
            probe_latency_mean_ms: self.probe_latency_ms.mean(),
            queue_depth: self.queue_depth.get(),
            hosts_locked: self.hosts_locked.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
