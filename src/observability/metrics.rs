//! Metrics collection for the invoice client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Metrics collector interface.
pub trait MetricsCollector: Send + Sync {
    /// Records the start of a logical operation.
    fn record_operation(&self, operation: &str);

    /// Records one transport attempt.
    fn record_attempt(&self, operation: &str);

    /// Records a scheduled retry.
    fn record_retry(&self, operation: &str);

    /// Records a successful outcome.
    fn record_success(&self, operation: &str);

    /// Records a failed outcome by error kind.
    fn record_failure(&self, operation: &str, error_kind: &str);

    /// Gets current metrics.
    fn get_metrics(&self) -> InvoiceMetrics;

    /// Resets all metrics.
    fn reset(&self);
}

/// Metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceMetrics {
    /// Logical operations started.
    pub operations: u64,
    /// Transport attempts made.
    pub attempts: u64,
    /// Retries scheduled.
    pub retries: u64,
    /// Operations that succeeded.
    pub successes: u64,
    /// Operations that failed.
    pub failures: u64,
    /// Operations started, per operation name.
    pub per_operation: HashMap<String, u64>,
    /// Failures per error kind.
    pub errors: HashMap<String, u64>,
}

impl InvoiceMetrics {
    /// Average transport attempts per logical operation.
    pub fn attempts_per_operation(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.attempts as f64 / self.operations as f64
        }
    }
}

/// Default metrics collector implementation.
#[derive(Debug, Default)]
pub struct DefaultMetricsCollector {
    operations: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    per_operation: RwLock<HashMap<String, u64>>,
    errors: RwLock<HashMap<String, u64>>,
}

impl DefaultMetricsCollector {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(map: &RwLock<HashMap<String, u64>>, key: &str) {
        let mut map = map.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *map.entry(key.to_string()).or_insert(0) += 1;
    }

    fn snapshot(map: &RwLock<HashMap<String, u64>>) -> HashMap<String, u64> {
        map.read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl MetricsCollector for DefaultMetricsCollector {
    fn record_operation(&self, operation: &str) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        Self::bump(&self.per_operation, operation);
    }

    fn record_attempt(&self, _operation: &str) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_retry(&self, _operation: &str) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_success(&self, _operation: &str) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, _operation: &str, error_kind: &str) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        Self::bump(&self.errors, error_kind);
    }

    fn get_metrics(&self) -> InvoiceMetrics {
        InvoiceMetrics {
            operations: self.operations.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            per_operation: Self::snapshot(&self.per_operation),
            errors: Self::snapshot(&self.errors),
        }
    }

    fn reset(&self) {
        self.operations.store(0, Ordering::Relaxed);
        self.attempts.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.successes.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.per_operation
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        self.errors
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

/// Collector that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsCollector;

impl MetricsCollector for NoopMetricsCollector {
    fn record_operation(&self, _operation: &str) {}
    fn record_attempt(&self, _operation: &str) {}
    fn record_retry(&self, _operation: &str) {}
    fn record_success(&self, _operation: &str) {}
    fn record_failure(&self, _operation: &str, _error_kind: &str) {}

    fn get_metrics(&self) -> InvoiceMetrics {
        InvoiceMetrics::default()
    }

    fn reset(&self) {}
}
