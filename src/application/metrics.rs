//! Observability metrics for advised invocations.
//!
//! Provides counters about interception behavior for monitoring and debugging.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking interception statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Per-operation counters live in a concurrent map keyed by the
/// fully-qualified operation identifier.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct OperationCounters {
    invocations: AtomicU64,
    failures: AtomicU64,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Total number of advised invocations
    invocations: AtomicU64,
    /// Invocations where the original operation ran
    proceeded: AtomicU64,
    /// Invocations short-circuited by around advice or a failing before advice
    short_circuited: AtomicU64,
    /// Invocations that returned a value to the caller
    succeeded: AtomicU64,
    /// Invocations that returned an error to the caller
    failed: AtomicU64,
    /// Advice callbacks that returned an error or panicked
    advice_failures: AtomicU64,
    per_operation: DashMap<String, OperationCounters>,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Record the start of an invocation.
    pub(crate) fn record_invocation(&self, operation: &str) {
        self.inner.invocations.fetch_add(1, Ordering::Relaxed);
        self.operation_entry(operation, |c| {
            c.invocations.fetch_add(1, Ordering::Relaxed);
        });
    }

    /// Record whether the original operation ran.
    pub(crate) fn record_proceeded(&self, proceeded: bool) {
        if proceeded {
            self.inner.proceeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.short_circuited.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the outcome returned to the caller.
    pub(crate) fn record_outcome(&self, operation: &str, success: bool) {
        if success {
            self.inner.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.failed.fetch_add(1, Ordering::Relaxed);
            self.operation_entry(operation, |c| {
                c.failures.fetch_add(1, Ordering::Relaxed);
            });
        }
    }

    /// Record a failed advice callback.
    pub(crate) fn record_advice_failure(&self) {
        self.inner.advice_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn operation_entry(&self, operation: &str, f: impl FnOnce(&OperationCounters)) {
        if let Some(counters) = self.inner.per_operation.get(operation) {
            f(&counters);
            return;
        }
        let counters = self
            .inner
            .per_operation
            .entry(operation.to_string())
            .or_default();
        f(&counters);
    }

    /// Get the total number of invocations.
    pub fn invocations(&self) -> u64 {
        self.inner.invocations.load(Ordering::Relaxed)
    }

    /// Get the number of invocations where the original operation ran.
    pub fn proceeded(&self) -> u64 {
        self.inner.proceeded.load(Ordering::Relaxed)
    }

    /// Get the number of invocations where the original operation did not run.
    pub fn short_circuited(&self) -> u64 {
        self.inner.short_circuited.load(Ordering::Relaxed)
    }

    /// Get the number of invocations that returned a value.
    pub fn succeeded(&self) -> u64 {
        self.inner.succeeded.load(Ordering::Relaxed)
    }

    /// Get the number of invocations that returned an error.
    pub fn failed(&self) -> u64 {
        self.inner.failed.load(Ordering::Relaxed)
    }

    /// Get the number of failed advice callbacks.
    pub fn advice_failures(&self) -> u64 {
        self.inner.advice_failures.load(Ordering::Relaxed)
    }

    /// Get the number of invocations of one operation.
    pub fn operation_invocations(&self, operation: &str) -> u64 {
        self.inner
            .per_operation
            .get(operation)
            .map_or(0, |c| c.invocations.load(Ordering::Relaxed))
    }

    /// Get the number of failed invocations of one operation.
    pub fn operation_failures(&self, operation: &str) -> u64 {
        self.inner
            .per_operation
            .get(operation)
            .map_or(0, |c| c.failures.load(Ordering::Relaxed))
    }

    /// Get a snapshot of all global metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            invocations: self.invocations(),
            proceeded: self.proceeded(),
            short_circuited: self.short_circuited(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            advice_failures: self.advice_failures(),
        }
    }

    /// Reset all metrics to zero.
    ///
    /// Useful for testing or when starting a new monitoring period.
    pub fn reset(&self) {
        self.inner.invocations.store(0, Ordering::Relaxed);
        self.inner.proceeded.store(0, Ordering::Relaxed);
        self.inner.short_circuited.store(0, Ordering::Relaxed);
        self.inner.succeeded.store(0, Ordering::Relaxed);
        self.inner.failed.store(0, Ordering::Relaxed);
        self.inner.advice_failures.store(0, Ordering::Relaxed);
        self.inner.per_operation.clear();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Total number of advised invocations
    pub invocations: u64,
    /// Invocations where the original operation ran
    pub proceeded: u64,
    /// Invocations where the original operation did not run
    pub short_circuited: u64,
    /// Invocations that returned a value
    pub succeeded: u64,
    /// Invocations that returned an error
    pub failed: u64,
    /// Failed advice callbacks
    pub advice_failures: u64,
}

impl MetricsSnapshot {
    /// Calculate the failure rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no invocation has completed.
    pub fn failure_rate(&self) -> f64 {
        let total = self.completed();
        if total == 0 {
            0.0
        } else {
            self.failed as f64 / total as f64
        }
    }

    /// Get the number of completed invocations (succeeded + failed).
    pub fn completed(&self) -> u64 {
        self.succeeded.saturating_add(self.failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot {
            invocations: 0,
            proceeded: 0,
            short_circuited: 0,
            succeeded: 0,
            failed: 0,
            advice_failures: 0,
        });
        assert_eq!(metrics.operation_invocations("shop::ping"), 0);
    }

    #[test]
    fn test_record_invocations_per_operation() {
        let metrics = Metrics::new();
        metrics.record_invocation("shop::ping");
        metrics.record_invocation("shop::ping");
        metrics.record_invocation("shop::pong");
        metrics.record_outcome("shop::pong", false);

        assert_eq!(metrics.invocations(), 3);
        assert_eq!(metrics.operation_invocations("shop::ping"), 2);
        assert_eq!(metrics.operation_invocations("shop::pong"), 1);
        assert_eq!(metrics.operation_failures("shop::pong"), 1);
        assert_eq!(metrics.operation_failures("shop::ping"), 0);
    }

    #[test]
    fn test_proceeded_and_short_circuited() {
        let metrics = Metrics::new();
        metrics.record_proceeded(true);
        metrics.record_proceeded(false);
        metrics.record_proceeded(false);

        assert_eq!(metrics.proceeded(), 1);
        assert_eq!(metrics.short_circuited(), 2);
    }

    #[test]
    fn test_snapshot_failure_rate() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().failure_rate(), 0.0);

        metrics.record_outcome("op", true);
        assert_eq!(metrics.snapshot().failure_rate(), 0.0);

        metrics.record_outcome("op", false);
        assert!((metrics.snapshot().failure_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(metrics.snapshot().completed(), 2);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_invocation("op");
        metrics.record_advice_failure();
        metrics.record_outcome("op", false);

        metrics.reset();
        assert_eq!(metrics.invocations(), 0);
        assert_eq!(metrics.advice_failures(), 0);
        assert_eq!(metrics.failed(), 0);
        assert_eq!(metrics.operation_invocations("op"), 0);
    }

    #[test]
    fn test_metrics_clone() {
        let metrics1 = Metrics::new();
        metrics1.record_invocation("op");

        let metrics2 = metrics1.clone();
        metrics2.record_invocation("op");

        // Both should see the same value (shared Arc)
        assert_eq!(metrics1.invocations(), 2);
        assert_eq!(metrics2.operation_invocations("op"), 2);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let metrics = Metrics::new();
        let mut handles = vec![];

        for i in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                let op = format!("op_{}", i % 2);
                for _ in 0..100 {
                    m.record_invocation(&op);
                    m.record_outcome(&op, true);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.invocations(), 1000);
        assert_eq!(metrics.succeeded(), 1000);
        assert_eq!(metrics.operation_invocations("op_0"), 500);
        assert_eq!(metrics.operation_invocations("op_1"), 500);
    }
}
