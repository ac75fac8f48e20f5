//! Invocation interceptor: runs matching advice around an original operation.
//!
//! For one invocation the interceptor:
//! 1. runs matching before advice in registration order; a failure aborts the
//!    call before the original operation runs,
//! 2. hands the original operation to the first matching around advice, or
//!    runs it directly when no around advice matches,
//! 3. runs after-success advice on success, or after-failure advice on
//!    failure,
//! 4. runs unconditional after advice exactly once.
//!
//! A panic in the original operation or in around advice is treated as a
//! failure of the operation: after-failure and after advice run, then the
//! panic resumes in the caller.
//!
//! After-family advice failures never replace the outcome; they are logged and
//! reported alongside it in an [`InvocationReport`].

use crate::application::metrics::Metrics;
use crate::application::ports::Clock;
use crate::application::registry::{AdviceRegistry, Rule};
use crate::domain::{
    advice::{
        Advice, AdviceError, AdviceKind, AroundFn, FailureDisposition, Outcome,
        ProceedingJoinPoint,
    },
    error::{AdviceFailure, InvocationError, OperationFailure},
    join_point::JoinPoint,
    value::Value,
};
use crate::infrastructure::system::SystemClock;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of one invocation.
///
/// `Pending → BeforeRunning → (OriginalRunning | AroundRunning) →
/// (Succeeded | Failed) → AfterRunning → Done`. When a before advice fails the
/// invocation moves from `BeforeRunning` straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationPhase {
    /// Invocation created, nothing ran yet
    Pending,
    /// Before advice running
    BeforeRunning,
    /// Original operation running without around advice
    OriginalRunning,
    /// Around advice running (and possibly the original inside it)
    AroundRunning,
    /// Outcome is a value
    Succeeded,
    /// Outcome is an error
    Failed,
    /// After-family advice running
    AfterRunning,
    /// Invocation complete
    Done,
}

impl fmt::Display for InvocationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvocationPhase::Pending => "pending",
            InvocationPhase::BeforeRunning => "before-running",
            InvocationPhase::OriginalRunning => "original-running",
            InvocationPhase::AroundRunning => "around-running",
            InvocationPhase::Succeeded => "succeeded",
            InvocationPhase::Failed => "failed",
            InvocationPhase::AfterRunning => "after-running",
            InvocationPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything that happened during one invocation.
#[derive(Debug)]
pub struct InvocationReport {
    /// Outcome returned to the caller
    pub result: Result<Value, InvocationError>,
    /// After-family advice failures, in the order they happened
    pub advice_failures: Vec<AdviceFailure>,
    /// Phases visited, in order
    pub phases: Vec<InvocationPhase>,
    /// Whether the original operation ran
    pub proceeded: bool,
    /// Time from the first advice to the last, measured with the clock port
    pub elapsed: Duration,
}

impl InvocationReport {
    /// Consume the report and keep only the outcome.
    pub fn into_result(self) -> Result<Value, InvocationError> {
        self.result
    }
}

/// Records phase transitions of one invocation.
struct PhaseTracker<'a> {
    operation: &'a str,
    phases: RefCell<Vec<InvocationPhase>>,
}

impl<'a> PhaseTracker<'a> {
    fn new(operation: &'a str) -> Self {
        Self {
            operation,
            phases: RefCell::new(vec![InvocationPhase::Pending]),
        }
    }

    fn enter(&self, phase: InvocationPhase) {
        tracing::trace!(operation = self.operation, %phase, "invocation phase");
        self.phases.borrow_mut().push(phase);
    }

    fn into_phases(self) -> Vec<InvocationPhase> {
        self.phases.into_inner()
    }
}

/// Run one advice callback, turning errors and panics into an `AdviceFailure`.
fn guarded<T>(rule: &Rule, f: impl FnOnce() -> Result<T, AdviceError>) -> Result<T, AdviceFailure> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(AdviceFailure::new(rule.name(), rule.kind(), error)),
        Err(_) => Err(AdviceFailure::new(
            rule.name(),
            rule.kind(),
            AdviceError::new("advice panicked"),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

/// Applies the advice of an `AdviceRegistry` to operation calls.
///
/// Cloning is cheap; clones share the registry, clock and metrics.
#[derive(Debug, Clone)]
pub struct Interceptor {
    registry: AdviceRegistry,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl Interceptor {
    /// Create an interceptor over a built registry.
    pub fn new(registry: AdviceRegistry) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock::new()),
            metrics: Metrics::new(),
        }
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an existing metrics tracker.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &AdviceRegistry {
        &self.registry
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Invoke `operation` with the advice matching `join_point`.
    ///
    /// # Errors
    /// Returns the invocation's failure: a failed before advice, the wrapped
    /// failure of the operation, or an error chosen by around advice.
    pub fn invoke<F, E>(&self, join_point: &JoinPoint, operation: F) -> Result<Value, InvocationError>
    where
        F: FnOnce(&JoinPoint) -> Result<Value, E>,
        E: fmt::Display,
    {
        self.invoke_with_report(join_point, operation).into_result()
    }

    /// Invoke `operation` and report everything that happened.
    ///
    /// # Panics
    /// Resumes a panic raised by the operation or by around advice, after the
    /// after-failure and after advice for the call have run.
    pub fn invoke_with_report<F, E>(&self, join_point: &JoinPoint, operation: F) -> InvocationReport
    where
        F: FnOnce(&JoinPoint) -> Result<Value, E>,
        E: fmt::Display,
    {
        let started = self.clock.now();
        let operation_id = join_point.operation();
        let tracker = PhaseTracker::new(&operation_id);
        let mut advice_failures = Vec::new();
        self.metrics.record_invocation(&operation_id);

        tracker.enter(InvocationPhase::BeforeRunning);
        let proceeded = Cell::new(false);
        let mut panic_payload = None;
        let result = match self.run_before(join_point) {
            Err(failure) => {
                self.metrics.record_advice_failure();
                Err(InvocationError::BeforeAdvice(failure))
            }
            Ok(()) => {
                let original = || {
                    proceeded.set(true);
                    operation(join_point).map_err(|cause| {
                        tracing::debug!(
                            operation = %operation_id,
                            cause = %cause,
                            "original operation failed"
                        );
                        InvocationError::from(OperationFailure::new(operation_id.as_str(), cause))
                    })
                };

                let step = panic::catch_unwind(AssertUnwindSafe(|| {
                    match self.first_around(join_point) {
                        Some(around) => {
                            tracker.enter(InvocationPhase::AroundRunning);
                            around(ProceedingJoinPoint::new(join_point, original))
                        }
                        None => {
                            tracker.enter(InvocationPhase::OriginalRunning);
                            original()
                        }
                    }
                }));

                match step {
                    Ok(result) => result,
                    Err(payload) => {
                        let cause = match panic_message(payload.as_ref()) {
                            Some(message) => format!("operation panicked: {}", message),
                            None => "operation panicked".to_string(),
                        };
                        tracing::error!(
                            operation = %operation_id,
                            cause = %cause,
                            "operation panicked; running failure advice before resuming"
                        );
                        panic_payload = Some(payload);
                        Err(InvocationError::from(OperationFailure::new(
                            operation_id.as_str(),
                            cause,
                        )))
                    }
                }
            }
        };

        tracker.enter(if result.is_ok() {
            InvocationPhase::Succeeded
        } else {
            InvocationPhase::Failed
        });
        tracker.enter(InvocationPhase::AfterRunning);

        let result = match result {
            Ok(value) => {
                self.run_after_success(join_point, &value, &mut advice_failures);
                Ok(value)
            }
            Err(error) => Err(self.run_after_failure(join_point, error, &mut advice_failures)),
        };

        let outcome = match &result {
            Ok(value) => Outcome::Returned(value),
            Err(error) => Outcome::Failed(error),
        };
        self.run_after(join_point, outcome, &mut advice_failures);

        tracker.enter(InvocationPhase::Done);

        for failure in &advice_failures {
            self.metrics.record_advice_failure();
            tracing::warn!(
                operation = %operation_id,
                rule = failure.rule(),
                kind = %failure.kind(),
                error = %failure.error(),
                "after advice failed; outcome kept"
            );
        }

        let proceeded = proceeded.get();
        self.metrics.record_proceeded(proceeded);
        self.metrics.record_outcome(&operation_id, result.is_ok());

        let elapsed = self.clock.now().saturating_duration_since(started);
        tracing::trace!(
            operation = %operation_id,
            proceeded,
            success = result.is_ok(),
            elapsed_us = elapsed.as_micros() as u64,
            "invocation complete"
        );

        if let Some(payload) = panic_payload {
            panic::resume_unwind(payload);
        }

        InvocationReport {
            result,
            advice_failures,
            phases: tracker.into_phases(),
            proceeded,
            elapsed,
        }
    }

    /// Invoke `operation` on tokio's blocking pool.
    ///
    /// The whole invocation, advice included, runs on one blocking thread.
    /// A panic in the operation or in around advice is resumed in the caller.
    ///
    /// **Requires the `async` feature.**
    ///
    /// # Errors
    /// Same as [`invoke`](Self::invoke), plus `InvocationError::Aborted` if the
    /// runtime shut down before the invocation completed.
    #[cfg(feature = "async")]
    pub async fn spawn_invoke<F, E>(
        &self,
        join_point: JoinPoint,
        operation: F,
    ) -> Result<Value, InvocationError>
    where
        F: FnOnce(&JoinPoint) -> Result<Value, E> + Send + 'static,
        E: fmt::Display + 'static,
    {
        let interceptor = self.clone();
        let operation_id = join_point.operation();
        let handle =
            tokio::task::spawn_blocking(move || interceptor.invoke(&join_point, operation));

        match handle.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(_) => Err(InvocationError::Aborted {
                operation: operation_id,
            }),
        }
    }

    fn rules_of<'r, T>(
        &'r self,
        join_point: &JoinPoint,
        kind: AdviceKind,
        select: impl Fn(&'r Advice) -> Option<&'r T>,
    ) -> Vec<(&'r Rule, &'r T)> {
        self.registry
            .matching_rules(join_point, kind)
            .into_iter()
            .filter_map(|rule| select(rule.advice()).map(|f| (rule, f)))
            .collect()
    }

    fn run_before(&self, join_point: &JoinPoint) -> Result<(), AdviceFailure> {
        let befores = self.rules_of(join_point, AdviceKind::Before, |a| match a {
            Advice::Before(f) => Some(f),
            _ => None,
        });
        for (rule, f) in befores {
            guarded(rule, || f(join_point))?;
        }
        Ok(())
    }

    fn first_around(&self, join_point: &JoinPoint) -> Option<&AroundFn> {
        let arounds = self.rules_of(join_point, AdviceKind::Around, |a| match a {
            Advice::Around(f) => Some(f),
            _ => None,
        });
        let mut iter = arounds.into_iter();
        let (_, first) = iter.next()?;
        for (ignored, _) in iter {
            tracing::debug!(
                operation = %join_point.operation(),
                rule = ignored.name(),
                "additional around advice ignored; only the first registered applies"
            );
        }
        Some(first)
    }

    fn run_after_success(
        &self,
        join_point: &JoinPoint,
        value: &Value,
        failures: &mut Vec<AdviceFailure>,
    ) {
        let advices =
            self.rules_of(join_point, AdviceKind::AfterSuccess, |a| match a {
                Advice::AfterSuccess(f) => Some(f),
                _ => None,
            });
        for (rule, f) in advices {
            if let Err(failure) = guarded(rule, || f(join_point, value)) {
                failures.push(failure);
            }
        }
    }

    fn run_after_failure(
        &self,
        join_point: &JoinPoint,
        error: InvocationError,
        failures: &mut Vec<AdviceFailure>,
    ) -> InvocationError {
        let advices =
            self.rules_of(join_point, AdviceKind::AfterFailure, |a| match a {
                Advice::AfterFailure(f) => Some(f),
                _ => None,
            });
        let mut current = error;
        for (rule, f) in advices {
            match guarded(rule, || f(join_point, &current)) {
                Ok(FailureDisposition::Propagate) => {}
                Ok(FailureDisposition::Replace(replacement)) => {
                    tracing::debug!(
                        operation = %join_point.operation(),
                        rule = rule.name(),
                        "failure replaced by after-failure advice"
                    );
                    current = replacement;
                }
                Err(failure) => failures.push(failure),
            }
        }
        current
    }

    fn run_after(
        &self,
        join_point: &JoinPoint,
        outcome: Outcome<'_>,
        failures: &mut Vec<AdviceFailure>,
    ) {
        let advices = self.rules_of(join_point, AdviceKind::After, |a| match a {
            Advice::After(f) => Some(f),
            _ => None,
        });
        for (rule, f) in advices {
            if let Err(failure) = guarded(rule, || f(join_point, outcome)) {
                failures.push(failure);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::join_point::OperationSignature;
    use crate::infrastructure::mocks::MockClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    type Journal = Arc<Mutex<Vec<String>>>;

    fn join_point(id: i64) -> JoinPoint {
        JoinPoint::new(
            OperationSignature::new("shop::Orders", "place")
                .with_params(["i64"])
                .with_returns("String"),
            vec![Value::Int(id)],
        )
    }

    fn journaling_registry(journal: &Journal) -> AdviceRegistry {
        let (j1, j2, j3, j4) = (
            journal.clone(),
            journal.clone(),
            journal.clone(),
            journal.clone(),
        );
        AdviceRegistry::builder()
            .before("before", "within(shop::*)", move |_| {
                j1.lock().unwrap().push("before".into());
                Ok(())
            })
            .after("after", "within(shop::*)", move |_, outcome| {
                j2.lock()
                    .unwrap()
                    .push(format!("after(success={})", outcome.is_success()));
                Ok(())
            })
            .after_returning("returning", "within(shop::*)", move |_, value| {
                j3.lock().unwrap().push(format!("returning({})", value));
                Ok(())
            })
            .after_throwing("throwing", "within(shop::*)", move |_, error| {
                j4.lock().unwrap().push(format!("throwing({})", error));
                Ok(FailureDisposition::Propagate)
            })
            .build()
            .unwrap()
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    #[test]
    fn test_success_path_order() {
        let journal: Journal = Arc::default();
        let interceptor = Interceptor::new(journaling_registry(&journal));
        let j = journal.clone();

        let report = interceptor.invoke_with_report(&join_point(2), |jp| {
            j.lock().unwrap().push("original".into());
            Ok::<_, String>(Value::from(format!("placed {}", jp.args()[0])))
        });

        assert_eq!(report.result, Ok(Value::from("placed 2")));
        assert!(report.proceeded);
        assert!(report.advice_failures.is_empty());
        assert_eq!(
            entries(&journal),
            vec![
                "before",
                "original",
                "returning(placed 2)",
                "after(success=true)"
            ]
        );
        assert_eq!(
            report.phases,
            vec![
                InvocationPhase::Pending,
                InvocationPhase::BeforeRunning,
                InvocationPhase::OriginalRunning,
                InvocationPhase::Succeeded,
                InvocationPhase::AfterRunning,
                InvocationPhase::Done,
            ]
        );
    }

    #[test]
    fn test_failure_path_order() {
        let journal: Journal = Arc::default();
        let interceptor = Interceptor::new(journaling_registry(&journal));

        let result = interceptor.invoke(&join_point(2), |_| Err::<Value, _>("disk full"));

        let error = result.unwrap_err();
        assert!(error.is_operation_failure());
        assert!(!error.to_string().contains("disk full"));
        assert_eq!(
            entries(&journal),
            vec![
                "before",
                "throwing(invocation of `shop::Orders::place` failed)",
                "after(success=false)"
            ]
        );
    }

    #[test]
    fn test_unadvised_operation_runs_once() {
        let interceptor = Interceptor::new(AdviceRegistry::empty());
        let calls = AtomicUsize::new(0);

        let result = interceptor.invoke(&join_point(1), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(Value::Unit)
        });

        assert_eq!(result, Ok(Value::Unit));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_around_short_circuit_skips_original() {
        let registry = AdviceRegistry::builder()
            .around("reject", "within(shop::*)", |pjp| {
                if pjp.args()[0].as_i64().unwrap_or(0) > 0 {
                    pjp.proceed()
                } else {
                    Ok(Value::from("rejected"))
                }
            })
            .build()
            .unwrap();
        let interceptor = Interceptor::new(registry);
        let calls = AtomicUsize::new(0);
        let op = |_: &JoinPoint| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(Value::from("ran"))
        };

        let rejected = interceptor.invoke_with_report(&join_point(-1), op);
        assert_eq!(rejected.result, Ok(Value::from("rejected")));
        assert!(!rejected.proceeded);
        assert!(rejected.phases.contains(&InvocationPhase::AroundRunning));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let accepted = interceptor.invoke_with_report(&join_point(1), op);
        assert_eq!(accepted.result, Ok(Value::from("ran")));
        assert!(accepted.proceeded);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(interceptor.metrics().short_circuited(), 1);
        assert_eq!(interceptor.metrics().proceeded(), 1);
    }

    #[test]
    fn test_only_first_around_applies() {
        let registry = AdviceRegistry::builder()
            .around("first", "within(shop::*)", |pjp| {
                let value = pjp.proceed()?;
                Ok(Value::from(format!("first({})", value)))
            })
            .around("second", "within(shop::*)", |_| Ok(Value::from("second")))
            .build()
            .unwrap();
        let interceptor = Interceptor::new(registry);

        let result = interceptor.invoke(&join_point(1), |_| Ok::<_, String>(Value::from("x")));
        assert_eq!(result, Ok(Value::from("first(x)")));
    }

    #[test]
    fn test_around_error_takes_failure_path() {
        let journal: Journal = Arc::default();
        let j = journal.clone();
        let registry = AdviceRegistry::builder()
            .around("deny", "within(shop::*)", |_| {
                Err(InvocationError::rejected("closed"))
            })
            .after_throwing("throwing", "within(shop::*)", move |_, error| {
                j.lock().unwrap().push(error.to_string());
                Ok(FailureDisposition::Propagate)
            })
            .build()
            .unwrap();

        let result =
            Interceptor::new(registry).invoke(&join_point(1), |_| Ok::<_, String>(Value::Unit));
        assert_eq!(result, Err(InvocationError::rejected("closed")));
        assert_eq!(entries(&journal), vec!["invocation rejected: closed"]);
    }

    #[test]
    fn test_before_failure_aborts_but_after_runs() {
        let journal: Journal = Arc::default();
        let (j1, j2) = (journal.clone(), journal.clone());
        let registry = AdviceRegistry::builder()
            .before("guard", "within(shop::*)", |_| Err(AdviceError::new("denied")))
            .before("never", "within(shop::*)", move |_| {
                j1.lock().unwrap().push("second before".into());
                Ok(())
            })
            .after("after", "within(shop::*)", move |_, outcome| {
                j2.lock()
                    .unwrap()
                    .push(format!("after(success={})", outcome.is_success()));
                Ok(())
            })
            .build()
            .unwrap();
        let interceptor = Interceptor::new(registry);
        let calls = AtomicUsize::new(0);

        let report = interceptor.invoke_with_report(&join_point(1), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(Value::Unit)
        });

        match report.result {
            Err(InvocationError::BeforeAdvice(ref failure)) => {
                assert_eq!(failure.rule(), "guard");
                assert_eq!(failure.kind(), AdviceKind::Before);
            }
            ref other => panic!("expected before advice failure, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!report.proceeded);
        assert_eq!(entries(&journal), vec!["after(success=false)"]);
        assert_eq!(
            report.phases,
            vec![
                InvocationPhase::Pending,
                InvocationPhase::BeforeRunning,
                InvocationPhase::Failed,
                InvocationPhase::AfterRunning,
                InvocationPhase::Done,
            ]
        );
    }

    #[test]
    fn test_after_failures_do_not_change_outcome() {
        let registry = AdviceRegistry::builder()
            .after_returning("broken-returning", "within(shop::*)", |_, _| {
                Err(AdviceError::new("sink unavailable"))
            })
            .after("panicking-after", "within(shop::*)", |_, _| {
                panic!("advice bug");
            })
            .build()
            .unwrap();
        let interceptor = Interceptor::new(registry);

        let report =
            interceptor.invoke_with_report(&join_point(1), |_| Ok::<_, String>(Value::from("ok")));

        assert_eq!(report.result, Ok(Value::from("ok")));
        assert_eq!(report.advice_failures.len(), 2);
        assert_eq!(report.advice_failures[0].rule(), "broken-returning");
        assert_eq!(report.advice_failures[0].kind(), AdviceKind::AfterSuccess);
        assert_eq!(report.advice_failures[1].rule(), "panicking-after");
        assert_eq!(report.advice_failures[1].error().message(), "advice panicked");
        assert_eq!(interceptor.metrics().advice_failures(), 2);
    }

    #[test]
    fn test_after_failure_can_replace_error() {
        let seen: Journal = Arc::default();
        let s = seen.clone();
        let registry = AdviceRegistry::builder()
            .after_throwing("translate", "within(shop::*)", |_, _| {
                Ok(FailureDisposition::Replace(InvocationError::rejected(
                    "service unavailable",
                )))
            })
            .after_throwing("observe", "within(shop::*)", move |_, error| {
                s.lock().unwrap().push(error.to_string());
                Ok(FailureDisposition::Propagate)
            })
            .build()
            .unwrap();

        let result = Interceptor::new(registry).invoke(&join_point(1), |_| Err::<Value, _>("boom"));

        assert_eq!(result, Err(InvocationError::rejected("service unavailable")));
        assert_eq!(entries(&seen), vec!["invocation rejected: service unavailable"]);
    }

    #[test]
    fn test_elapsed_uses_clock() {
        let clock = MockClock::new(Instant::now());
        let interceptor = Interceptor::new(AdviceRegistry::empty()).with_clock(Arc::new(clock.clone()));

        let report = interceptor.invoke_with_report(&join_point(1), |_| {
            clock.advance(Duration::from_millis(500));
            Ok::<_, String>(Value::Unit)
        });

        assert_eq!(report.elapsed, Duration::from_millis(500));
    }

    #[test]
    fn test_metrics_count_outcomes() {
        let interceptor = Interceptor::new(AdviceRegistry::empty());
        let _ = interceptor.invoke(&join_point(1), |_| Ok::<_, String>(Value::Unit));
        let _ = interceptor.invoke(&join_point(1), |_| Err::<Value, _>("nope"));

        let snapshot = interceptor.metrics().snapshot();
        assert_eq!(snapshot.invocations, 2);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(interceptor.metrics().operation_failures("shop::Orders::place"), 1);
    }

    #[test]
    fn test_interceptor_is_shareable_across_threads() {
        use std::thread;

        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let registry = AdviceRegistry::builder()
            .before("count", "within(shop::*)", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap();
        let interceptor = Interceptor::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let interceptor = interceptor.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let jp = join_point(i);
                        interceptor
                            .invoke(&jp, |jp| Ok::<_, String>(jp.args()[0].clone()))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 400);
        assert_eq!(interceptor.metrics().invocations(), 400);
    }
}
