//! Advice kinds and the callbacks that implement them.
//!
//! An [`Advice`] is one piece of logic run relative to a matched operation
//! call. Only [`Advice::Around`] may change control flow; the after-failure
//! kind may additionally replace the propagated error through an explicit
//! [`FailureDisposition::Replace`].

use crate::domain::error::InvocationError;
use crate::domain::join_point::JoinPoint;
use crate::domain::value::Value;
use std::fmt;
use std::sync::Arc;

/// When an advice runs relative to the advised call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AdviceKind {
    /// Before the call
    Before,
    /// After the call, whatever its outcome
    After,
    /// After the call returned normally
    AfterSuccess,
    /// After the call failed
    AfterFailure,
    /// Wrapping the call
    Around,
}

impl AdviceKind {
    /// Every advice kind, in execution order.
    pub const ALL: [AdviceKind; 5] = [
        AdviceKind::Before,
        AdviceKind::Around,
        AdviceKind::AfterSuccess,
        AdviceKind::AfterFailure,
        AdviceKind::After,
    ];

    /// Whether the kind runs once the outcome is known.
    pub fn is_after_family(self) -> bool {
        matches!(
            self,
            AdviceKind::After | AdviceKind::AfterSuccess | AdviceKind::AfterFailure
        )
    }

    /// Stable snake_case name, used as the `kind` field of log records.
    pub fn as_str(self) -> &'static str {
        match self {
            AdviceKind::Before => "before",
            AdviceKind::After => "after",
            AdviceKind::AfterSuccess => "after_success",
            AdviceKind::AfterFailure => "after_failure",
            AdviceKind::Around => "around",
        }
    }
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by an advice callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceError {
    message: String,
}

impl AdviceError {
    /// Create an advice error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AdviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AdviceError {}

impl From<&str> for AdviceError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for AdviceError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Outcome of an advised call, as seen by unconditional after advice.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    /// The call returned a value
    Returned(&'a Value),
    /// The call failed
    Failed(&'a InvocationError),
}

impl Outcome<'_> {
    /// Whether the call returned normally.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Returned(_))
    }
}

/// What an after-failure advice wants done with the failure it observed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureDisposition {
    /// Leave the failure as it is
    Propagate,
    /// Propagate this error instead
    Replace(InvocationError),
}

/// Handle to the original call, handed to around advice.
///
/// Consuming the handle with [`proceed`](Self::proceed) runs the original
/// operation, so it can run at most once per invocation. Dropping the handle
/// without proceeding short-circuits the call.
pub struct ProceedingJoinPoint<'a> {
    join_point: &'a JoinPoint,
    original: Box<dyn FnOnce() -> Result<Value, InvocationError> + 'a>,
}

impl<'a> ProceedingJoinPoint<'a> {
    pub(crate) fn new<F>(join_point: &'a JoinPoint, original: F) -> Self
    where
        F: FnOnce() -> Result<Value, InvocationError> + 'a,
    {
        Self {
            join_point,
            original: Box::new(original),
        }
    }

    /// The join point being advised.
    pub fn join_point(&self) -> &JoinPoint {
        self.join_point
    }

    /// Arguments of the advised call.
    pub fn args(&self) -> &[Value] {
        self.join_point.args()
    }

    /// Run the original operation and return its outcome.
    pub fn proceed(self) -> Result<Value, InvocationError> {
        (self.original)()
    }
}

impl fmt::Debug for ProceedingJoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProceedingJoinPoint")
            .field("join_point", self.join_point)
            .field("original", &"<fn>")
            .finish()
    }
}

/// Callback run before the call.
pub type BeforeFn = Arc<dyn Fn(&JoinPoint) -> Result<(), AdviceError> + Send + Sync>;

/// Callback run after the call, whatever its outcome.
pub type AfterFn = Arc<dyn Fn(&JoinPoint, Outcome<'_>) -> Result<(), AdviceError> + Send + Sync>;

/// Callback run after the call returned a value.
pub type AfterSuccessFn = Arc<dyn Fn(&JoinPoint, &Value) -> Result<(), AdviceError> + Send + Sync>;

/// Callback run after the call failed.
pub type AfterFailureFn = Arc<
    dyn Fn(&JoinPoint, &InvocationError) -> Result<FailureDisposition, AdviceError> + Send + Sync,
>;

/// Callback wrapping the call.
pub type AroundFn =
    Arc<dyn Fn(ProceedingJoinPoint<'_>) -> Result<Value, InvocationError> + Send + Sync>;

/// A piece of logic run relative to a matched call.
#[derive(Clone)]
pub enum Advice {
    /// Runs before the call; an error aborts the call
    Before(BeforeFn),
    /// Runs exactly once after the call
    After(AfterFn),
    /// Runs after a successful call and sees the returned value
    AfterSuccess(AfterSuccessFn),
    /// Runs after a failed call and sees the failure
    AfterFailure(AfterFailureFn),
    /// Wraps the call and decides whether it happens
    Around(AroundFn),
}

impl Advice {
    /// Create before advice.
    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint) -> Result<(), AdviceError> + Send + Sync + 'static,
    {
        Advice::Before(Arc::new(f))
    }

    /// Create unconditional after advice.
    pub fn after<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint, Outcome<'_>) -> Result<(), AdviceError> + Send + Sync + 'static,
    {
        Advice::After(Arc::new(f))
    }

    /// Create after-success advice.
    pub fn after_returning<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint, &Value) -> Result<(), AdviceError> + Send + Sync + 'static,
    {
        Advice::AfterSuccess(Arc::new(f))
    }

    /// Create after-failure advice.
    pub fn after_throwing<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint, &InvocationError) -> Result<FailureDisposition, AdviceError>
            + Send
            + Sync
            + 'static,
    {
        Advice::AfterFailure(Arc::new(f))
    }

    /// Create around advice.
    pub fn around<F>(f: F) -> Self
    where
        F: Fn(ProceedingJoinPoint<'_>) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Advice::Around(Arc::new(f))
    }

    /// Kind of this advice.
    pub fn kind(&self) -> AdviceKind {
        match self {
            Advice::Before(_) => AdviceKind::Before,
            Advice::After(_) => AdviceKind::After,
            Advice::AfterSuccess(_) => AdviceKind::AfterSuccess,
            Advice::AfterFailure(_) => AdviceKind::AfterFailure,
            Advice::Around(_) => AdviceKind::Around,
        }
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Advice").field(&self.kind()).finish()
    }
}
