//! Errors surfaced by advised invocations.
//!
//! Callers see the outcome of the advised call. Operation failures are
//! wrapped so that their internal detail is never rendered to the caller; the
//! detail stays available to after-failure advice through
//! [`OperationFailure::cause`].

use crate::domain::advice::{AdviceError, AdviceKind};
use std::fmt;

/// An advice callback failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceFailure {
    rule: String,
    kind: AdviceKind,
    error: AdviceError,
}

impl AdviceFailure {
    /// Create a failure record for a rule.
    pub fn new(rule: impl Into<String>, kind: AdviceKind, error: AdviceError) -> Self {
        Self {
            rule: rule.into(),
            kind,
            error,
        }
    }

    /// Name of the rule whose advice failed.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Kind of the failed advice.
    pub fn kind(&self) -> AdviceKind {
        self.kind
    }

    /// The advice error.
    pub fn error(&self) -> &AdviceError {
        &self.error
    }
}

impl fmt::Display for AdviceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} advice `{}` failed: {}",
            self.kind, self.rule, self.error
        )
    }
}

impl std::error::Error for AdviceFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// The original operation failed.
///
/// `Display` only names the operation. The underlying cause is kept for
/// advice and diagnostics and is never exposed as `source()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    operation: String,
    cause: String,
}

impl OperationFailure {
    /// Wrap the failure of an operation.
    pub fn new(operation: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Fully-qualified identifier of the failed operation.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Rendered internal cause.
    pub fn cause(&self) -> &str {
        &self.cause
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invocation of `{}` failed", self.operation)
    }
}

impl std::error::Error for OperationFailure {}

/// Error returned to the caller of an advised invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// A before advice failed; the original operation did not run
    BeforeAdvice(AdviceFailure),
    /// The original operation failed
    Operation(OperationFailure),
    /// An around advice (or an after-failure replacement) rejected the call
    Rejected {
        /// Why the call was rejected
        reason: String,
    },
    /// The task running the invocation was torn down before completing
    Aborted {
        /// Fully-qualified identifier of the operation
        operation: String,
    },
}

impl InvocationError {
    /// Create a rejection.
    pub fn rejected(reason: impl Into<String>) -> Self {
        InvocationError::Rejected {
            reason: reason.into(),
        }
    }

    /// Whether the original operation itself failed.
    pub fn is_operation_failure(&self) -> bool {
        matches!(self, InvocationError::Operation(_))
    }
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationError::BeforeAdvice(failure) => {
                write!(f, "invocation aborted: {}", failure)
            }
            InvocationError::Operation(failure) => write!(f, "{}", failure),
            InvocationError::Rejected { reason } => write!(f, "invocation rejected: {}", reason),
            InvocationError::Aborted { operation } => {
                write!(f, "invocation of `{}` was aborted", operation)
            }
        }
    }
}

impl std::error::Error for InvocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InvocationError::BeforeAdvice(failure) => Some(failure),
            InvocationError::Operation(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<OperationFailure> for InvocationError {
    fn from(failure: OperationFailure) -> Self {
        InvocationError::Operation(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_operation_failure_hides_cause() {
        let failure = OperationFailure::new("shop::Orders::place", "connection reset by peer");
        let error = InvocationError::from(failure.clone());

        assert_eq!(error.to_string(), "invocation of `shop::Orders::place` failed");
        assert!(!error.to_string().contains("connection reset"));
        assert_eq!(failure.cause(), "connection reset by peer");
        assert!(failure.source().is_none());
        assert!(error.is_operation_failure());
    }

    #[test]
    fn test_before_advice_display_and_source() {
        let failure = AdviceFailure::new("audit", AdviceKind::Before, AdviceError::new("denied"));
        let error = InvocationError::BeforeAdvice(failure);

        assert_eq!(
            error.to_string(),
            "invocation aborted: before advice `audit` failed: denied"
        );
        assert!(error.source().is_some());
        assert!(!error.is_operation_failure());
    }

    #[test]
    fn test_rejected_and_aborted_display() {
        assert_eq!(
            InvocationError::rejected("negative id").to_string(),
            "invocation rejected: negative id"
        );
        assert_eq!(
            InvocationError::Aborted {
                operation: "shop::ping".to_string()
            }
            .to_string(),
            "invocation of `shop::ping` was aborted"
        );
    }
}
