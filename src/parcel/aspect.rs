//! Advice applied to the parcel service.
//!
//! Registration order:
//! 1. method logging (before, after, after-returning, after-throwing) on every
//!    service operation,
//! 2. identifier validation, an around advice that answers with
//!    [`REJECTION`] instead of calling the service when the id is not positive,
//! 3. transaction logging (before, after) on operations declaring the
//!    `transactional` marker.

use crate::application::registry::{AdviceRegistry, AdviceRegistryBuilder, BuildError};
use crate::domain::advice::AdviceKind;
use crate::domain::error::InvocationError;
use crate::domain::value::Value;
use crate::infrastructure::logging::{LoggingAspect, LoggingConfigError};
use crate::parcel::service::{MODULE, TRANSACTIONAL};
use std::fmt;

/// Result returned in place of the service call when the id is not positive.
pub const REJECTION: &str = "Cannot call method with negative Id ";

/// Named pointcut selecting every parcel service operation.
pub const SERVICE_POINTCUT: &str = "parcel_service";

/// Named pointcut selecting transactional operations.
pub const TRANSACTION_POINTCUT: &str = "transaction";

/// Name of the identifier validation rule.
pub const VALIDATE_ID_RULE: &str = "validate_id";

/// Error returned when the parcel aspect cannot be assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AspectError {
    /// A logging aspect configuration is invalid
    Logging(LoggingConfigError),
    /// The registry could not be built
    Registry(BuildError),
}

impl fmt::Display for AspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectError::Logging(e) => write!(f, "invalid logging aspect: {}", e),
            AspectError::Registry(e) => write!(f, "invalid advice registry: {}", e),
        }
    }
}

impl std::error::Error for AspectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AspectError::Logging(e) => Some(e),
            AspectError::Registry(e) => Some(e),
        }
    }
}

impl From<LoggingConfigError> for AspectError {
    fn from(e: LoggingConfigError) -> Self {
        AspectError::Logging(e)
    }
}

impl From<BuildError> for AspectError {
    fn from(e: BuildError) -> Self {
        AspectError::Registry(e)
    }
}

/// Expression of the service pointcut: any operation of any type in the
/// service module, whatever it returns and takes.
pub fn service_expression() -> String {
    format!("execution(* {}::*::*(..))", MODULE)
}

/// Register the parcel advice on a builder.
///
/// # Errors
/// Returns `AspectError::Logging` if a logging aspect is misconfigured.
pub fn register(builder: AdviceRegistryBuilder) -> Result<AdviceRegistryBuilder, AspectError> {
    let service = format!("{}()", SERVICE_POINTCUT);
    let transaction = format!("{}()", TRANSACTION_POINTCUT);

    let method_logging = LoggingAspect::builder(service.as_str())
        .with_label("Method")
        .build()?;
    let transaction_logging = LoggingAspect::builder(transaction.as_str())
        .with_label("Transaction")
        .with_kinds([AdviceKind::Before, AdviceKind::After])
        .build()?;

    let builder = builder
        .define_pointcut(SERVICE_POINTCUT, service_expression())
        .define_pointcut(TRANSACTION_POINTCUT, format!("@annotation({})", TRANSACTIONAL));
    let builder = method_logging
        .apply(builder)
        .around(VALIDATE_ID_RULE, service.as_str(), |pjp| {
            let id = pjp
                .args()
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| InvocationError::rejected("missing numeric id"))?;
            if id > 0 {
                pjp.proceed()
            } else {
                tracing::debug!(id, "identifier rejected");
                Ok(Value::from(REJECTION))
            }
        });
    Ok(transaction_logging.apply(builder))
}

/// Build a registry holding only the parcel advice.
///
/// # Errors
/// Returns `AspectError` if the advice cannot be assembled.
pub fn registry() -> Result<AdviceRegistry, AspectError> {
    Ok(register(AdviceRegistry::builder())?.build()?)
}
