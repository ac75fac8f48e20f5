//! The parcel service: two operations that simulate work and describe it.

use crate::application::catalog::{CatalogError, OperationCatalog, OperationDecl};
use crate::application::ports::{Delay, Interrupted};
use crate::domain::error::InvocationError;
use crate::domain::join_point::OperationSignature;
use crate::infrastructure::system::SystemDelay;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Module holding the service implementation, as used in pointcut patterns.
pub const MODULE: &str = module_path!();

/// Scope of the service operations.
pub const SCOPE: &str = concat!(module_path!(), "::ParcelServiceImpl");

/// Identifier of `order_package`.
pub const ORDER_PACKAGE: &str = concat!(module_path!(), "::ParcelServiceImpl::order_package");

/// Identifier of `track_package`.
pub const TRACK_PACKAGE: &str = concat!(module_path!(), "::ParcelServiceImpl::track_package");

/// Marker declared on operations that run in a transaction.
pub const TRANSACTIONAL: &str = "transactional";

/// Simulated duration of `order_package`.
pub const ORDER_WAIT: Duration = Duration::from_millis(1000);

/// Simulated duration of `track_package`.
pub const TRACK_WAIT: Duration = Duration::from_millis(500);

/// Error returned by parcel operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelError {
    /// The simulated work was interrupted
    Interrupted(Interrupted),
    /// The advised call failed
    Invocation(InvocationError),
}

impl fmt::Display for ParcelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParcelError::Interrupted(e) => write!(f, "parcel operation interrupted: {}", e),
            ParcelError::Invocation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ParcelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParcelError::Interrupted(e) => Some(e),
            ParcelError::Invocation(e) => Some(e),
        }
    }
}

impl From<Interrupted> for ParcelError {
    fn from(e: Interrupted) -> Self {
        ParcelError::Interrupted(e)
    }
}

impl From<InvocationError> for ParcelError {
    fn from(e: InvocationError) -> Self {
        ParcelError::Invocation(e)
    }
}

/// Parcel operations.
pub trait ParcelService: Send + Sync {
    /// Package an order.
    fn order_package(&self, id: i64) -> Result<String, ParcelError>;

    /// Look up where a package is.
    fn track_package(&self, id: i64) -> Result<String, ParcelError>;
}

/// The plain, unadvised service.
#[derive(Debug, Clone)]
pub struct ParcelServiceImpl {
    delay: Arc<dyn Delay>,
}

impl ParcelServiceImpl {
    /// Create a service that waits through `delay`.
    pub fn new(delay: Arc<dyn Delay>) -> Self {
        Self { delay }
    }
}

impl Default for ParcelServiceImpl {
    fn default() -> Self {
        Self::new(Arc::new(SystemDelay::new()))
    }
}

impl ParcelService for ParcelServiceImpl {
    fn order_package(&self, id: i64) -> Result<String, ParcelError> {
        self.delay.pause(ORDER_WAIT)?;
        tracing::info!(id, "Order is Processing ...");
        Ok(format!("Order Packaged Successfully with Id : {}", id))
    }

    fn track_package(&self, id: i64) -> Result<String, ParcelError> {
        self.delay.pause(TRACK_WAIT)?;
        tracing::info!(id, "Tracking is processing");
        Ok(format!("Track Package Successfully with id : {}", id))
    }
}

/// Declare the service operations and their markers.
///
/// # Errors
/// Returns `CatalogError::DuplicateOperation` if they are already declared.
pub fn declare_operations(catalog: &mut OperationCatalog) -> Result<(), CatalogError> {
    let signature = |name: &str| {
        OperationSignature::new(SCOPE, name)
            .with_params(["i64"])
            .with_returns("String")
    };
    catalog.declare(OperationDecl::new(signature("order_package")).with_marker(TRANSACTIONAL))?;
    catalog.declare(OperationDecl::new(signature("track_package")))?;
    Ok(())
}
