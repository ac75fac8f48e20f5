//! Advised proxy around a parcel service.

use crate::application::catalog::{CatalogError, OperationCatalog, OperationDecl};
use crate::application::interceptor::Interceptor;
use crate::application::registry::AdviceRegistry;
use crate::domain::value::Value;
use crate::parcel::aspect::{self, AspectError};
use crate::parcel::service::{
    declare_operations, ParcelError, ParcelService, ParcelServiceImpl, ORDER_PACKAGE,
    TRACK_PACKAGE,
};
use std::fmt;
use std::sync::Arc;

/// Error returned when an advised parcel service cannot be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// The parcel advice could not be assembled
    Aspect(AspectError),
    /// The service operations could not be declared
    Catalog(CatalogError),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::Aspect(e) => write!(f, "{}", e),
            SetupError::Catalog(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Aspect(e) => Some(e),
            SetupError::Catalog(e) => Some(e),
        }
    }
}

impl From<AspectError> for SetupError {
    fn from(e: AspectError) -> Self {
        SetupError::Aspect(e)
    }
}

impl From<CatalogError> for SetupError {
    fn from(e: CatalogError) -> Self {
        SetupError::Catalog(e)
    }
}

/// A parcel service whose calls go through an interceptor.
///
/// # Examples
///
/// ```
/// use tracing_advice::parcel::{AdvisedParcelService, ParcelService, ParcelServiceImpl};
///
/// let service = AdvisedParcelService::with_parcel_aspect(ParcelServiceImpl::default()).unwrap();
/// assert_eq!(
///     service.track_package(-34).unwrap(),
///     "Cannot call method with negative Id "
/// );
/// ```
#[derive(Debug)]
pub struct AdvisedParcelService<S = ParcelServiceImpl> {
    target: Arc<S>,
    interceptor: Interceptor,
    order: OperationDecl,
    track: OperationDecl,
}

impl<S> Clone for AdvisedParcelService<S> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            interceptor: self.interceptor.clone(),
            order: self.order.clone(),
            track: self.track.clone(),
        }
    }
}

impl<S: ParcelService> AdvisedParcelService<S> {
    /// Proxy `target` through an interceptor over `registry`.
    ///
    /// # Errors
    /// Returns `SetupError::Catalog` if the operations cannot be declared.
    pub fn new(target: S, registry: AdviceRegistry) -> Result<Self, SetupError> {
        Self::with_interceptor(target, Interceptor::new(registry))
    }

    /// Proxy `target` with the shipped parcel advice.
    ///
    /// # Errors
    /// Returns `SetupError` if the advice cannot be assembled.
    pub fn with_parcel_aspect(target: S) -> Result<Self, SetupError> {
        Self::new(target, aspect::registry()?)
    }

    /// Proxy `target` through an existing interceptor.
    ///
    /// # Errors
    /// Returns `SetupError::Catalog` if the operations cannot be declared.
    pub fn with_interceptor(target: S, interceptor: Interceptor) -> Result<Self, SetupError> {
        let mut catalog = OperationCatalog::new();
        declare_operations(&mut catalog)?;
        let lookup = |operation: &str| {
            catalog
                .get(operation)
                .cloned()
                .ok_or_else(|| CatalogError::UnknownOperation(operation.to_string()))
        };

        Ok(Self {
            order: lookup(ORDER_PACKAGE)?,
            track: lookup(TRACK_PACKAGE)?,
            target: Arc::new(target),
            interceptor,
        })
    }

    /// Get the interceptor.
    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// Get the proxied service.
    pub fn target(&self) -> &S {
        &self.target
    }

    fn call<F>(&self, decl: &OperationDecl, id: i64, f: F) -> Result<String, ParcelError>
    where
        F: FnOnce(&S, i64) -> Result<String, ParcelError>,
    {
        let join_point = decl.join_point(vec![Value::Int(id)]);
        let value = self
            .interceptor
            .invoke(&join_point, |_| f(self.target.as_ref(), id).map(Value::from))?;
        Ok(value.into_string())
    }
}

#[cfg(feature = "async")]
impl<S: ParcelService + 'static> AdvisedParcelService<S> {
    /// Advised `order_package` on tokio's blocking pool.
    ///
    /// **Requires the `async` feature.**
    ///
    /// # Errors
    /// Same as [`ParcelService::order_package`].
    pub async fn order_package_async(&self, id: i64) -> Result<String, ParcelError> {
        let target = Arc::clone(&self.target);
        self.spawn_call(&self.order, id, move |id| target.order_package(id))
            .await
    }

    /// Advised `track_package` on tokio's blocking pool.
    ///
    /// **Requires the `async` feature.**
    ///
    /// # Errors
    /// Same as [`ParcelService::track_package`].
    pub async fn track_package_async(&self, id: i64) -> Result<String, ParcelError> {
        let target = Arc::clone(&self.target);
        self.spawn_call(&self.track, id, move |id| target.track_package(id))
            .await
    }

    async fn spawn_call<F>(&self, decl: &OperationDecl, id: i64, f: F) -> Result<String, ParcelError>
    where
        F: FnOnce(i64) -> Result<String, ParcelError> + Send + 'static,
    {
        let join_point = decl.join_point(vec![Value::Int(id)]);
        let value = self
            .interceptor
            .spawn_invoke(join_point, move |_| f(id).map(Value::from))
            .await?;
        Ok(value.into_string())
    }
}

impl<S: ParcelService> ParcelService for AdvisedParcelService<S> {
    fn order_package(&self, id: i64) -> Result<String, ParcelError> {
        self.call(&self.order, id, S::order_package)
    }

    fn track_package(&self, id: i64) -> Result<String, ParcelError> {
        self.call(&self.track, id, S::track_package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockDelay;
    use crate::parcel::aspect::REJECTION;
    use crate::parcel::service::{ORDER_WAIT, TRACK_WAIT};

    fn advised() -> (AdvisedParcelService, MockDelay) {
        let delay = MockDelay::new();
        let service = AdvisedParcelService::with_parcel_aspect(ParcelServiceImpl::new(Arc::new(
            delay.clone(),
        )))
        .unwrap();
        (service, delay)
    }

    #[test]
    fn test_positive_id_reaches_service() {
        let (service, delay) = advised();

        assert_eq!(
            service.track_package(2).unwrap(),
            "Track Package Successfully with id : 2"
        );
        assert_eq!(
            service.order_package(5).unwrap(),
            "Order Packaged Successfully with Id : 5"
        );
        assert_eq!(delay.pauses(), vec![TRACK_WAIT, ORDER_WAIT]);
    }

    #[test]
    fn test_non_positive_id_is_rejected() {
        let (service, delay) = advised();

        assert_eq!(service.order_package(-34).unwrap(), REJECTION);
        assert_eq!(service.track_package(0).unwrap(), REJECTION);
        assert!(delay.pauses().is_empty());
        assert_eq!(service.interceptor().metrics().short_circuited(), 2);
    }

    #[test]
    fn test_internal_failure_is_wrapped() {
        let (service, delay) = advised();
        delay.interrupt_next();

        let err = service.order_package(3).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("invocation of `{}` failed", ORDER_PACKAGE)
        );
        assert!(!err.to_string().contains("interrupted"));
    }

    #[test]
    fn test_unadvised_proxy_delegates() {
        let delay = MockDelay::new();
        let service = AdvisedParcelService::new(
            ParcelServiceImpl::new(Arc::new(delay.clone())),
            AdviceRegistry::empty(),
        )
        .unwrap();

        assert_eq!(
            service.track_package(-1).unwrap(),
            "Track Package Successfully with id : -1"
        );
        assert_eq!(
            service.target().track_package(1).unwrap(),
            "Track Package Successfully with id : 1"
        );
    }
}
