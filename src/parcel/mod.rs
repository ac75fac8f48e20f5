//! Parcel demonstration service.
//!
//! Two operations, `order_package` and `track_package`, that simulate work
//! and describe it. [`AdvisedParcelService`] routes them through an
//! [`Interceptor`](crate::Interceptor) carrying the advice from [`aspect`]:
//! method logging, identifier validation and transaction logging for
//! `order_package`, which declares the `transactional` marker.

pub mod aspect;
pub mod proxy;
pub mod service;

pub use aspect::{AspectError, REJECTION};
pub use proxy::{AdvisedParcelService, SetupError};
pub use service::{ParcelError, ParcelService, ParcelServiceImpl};
