//! Application layer - orchestration of domain logic.
//!
//! This layer decides which advice applies to a call and runs it:
//! - Advice registry (ordered, immutable rules)
//! - Operation catalog (declared signatures and markers)
//! - Interceptor (per-invocation advice execution)
//! - Metrics (invocation and advice counters)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod catalog;
pub mod interceptor;
pub mod metrics;
pub mod ports;
pub mod registry;
