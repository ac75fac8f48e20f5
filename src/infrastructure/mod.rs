//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - System clock and thread-sleep delay
//! - Logging aspect (advice emitting `tracing` events)

pub mod logging;
pub mod system;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles for clocks,
/// delays and captured log records.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// tracing-advice = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
