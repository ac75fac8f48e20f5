//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use std::fmt::{self, Debug};
use std::time::{Duration, Instant};

/// Port for obtaining current time.
///
/// The interceptor uses it to measure how long each advised invocation takes.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// The wait was interrupted before the full duration elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interrupted {
    /// Time waited before the interruption
    pub waited: Duration,
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wait interrupted after {:?}", self.waited)
    }
}

impl std::error::Error for Interrupted {}

/// Port for waiting.
///
/// Operations that simulate work pause through this port so tests can replace
/// real sleeps. Infrastructure provides concrete implementations
/// (SystemDelay, MockDelay).
pub trait Delay: Send + Sync + Debug {
    /// Block the calling thread for `duration`.
    ///
    /// # Errors
    /// Returns `Interrupted` if the wait was cut short.
    fn pause(&self, duration: Duration) -> Result<(), Interrupted>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_display() {
        let err = Interrupted {
            waited: Duration::from_millis(20),
        };
        assert_eq!(err.to_string(), "wait interrupted after 20ms");
    }
}
