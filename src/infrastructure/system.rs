//! Adapters backed by the operating system.
//!
//! `SystemClock` reads the monotonic clock and `SystemDelay` blocks the
//! calling thread. Test doubles for both live in `crate::infrastructure::mocks`
//! behind the `test-helpers` feature.

use crate::application::ports::{Clock, Delay, Interrupted};
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic wall clock used to time invocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Delay implementation using `thread::sleep`.
///
/// A sleeping thread cannot be interrupted, so `pause` always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDelay;

impl SystemDelay {
    /// Create a new system delay.
    pub fn new() -> Self {
        Self
    }
}

impl Delay for SystemDelay {
    fn pause(&self, duration: Duration) -> Result<(), Interrupted> {
        thread::sleep(duration);
        Ok(())
    }
}
