//! Mock delay for testing.

use crate::application::ports::{Delay, Interrupted};
use crate::infrastructure::mocks::MockClock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock delay that records requested waits instead of sleeping.
///
/// Clones share the recorded waits. When linked to a [`MockClock`], each
/// completed wait advances that clock, so elapsed times stay realistic.
///
/// # Examples
///
/// ```
/// use tracing_advice::application::ports::{Clock, Delay};
/// use tracing_advice::infrastructure::mocks::{MockClock, MockDelay};
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
/// let delay = MockDelay::new().with_clock(clock.clone());
///
/// delay.pause(Duration::from_millis(500)).unwrap();
/// assert_eq!(delay.pauses(), vec![Duration::from_millis(500)]);
/// assert_eq!(clock.now(), start + Duration::from_millis(500));
///
/// delay.interrupt_next();
/// assert!(delay.pause(Duration::from_secs(1)).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    pauses: Arc<Mutex<Vec<Duration>>>,
    interrupt: Arc<AtomicBool>,
    clock: Option<MockClock>,
}

impl MockDelay {
    /// Create a mock delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `clock` by every completed wait.
    pub fn with_clock(mut self, clock: MockClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Make the next wait fail with `Interrupted`.
    pub fn interrupt_next(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    /// Get the completed waits, in order.
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .expect("MockDelay mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Get the sum of the completed waits.
    pub fn total(&self) -> Duration {
        self.pauses().into_iter().sum()
    }
}

impl Delay for MockDelay {
    fn pause(&self, duration: Duration) -> Result<(), Interrupted> {
        if self.interrupt.swap(false, Ordering::SeqCst) {
            return Err(Interrupted {
                waited: Duration::ZERO,
            });
        }
        self.pauses
            .lock()
            .expect("MockDelay mutex poisoned - a test thread panicked while holding the lock")
            .push(duration);
        if let Some(clock) = &self.clock {
            clock.advance(duration);
        }
        Ok(())
    }
}
