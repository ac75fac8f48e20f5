//! Manually driven clock.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const POISONED: &str = "MockClock mutex poisoned - a test thread panicked while holding the lock";

/// Clock that only moves when a test moves it.
///
/// Lets tests pin the elapsed time the interceptor reports for an invocation.
/// Clones share one reading, so an operation can advance the clock it was
/// handed and the interceptor observes the jump.
///
/// # Examples
///
/// ```
/// use tracing_advice::infrastructure::mocks::MockClock;
/// use tracing_advice::Clock;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
/// let shared = clock.clone();
///
/// shared.advance(Duration::from_millis(250));
/// assert_eq!(clock.now(), start + Duration::from_millis(250));
/// assert_eq!(clock.elapsed(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    current: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a clock reading `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the reading forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock().expect(POISONED) += duration;
    }

    /// Time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.start)
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock().expect(POISONED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_only_moves_when_advanced() {
        let start = Instant::now();
        let clock = MockClock::new(start);

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_clones_share_reading_across_threads() {
        let start = Instant::now();
        let clock = MockClock::new(start);
        let shared = clock.clone();

        thread::spawn(move || shared.advance(Duration::from_secs(2)))
            .join()
            .unwrap();
        clock.advance(Duration::from_secs(1));

        assert_eq!(clock.now(), start + Duration::from_secs(3));
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }
}
