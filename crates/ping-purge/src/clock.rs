//! Clock trait abstraction for mocking time in tests.
//!
//! - `SystemClock`: delegates to real `tokio::time` and `chrono::Utc`
//! - `MockClock`: controllable time, `sleep()` advances the clock instantly

use std::future::Future;
#[cfg(any(test, feature = "test-support"))]
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::time::{Duration, Instant};

/// Abstraction over the system clock.
///
/// `now()` is monotonic and drives pacing; `utc_now()` is wall-clock time
/// and is compared against message timestamps.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;

    fn utc_now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Live implementation: delegates to real tokio time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Mock clock for unit tests.
///
/// Both clocks advance only through [`advance`](MockClock::advance) or
/// `sleep()`. Every sleep is recorded so pacing can be asserted.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone)]
pub struct MockClock {
    inner: Arc<Mutex<MockClockInner>>,
}

#[cfg(any(test, feature = "test-support"))]
struct MockClockInner {
    current: Instant,
    utc: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

#[cfg(any(test, feature = "test-support"))]
impl MockClock {
    /// Create a mock clock whose wall-clock time starts at `utc`.
    pub fn at(utc: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockClockInner {
                current: Instant::now(),
                utc,
                sleeps: Vec::new(),
            })),
        }
    }

    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Advance both clocks by `duration` without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.current += duration;
        inner.utc += chrono::Duration::from_std(duration).unwrap();
    }

    /// Every duration passed to `sleep()`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.lock().unwrap().sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.inner.lock().unwrap().sleeps.iter().sum()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.inner.lock().unwrap().current
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.inner.lock().unwrap().utc
    }

    async fn sleep(&self, duration: Duration) {
        self.inner.lock().unwrap().sleeps.push(duration);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock_advance_moves_both_clocks() {
        let clock = MockClock::new();
        let t0 = clock.now();
        let u0 = clock.utc_now();

        clock.advance(Duration::from_secs(5));

        assert_eq!(clock.now() - t0, Duration::from_secs(5));
        assert_eq!(clock.utc_now() - u0, chrono::Duration::seconds(5));
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_mock_clock_sleep_records_and_advances() {
        let clock = MockClock::new();
        let t0 = clock.now();

        clock.sleep(Duration::from_millis(1500)).await;
        clock.sleep(Duration::from_secs(1)).await;

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(1500), Duration::from_secs(1)]
        );
        assert_eq!(clock.total_slept(), Duration::from_millis(2500));
        assert_eq!(clock.now() - t0, Duration::from_millis(2500));
    }

    #[test]
    fn test_mock_clock_clone_shares_state() {
        let clock = MockClock::new();
        let clone = clock.clone();
        let t0 = clock.now();

        clone.advance(Duration::from_secs(3));
        assert_eq!(clock.now() - t0, Duration::from_secs(3));
    }
}
