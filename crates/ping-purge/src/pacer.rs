//! Per-class pacing of destructive API calls.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::time::{Duration, Instant};

use crate::clock::Clock;
use crate::config::PacingConfig;

/// Kind of destructive call being paced. Each class keeps its own timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    BatchDelete,
    SingleDelete,
}

#[derive(Default)]
struct ClassState {
    last: Option<Instant>,
    escalated: Option<Duration>,
}

/// Enforces a minimum interval between calls of the same class.
///
/// Shared by every purge the process runs; the state is only the instant of
/// the most recently reserved call slot per class plus a one-shot escalated
/// interval.
pub struct Pacer<C: Clock> {
    clock: C,
    config: PacingConfig,
    state: Mutex<HashMap<OperationClass, ClassState>>,
}

impl<C: Clock> Pacer<C> {
    pub fn new(clock: C, config: PacingConfig) -> Self {
        Self {
            clock,
            config,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn base_interval(&self, class: OperationClass) -> Duration {
        match class {
            OperationClass::BatchDelete => self.config.batch_interval(),
            OperationClass::SingleDelete => self.config.single_interval(),
        }
    }

    /// Claim the next slot for `class`, then wait until it arrives.
    /// Returns how long the caller was suspended.
    ///
    /// The slot is reserved under the lock, so concurrent callers queue up
    /// one interval apart instead of firing together.
    pub async fn throttle(&self, class: OperationClass) -> Duration {
        let wait = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = state.entry(class).or_default();
            let interval = entry
                .escalated
                .take()
                .unwrap_or_else(|| self.base_interval(class));
            let now = self.clock.now();
            let slot = match entry.last {
                None => now,
                Some(last) => (last + interval).max(now),
            };
            entry.last = Some(slot);
            slot - now
        };

        if !wait.is_zero() {
            self.clock.sleep(wait).await;
        }
        wait
    }

    /// Stretch the next interval for `class` to the backoff interval, or to
    /// `hint` when the platform asked for longer.
    pub fn escalate(&self, class: OperationClass, hint: Option<Duration>) {
        let backoff = self
            .config
            .backoff_interval()
            .max(hint.unwrap_or(Duration::ZERO));
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entry(class).or_default().escalated = Some(backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{MockClock, SystemClock};
    use std::sync::Arc;

    fn pacer() -> (Pacer<MockClock>, MockClock) {
        let clock = MockClock::new();
        (Pacer::new(clock.clone(), PacingConfig::default()), clock)
    }

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let (pacer, clock) = pacer();
        let waited = pacer.throttle(OperationClass::BatchDelete).await;
        assert_eq!(waited, Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_back_to_back_calls_wait_full_interval() {
        let (pacer, clock) = pacer();
        pacer.throttle(OperationClass::BatchDelete).await;
        pacer.throttle(OperationClass::BatchDelete).await;
        pacer.throttle(OperationClass::SingleDelete).await;
        pacer.throttle(OperationClass::SingleDelete).await;

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(1), Duration::from_millis(1500)]
        );
    }

    #[tokio::test]
    async fn test_elapsed_time_counts_toward_interval() {
        let (pacer, clock) = pacer();
        pacer.throttle(OperationClass::SingleDelete).await;
        clock.advance(Duration::from_millis(1000));

        let waited = pacer.throttle(OperationClass::SingleDelete).await;
        assert_eq!(waited, Duration::from_millis(500));

        clock.advance(Duration::from_secs(10));
        let waited = pacer.throttle(OperationClass::SingleDelete).await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_classes_are_independent() {
        let (pacer, clock) = pacer();
        pacer.throttle(OperationClass::BatchDelete).await;
        let waited = pacer.throttle(OperationClass::SingleDelete).await;
        assert_eq!(waited, Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_escalation_applies_once() {
        let (pacer, _clock) = pacer();
        pacer.throttle(OperationClass::SingleDelete).await;
        pacer.escalate(OperationClass::SingleDelete, None);

        assert_eq!(
            pacer.throttle(OperationClass::SingleDelete).await,
            Duration::from_secs(5)
        );
        assert_eq!(
            pacer.throttle(OperationClass::SingleDelete).await,
            Duration::from_millis(1500)
        );
    }

    #[tokio::test]
    async fn test_escalation_honours_longer_retry_after() {
        let (pacer, _clock) = pacer();
        pacer.throttle(OperationClass::SingleDelete).await;
        pacer.escalate(OperationClass::SingleDelete, Some(Duration::from_secs(12)));

        assert_eq!(
            pacer.throttle(OperationClass::SingleDelete).await,
            Duration::from_secs(12)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced_by_interval() {
        let pacer = Arc::new(Pacer::new(SystemClock, PacingConfig::default()));
        pacer.throttle(OperationClass::SingleDelete).await;
        let start = Instant::now();

        let spawn_throttle = |pacer: Arc<Pacer<SystemClock>>| {
            tokio::spawn(async move {
                pacer.throttle(OperationClass::SingleDelete).await;
                Instant::now()
            })
        };
        let first = spawn_throttle(pacer.clone());
        let second = spawn_throttle(pacer.clone());

        let mut released = vec![first.await.unwrap(), second.await.unwrap()];
        released.sort();

        assert_eq!(released[0] - start, Duration::from_millis(1500));
        assert_eq!(released[1] - released[0], Duration::from_millis(1500));
    }
}
