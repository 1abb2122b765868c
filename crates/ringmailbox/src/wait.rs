//! Consumer wait strategies.
//!
//! A [`WaitStrategy`] is a policy object invoked by the
//! [`SequenceBarrier`](crate::SequenceBarrier) while the consumer waits for a
//! sequence to be published. Strategies trade CPU for latency:
//!
//! | Strategy                 | Idle CPU | Wake-up latency |
//! |--------------------------|----------|-----------------|
//! | [`BusySpinWaitStrategy`] | one core | lowest          |
//! | [`YieldingWaitStrategy`] | high     | low             |
//! | [`SleepingWaitStrategy`] | low      | grows with idle |
//!
//! Every strategy polls the cursor first and the [`WaitContext`] second, so
//! already-published data is returned even after a stop was requested.

use crate::sequence::Sequence;
use crate::WaitError;
use std::fmt;
use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Policy for waiting until `cursor ≥ target`.
pub trait WaitStrategy: Send + Sync + fmt::Debug {
    /// Blocks until the cursor reaches `target` and returns the cursor value seen.
    ///
    /// Implementations must call [`WaitContext::check`] between polls and return
    /// its error unchanged.
    fn wait_for(&self, target: i64, cursor: &Sequence, ctx: &WaitContext<'_>)
        -> Result<i64, WaitError>;

    /// Called after every publish and on stop requests.
    ///
    /// Polling strategies ignore it; a strategy that parks the consumer uses it
    /// to wake it.
    fn signal_all_when_blocking(&self) {}
}

/// Interruption sources checked between polls.
#[derive(Debug)]
pub struct WaitContext<'a> {
    alert: &'a AtomicBool,
    interrupt: &'a AtomicBool,
    deadline: Option<Instant>,
}

impl<'a> WaitContext<'a> {
    pub(crate) fn new(alert: &'a AtomicBool, interrupt: &'a AtomicBool, deadline: Option<Instant>) -> Self {
        Self {
            alert,
            interrupt,
            deadline,
        }
    }

    /// Returns the first pending interruption.
    ///
    /// An interrupt is consumed by the check that reports it; the caller is
    /// responsible for re-asserting it once the wait is over.
    #[inline]
    pub fn check(&self) -> Result<(), WaitError> {
        if self.alert.load(Ordering::Acquire) {
            return Err(WaitError::Alerted);
        }
        if self.interrupt.swap(false, Ordering::AcqRel) {
            return Err(WaitError::Interrupted);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(WaitError::Timeout),
            _ => Ok(()),
        }
    }
}

/// Spins, then yields, then sleeps with a doubling delay.
///
/// The default strategy: cheap when the mailbox is frequently empty, with a
/// bounded latency penalty set by `max_sleep`.
#[derive(Debug, Clone, Copy)]
pub struct SleepingWaitStrategy {
    retries: u32,
    min_sleep: Duration,
    max_sleep: Duration,
}

impl SleepingWaitStrategy {
    const DEFAULT_RETRIES: u32 = 200;
    const DEFAULT_MIN_SLEEP: Duration = Duration::from_micros(10);
    const DEFAULT_MAX_SLEEP: Duration = Duration::from_micros(500);

    /// Creates a strategy that spins for `retries / 2` polls, yields for the
    /// rest, then sleeps from `min_sleep` doubling up to `max_sleep`.
    pub fn new(retries: u32, min_sleep: Duration, max_sleep: Duration) -> Self {
        Self {
            retries,
            min_sleep,
            max_sleep: max_sleep.max(min_sleep),
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_RETRIES,
            Self::DEFAULT_MIN_SLEEP,
            Self::DEFAULT_MAX_SLEEP,
        )
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        target: i64,
        cursor: &Sequence,
        ctx: &WaitContext<'_>,
    ) -> Result<i64, WaitError> {
        let spin_threshold = self.retries / 2;
        let mut counter = self.retries;
        let mut sleep = self.min_sleep;

        loop {
            let available = cursor.get();
            if available >= target {
                return Ok(available);
            }
            ctx.check()?;

            if counter > spin_threshold {
                counter -= 1;
                hint::spin_loop();
            } else if counter > 0 {
                counter -= 1;
                thread::yield_now();
            } else {
                thread::sleep(sleep);
                sleep = (sleep * 2).min(self.max_sleep);
            }
        }
    }
}

/// Spins briefly, then yields the thread on every poll.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    /// Creates a strategy that spins `spin_tries` polls before yielding.
    pub fn new(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new(100)
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        target: i64,
        cursor: &Sequence,
        ctx: &WaitContext<'_>,
    ) -> Result<i64, WaitError> {
        let mut counter = self.spin_tries;

        loop {
            let available = cursor.get();
            if available >= target {
                return Ok(available);
            }
            ctx.check()?;

            if counter == 0 {
                thread::yield_now();
            } else {
                counter -= 1;
                hint::spin_loop();
            }
        }
    }
}

/// Spins on the cursor. Lowest latency, burns a core while idle.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusySpinWaitStrategy;

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        target: i64,
        cursor: &Sequence,
        ctx: &WaitContext<'_>,
    ) -> Result<i64, WaitError> {
        loop {
            let available = cursor.get();
            if available >= target {
                return Ok(available);
            }
            ctx.check()?;
            hint::spin_loop();
        }
    }
}

/// Named built-in strategies, as selected by host configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum WaitStrategyKind {
    #[default]
    Sleeping,
    Yielding,
    BusySpin,
}

impl WaitStrategyKind {
    /// Builds the strategy with its default tuning.
    pub fn build(self) -> Arc<dyn WaitStrategy> {
        match self {
            Self::Sleeping => Arc::new(SleepingWaitStrategy::default()),
            Self::Yielding => Arc::new(YieldingWaitStrategy::default()),
            Self::BusySpin => Arc::new(BusySpinWaitStrategy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategies() -> Vec<Arc<dyn WaitStrategy>> {
        vec![
            WaitStrategyKind::Sleeping.build(),
            WaitStrategyKind::Yielding.build(),
            WaitStrategyKind::BusySpin.build(),
        ]
    }

    #[test]
    fn test_returns_immediately_when_available() {
        let alert = AtomicBool::new(false);
        let interrupt = AtomicBool::new(false);
        let cursor = Sequence::new(7);

        for strategy in strategies() {
            let ctx = WaitContext::new(&alert, &interrupt, None);
            assert_eq!(strategy.wait_for(3, &cursor, &ctx), Ok(7));
        }
    }

    #[test]
    fn test_available_data_wins_over_alert() {
        let alert = AtomicBool::new(true);
        let interrupt = AtomicBool::new(false);
        let cursor = Sequence::new(0);

        for strategy in strategies() {
            let ctx = WaitContext::new(&alert, &interrupt, None);
            assert_eq!(strategy.wait_for(0, &cursor, &ctx), Ok(0));
            assert_eq!(strategy.wait_for(1, &cursor, &ctx), Err(WaitError::Alerted));
        }
    }

    #[test]
    fn test_interrupt_is_consumed() {
        let alert = AtomicBool::new(false);
        let interrupt = AtomicBool::new(true);
        let cursor = Sequence::default();

        let ctx = WaitContext::new(&alert, &interrupt, None);
        let strategy = SleepingWaitStrategy::default();
        assert_eq!(strategy.wait_for(0, &cursor, &ctx), Err(WaitError::Interrupted));
        assert!(!interrupt.load(Ordering::Acquire));
    }

    #[test]
    fn test_timeout_after_deadline() {
        let alert = AtomicBool::new(false);
        let interrupt = AtomicBool::new(false);
        let cursor = Sequence::default();
        let deadline = Instant::now() + Duration::from_millis(5);

        let ctx = WaitContext::new(&alert, &interrupt, Some(deadline));
        let strategy = SleepingWaitStrategy::default();
        assert_eq!(strategy.wait_for(0, &cursor, &ctx), Err(WaitError::Timeout));
        assert!(Instant::now() >= deadline);
    }

    #[test]
    fn test_wakes_on_concurrent_publish() {
        let cursor = Arc::new(Sequence::default());
        let publisher = {
            let cursor = Arc::clone(&cursor);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                cursor.set(4);
            })
        };

        let alert = AtomicBool::new(false);
        let interrupt = AtomicBool::new(false);
        let ctx = WaitContext::new(&alert, &interrupt, None);
        let available = SleepingWaitStrategy::default()
            .wait_for(2, &cursor, &ctx)
            .unwrap();
        assert_eq!(available, 4);
        publisher.join().unwrap();
    }
}
