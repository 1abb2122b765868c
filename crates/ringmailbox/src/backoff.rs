use std::hint;
use std::thread;
use std::time::Duration;

/// Where a stalled producer currently is in its backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPhase {
    /// Busy-wait with exponentially more PAUSE hints per round.
    Spin,
    /// Give the time slice back to the OS scheduler.
    Yield,
    /// Park for a short, fixed interval per round.
    Park,
}

/// Escalating wait for a producer that found the ring full.
///
/// A full mailbox is backpressure, not an error: [`wait`](Self::wait) never
/// gives up, it only gets cheaper for the CPU the longer the consumer lags.
#[derive(Debug, Default)]
pub struct Backoff {
    round: u32,
}

impl Backoff {
    /// Spin rounds; round `n` issues `2^n` PAUSE hints.
    const SPIN_ROUNDS: u32 = 7;
    /// Yield rounds after spinning.
    const YIELD_ROUNDS: u32 = 4;
    const PARK_INTERVAL: Duration = Duration::from_micros(1);

    pub fn new() -> Self {
        Self::default()
    }

    /// The phase the next [`wait`](Self::wait) will run in.
    #[inline]
    pub fn phase(&self) -> BackoffPhase {
        if self.round < Self::SPIN_ROUNDS {
            BackoffPhase::Spin
        } else if self.round < Self::SPIN_ROUNDS + Self::YIELD_ROUNDS {
            BackoffPhase::Yield
        } else {
            BackoffPhase::Park
        }
    }

    /// Waits one round and escalates.
    #[inline]
    pub fn wait(&mut self) {
        match self.phase() {
            BackoffPhase::Spin => {
                for _ in 0..1u32 << self.round {
                    hint::spin_loop();
                }
            }
            BackoffPhase::Yield => thread::yield_now(),
            BackoffPhase::Park => {
                thread::park_timeout(Self::PARK_INTERVAL);
                return;
            }
        }
        self.round += 1;
    }

    /// Starts over from the spin phase.
    #[inline]
    pub fn reset(&mut self) {
        self.round = 0;
    }
}
