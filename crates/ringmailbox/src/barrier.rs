use crate::ring::RingBuffer;
use crate::sequence::Sequence;
use crate::trace::debug;
use crate::wait::{WaitContext, WaitStrategy};
use crate::WaitError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The consumer's view of the ring: its published cursor, its gating
/// sequence, and the signals that can cut a wait short.
///
/// Cloning a barrier shares all of its state.
#[derive(Clone)]
pub struct SequenceBarrier {
    cursor: Arc<Sequence>,
    gating: Arc<Sequence>,
    strategy: Arc<dyn WaitStrategy>,
    alert: Arc<AtomicBool>,
    interrupt: InterruptHandle,
    timeout: Option<Duration>,
}

impl<T> RingBuffer<T> {
    /// Creates a barrier over this ring's cursor and gating sequence.
    pub fn new_barrier(
        &self,
        strategy: Arc<dyn WaitStrategy>,
        timeout: Option<Duration>,
    ) -> SequenceBarrier {
        SequenceBarrier {
            cursor: Arc::clone(self.cursor_sequence()),
            gating: Arc::clone(self.gating_sequence()),
            strategy,
            alert: Arc::new(AtomicBool::new(false)),
            interrupt: InterruptHandle::default(),
            timeout,
        }
    }
}

impl SequenceBarrier {
    /// Returns the highest published sequence at the time of the call.
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor.get()
    }

    /// Returns the consumer's gating sequence.
    #[inline]
    pub fn gating(&self) -> i64 {
        self.gating.get()
    }

    /// Waits until the cursor reaches `target`.
    ///
    /// Returns the cursor observed, which may be past `target`: everything up
    /// to it can be drained in one batch. Published data is always returned
    /// first; the errors only report why the wait would otherwise go on.
    pub fn wait_for(&self, target: i64) -> Result<i64, WaitError> {
        let available = self.cursor.get();
        if available >= target {
            return Ok(available);
        }

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let ctx = WaitContext::new(&self.alert, &self.interrupt.flag, deadline);
        self.strategy.wait_for(target, &self.cursor, &ctx)
    }

    /// Requests that waits stop. Sticky until [`clear_alert`](Self::clear_alert).
    pub fn alert(&self) {
        debug!("mailbox stop requested");
        self.alert.store(true, Ordering::Release);
        self.strategy.signal_all_when_blocking();
    }

    /// Clears a previous stop request.
    pub fn clear_alert(&self) {
        self.alert.store(false, Ordering::Release);
    }

    /// Returns `true` if a stop was requested.
    #[inline]
    pub fn is_alerted(&self) -> bool {
        self.alert.load(Ordering::Acquire)
    }

    /// Wakes a consumer parked by a blocking wait strategy.
    #[inline]
    pub fn signal(&self) {
        self.strategy.signal_all_when_blocking();
    }

    /// Returns the interrupt handle of the waiting thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Returns a handle that requests a stop from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            barrier: self.clone(),
        }
    }
}

impl fmt::Debug for SequenceBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceBarrier")
            .field("cursor", &self.cursor)
            .field("gating", &self.gating)
            .field("strategy", &self.strategy)
            .field("alerted", &self.is_alerted())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Cooperative interruption of the consumer thread.
///
/// Setting the flag cuts the consumer's current wait short. The consumer
/// consumes the flag while waiting, retries, and sets it again once its take
/// completes, so the host's own cancellation protocol still observes it.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Interrupts the consumer.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns `true` if an interrupt is pending.
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clears a pending interrupt and reports whether there was one.
    pub fn clear(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}

/// A cloneable handle for stopping the consumer from another thread.
///
/// Multiple clones may call [`stop`](Self::stop); only the first has effect.
#[derive(Debug, Clone)]
pub struct StopHandle {
    barrier: SequenceBarrier,
}

impl StopHandle {
    /// Requests that the consumer stop waiting.
    ///
    /// Messages already published are still delivered; a take that would
    /// block returns `None` instead.
    pub fn stop(&self) {
        if !self.barrier.is_alerted() {
            self.barrier.alert();
        }
    }

    /// Returns `true` if a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.barrier.is_alerted()
    }
}
