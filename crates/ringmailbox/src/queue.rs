use crate::barrier::{InterruptHandle, SequenceBarrier, StopHandle};
use crate::cache::BatchCache;
use crate::mailbox::{DeadLetters, MessageQueue};
use crate::ring::RingBuffer;
use crate::trace::{debug, trace};
use crate::{ConfigError, MailboxConfig, Metrics, MetricsSnapshot, WaitError};
use std::fmt;
use std::sync::Arc;
use std::thread;

/// State shared by every producer handle and the consumer.
struct Core<T> {
    ring: RingBuffer<T>,
    barrier: SequenceBarrier,
    metrics: Metrics,
    enable_metrics: bool,
}

impl<T> Core<T> {
    fn push(&self, value: T) {
        let (seq, stalled) = self.ring.claim_next_observed();
        if stalled {
            trace!(seq, "producer resumed after waiting for a free slot");
        }
        self.write_and_publish(seq, value);
        if self.enable_metrics {
            self.metrics.add_published(stalled);
        }
    }

    fn try_push(&self, value: T) -> Result<(), T> {
        let Some(seq) = self.ring.try_claim_next() else {
            return Err(value);
        };
        self.write_and_publish(seq, value);
        if self.enable_metrics {
            self.metrics.add_published(false);
        }
        Ok(())
    }

    #[inline]
    fn write_and_publish(&self, seq: i64, value: T) {
        // SAFETY: `seq` was just claimed by this thread and is written once.
        unsafe {
            self.ring.write(seq, value);
            self.ring.publish(seq);
        }
        self.barrier.signal();
    }
}

/// Bounded multi-producer single-consumer mailbox queue.
///
/// The queue itself is the single consumer: [`take`](Self::take) needs
/// `&mut self` and the type is not `Clone`, so there is never more than one
/// consumer per ring. Producers on other threads use [`MailboxSender`]s from
/// [`sender`](Self::sender).
///
/// # Take protocol
///
/// A take first pops the consumer-local batch cache. When the cache is
/// empty it waits once on the barrier, copies *every* published entry into
/// the cache, and releases all those ring slots to producers in one step,
/// before any of them is handed to the caller. Subsequent takes need no
/// synchronization until the cache runs dry.
///
/// # Example
///
/// ```
/// use ringmailbox::{MailboxConfig, MailboxQueue};
/// use std::thread;
///
/// let mut queue = MailboxQueue::<u64>::new(&MailboxConfig::new(1024).unwrap());
/// let sender = queue.sender();
///
/// let producer = thread::spawn(move || {
///     for i in 0..100 {
///         sender.push(i);
///     }
/// });
///
/// for i in 0..100 {
///     assert_eq!(queue.take(), Some(i));
/// }
/// producer.join().unwrap();
/// assert!(!queue.has_pending());
/// ```
pub struct MailboxQueue<T> {
    core: Arc<Core<T>>,
    cache: BatchCache<T>,
}

impl<T> MailboxQueue<T> {
    /// Creates a queue from a validated configuration.
    pub fn new(config: &MailboxConfig) -> Self {
        let ring = RingBuffer::new(config.capacity());
        let barrier = ring.new_barrier(Arc::clone(config.wait_strategy()), config.wait_timeout);

        debug!(
            capacity = config.capacity().get(),
            strategy = ?config.wait_strategy(),
            "mailbox queue created"
        );

        Self {
            core: Arc::new(Core {
                ring,
                barrier,
                metrics: Metrics::new(),
                enable_metrics: config.enable_metrics,
            }),
            cache: BatchCache::new(config.capacity().get()),
        }
    }

    /// Creates a queue with `capacity` slots and the default wait strategy.
    pub fn with_capacity(capacity: i64) -> Result<Self, ConfigError> {
        Ok(Self::new(&MailboxConfig::new(capacity)?))
    }

    /// Returns the ring capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.core.ring.capacity()
    }

    /// Returns a producer handle usable from any thread.
    pub fn sender(&self) -> MailboxSender<T> {
        MailboxSender {
            core: Arc::clone(&self.core),
        }
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Publishes `value`, blocking while the ring is full.
    #[inline]
    pub fn push(&self, value: T) {
        self.core.push(value);
    }

    /// Publishes `value`, or hands it back if the ring is full.
    #[inline]
    pub fn try_push(&self, value: T) -> Result<(), T> {
        self.core.try_push(value)
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Takes the next message, waiting until one is published.
    ///
    /// Interrupts and wait timeouts are retried; an interrupt is re-asserted
    /// on the [`InterruptHandle`] once the take completes. Returns `None` only
    /// if a stop was requested and nothing is published.
    pub fn take(&mut self) -> Option<T> {
        if let Some(value) = self.pop_cached() {
            return Some(value);
        }

        let next = self.core.ring.gating() + 1;
        let available = self.wait_available(next)?;
        self.drain_ring(next, available);
        self.pop_cached()
    }

    /// Takes the next message if one is cached or published, without waiting.
    pub fn try_take(&mut self) -> Option<T> {
        if let Some(value) = self.pop_cached() {
            return Some(value);
        }

        let next = self.core.ring.gating() + 1;
        let available = self.core.ring.cursor();
        if available < next {
            return None;
        }
        self.drain_ring(next, available);
        self.pop_cached()
    }

    /// Returns `true` if a message is cached or published but not yet drained.
    pub fn has_pending(&self) -> bool {
        !self.cache.is_empty() || self.core.ring.gating() < self.core.ring.cursor()
    }

    /// Placeholder count: always `0`.
    ///
    /// An exact count across racing producers and the batch cache is not
    /// maintained. Use [`has_pending`](Self::has_pending) to test for work, or
    /// [`pending_estimate`](Self::pending_estimate) for a costlier estimate.
    #[inline]
    pub fn pending_count(&self) -> usize {
        0
    }

    /// Cached entries plus published entries still in the ring.
    ///
    /// Exact only while producers are quiescent.
    pub fn pending_estimate(&self) -> usize {
        let in_ring = self.core.ring.cursor() - self.core.ring.gating();
        self.cache.len() + in_ring.max(0) as usize
    }

    /// Forwards every pending message to `sink`, tagged with `owner`.
    ///
    /// Meant for shutdown, once producers have stopped; messages published
    /// while it runs may or may not be included. Returns the number forwarded.
    pub fn drain_to<R, D>(&mut self, owner: &R, sink: &D) -> usize
    where
        D: DeadLetters<R, T> + ?Sized,
    {
        let mut drained = 0;
        while self.has_pending() {
            let Some(value) = self.take() else {
                break;
            };
            sink.dead_letter(owner, value);
            drained += 1;
        }

        if self.core.enable_metrics {
            self.core.metrics.add_dead_lettered(drained as u64);
        }
        debug!(drained, "mailbox drained to dead letters");
        drained
    }

    // ---------------------------------------------------------------------
    // LIFECYCLE
    // ---------------------------------------------------------------------

    /// Returns a handle that makes a blocked [`take`](Self::take) return `None`.
    pub fn stop_handle(&self) -> StopHandle {
        self.core.barrier.stop_handle()
    }

    /// Returns the handle used to interrupt the consumer's waits.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.core.barrier.interrupt_handle()
    }

    /// Clears a stop request so takes block again.
    pub fn resume(&self) {
        self.core.barrier.clear_alert();
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.core.enable_metrics {
            self.core.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    // ---------------------------------------------------------------------
    // INTERNALS
    // ---------------------------------------------------------------------

    #[inline]
    fn pop_cached(&mut self) -> Option<T> {
        let value = self.cache.pop()?;
        if self.core.enable_metrics {
            self.core.metrics.add_taken();
        }
        Some(value)
    }

    /// Waits for `next`, retrying interrupts and timeouts. `None` on stop.
    fn wait_available(&self, next: i64) -> Option<i64> {
        let mut interrupted = false;

        let available = loop {
            match self.core.barrier.wait_for(next) {
                Ok(available) if available >= next => break Some(available),
                // A strategy may return early; poll again.
                Ok(_) => thread::yield_now(),
                Err(WaitError::Alerted) => break None,
                Err(err) => {
                    interrupted |= err == WaitError::Interrupted;
                    trace!(next, %err, "consumer wait retried");
                    if self.core.enable_metrics {
                        self.core.metrics.add_wait_retry();
                    }
                }
            }
        };

        if interrupted {
            self.core.barrier.interrupt_handle().interrupt();
        }
        available
    }

    /// Copies `next..=available` into the cache and releases those slots.
    fn drain_ring(&mut self, next: i64, available: i64) {
        let ring = &self.core.ring;
        for seq in next..=available {
            // SAFETY: `&mut self` makes this the only consumer; every sequence in
            // `gating < seq ≤ cursor` is published and read exactly once here.
            let value = unsafe { ring.read(seq) };
            self.cache.push(value);
        }

        // Slots become reusable before the caller sees the messages.
        // SAFETY: every sequence up to `available` was read above.
        unsafe { ring.release_up_to(available) };

        if self.core.enable_metrics {
            self.core.metrics.add_batch();
        }
    }
}

impl<T> fmt::Debug for MailboxQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxQueue")
            .field("capacity", &self.capacity())
            .field("barrier", &self.core.barrier)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl<R, T> MessageQueue<R, T> for MailboxQueue<T> {
    fn enqueue(&self, _receiver: &R, envelope: T) {
        self.push(envelope);
    }

    fn dequeue(&mut self) -> Option<T> {
        self.take()
    }

    fn number_of_messages(&self) -> usize {
        self.pending_count()
    }

    fn has_messages(&self) -> bool {
        self.has_pending()
    }

    fn clean_up<D>(&mut self, owner: &R, dead_letters: &D)
    where
        D: DeadLetters<R, T> + ?Sized,
    {
        self.drain_to(owner, dead_letters);
    }
}

/// Producer handle for a [`MailboxQueue`].
///
/// Cheap to clone; any number of threads may publish concurrently.
pub struct MailboxSender<T> {
    core: Arc<Core<T>>,
}

impl<T> MailboxSender<T> {
    /// Publishes `value`, blocking while the ring is full.
    #[inline]
    pub fn push(&self, value: T) {
        self.core.push(value);
    }

    /// Publishes `value`, or hands it back if the ring is full.
    #[inline]
    pub fn try_push(&self, value: T) -> Result<(), T> {
        self.core.try_push(value)
    }

    /// Returns the ring capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.core.ring.capacity()
    }

    /// Returns the number of messages that can be published without waiting.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.core.ring.remaining_capacity()
    }
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for MailboxSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxSender")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// A dead-letter destination may itself be a mailbox.
impl<R, T> DeadLetters<R, T> for MailboxSender<T> {
    fn dead_letter(&self, _owner: &R, envelope: T) {
        self.push(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Envelope;
    use std::cell::RefCell;

    fn queue(capacity: i64) -> MailboxQueue<u64> {
        MailboxQueue::new(&MailboxConfig::new(capacity).unwrap().with_metrics(true))
    }

    #[test]
    fn test_take_drains_whole_batch_into_cache() {
        let mut q = queue(8);
        for i in 0..5 {
            q.push(i);
        }

        assert_eq!(q.take(), Some(0));
        // Every published slot was released on the first take.
        assert_eq!(q.core.ring.gating(), 4);
        assert_eq!(q.cache.len(), 4);
        assert_eq!(q.sender().remaining_capacity(), 8);

        for i in 1..5 {
            assert_eq!(q.take(), Some(i));
        }
        assert!(!q.has_pending());

        let m = q.metrics();
        assert_eq!(m.messages_published, 5);
        assert_eq!(m.messages_taken, 5);
        assert_eq!(m.batches_drained, 1);
    }

    #[test]
    fn test_try_take_and_try_push() {
        let mut q = queue(2);
        assert_eq!(q.try_take(), None);

        assert_eq!(q.try_push(1), Ok(()));
        assert_eq!(q.try_push(2), Ok(()));
        assert_eq!(q.try_push(3), Err(3));

        assert_eq!(q.try_take(), Some(1));
        assert_eq!(q.try_push(3), Ok(()));
        assert_eq!(q.try_push(4), Ok(()));
        assert_eq!(q.try_take(), Some(2));
        assert_eq!(q.try_take(), Some(3));
        assert_eq!(q.try_take(), Some(4));
        assert_eq!(q.try_take(), None);
    }

    #[test]
    fn test_pending_count_is_placeholder() {
        let q = queue(4);
        q.push(1);
        q.push(2);
        assert_eq!(q.pending_count(), 0);
        assert_eq!(q.pending_estimate(), 2);
    }

    #[test]
    fn test_has_pending_sees_cache_and_ring() {
        let mut q = queue(4);
        assert!(!q.has_pending());

        q.push(1);
        q.push(2);
        assert!(q.has_pending());

        q.take();
        // One left in the cache, none in the ring.
        assert!(q.has_pending());
        assert_eq!(q.pending_estimate(), 1);

        q.take();
        assert!(!q.has_pending());
    }

    #[test]
    fn test_stop_returns_none_when_empty() {
        let mut q = queue(4);
        q.push(9);
        q.stop_handle().stop();

        assert_eq!(q.take(), Some(9));
        assert_eq!(q.take(), None);

        q.resume();
        q.push(10);
        assert_eq!(q.take(), Some(10));
    }

    #[test]
    fn test_message_queue_trait_and_clean_up() {
        let mut q = MailboxQueue::<Envelope<&str, u32>>::with_capacity(4).unwrap();
        let me = "actor-a";

        MessageQueue::enqueue(&q, &me, Envelope::new("one", 1));
        MessageQueue::enqueue(&q, &me, Envelope::new("two", 2));
        assert!(MessageQueue::<&str, _>::has_messages(&q));
        assert_eq!(MessageQueue::<&str, _>::number_of_messages(&q), 0);

        let dead = RefCell::new(Vec::new());
        q.clean_up(&me, &|owner: &&str, env: Envelope<&str, u32>| {
            dead.borrow_mut().push(format!("{owner}:{}", env.message));
        });

        assert_eq!(*dead.borrow(), vec!["actor-a:one", "actor-a:two"]);
        assert!(!MessageQueue::<&str, _>::has_messages(&q));
    }

    #[test]
    fn test_dead_letters_into_another_mailbox() {
        let mut q = queue(4);
        let mut dead_letters = queue(8);
        q.push(1);
        q.push(2);

        let drained = q.drain_to(&"owner", &dead_letters.sender());
        assert_eq!(drained, 2);
        assert_eq!(q.metrics().dead_lettered, 2);
        assert_eq!(dead_letters.take(), Some(1));
        assert_eq!(dead_letters.take(), Some(2));
    }
}
