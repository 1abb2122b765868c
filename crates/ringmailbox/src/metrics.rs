use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for one mailbox queue.
///
/// Producers and the consumer update them with `Relaxed` increments; they are
/// only recorded when `MailboxConfig::enable_metrics` is set.
#[derive(Debug, Default)]
pub struct Metrics {
    messages_published: AtomicU64,
    messages_taken: AtomicU64,
    batches_drained: AtomicU64,
    producer_stalls: AtomicU64,
    wait_retries: AtomicU64,
    dead_lettered: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_published(&self, stalled: bool) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        if stalled {
            self.producer_stalls.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_taken(&self) {
        self.messages_taken.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_batch(&self) {
        self.batches_drained.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_wait_retry(&self) {
        self.wait_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_dead_lettered(&self, n: u64) {
        self.dead_lettered.fetch_add(n, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_taken: self.messages_taken.load(Ordering::Relaxed),
            batches_drained: self.batches_drained.load(Ordering::Relaxed),
            producer_stalls: self.producer_stalls.load(Ordering::Relaxed),
            wait_retries: self.wait_retries.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_published: u64,
    pub messages_taken: u64,
    /// Number of slow-path takes that copied a batch out of the ring.
    pub batches_drained: u64,
    /// Number of publishes that had to wait for the consumer to free a slot.
    pub producer_stalls: u64,
    /// Number of consumer waits retried after an interrupt or timeout.
    pub wait_retries: u64,
    pub dead_lettered: u64,
}
