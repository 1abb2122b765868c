use crossbeam_utils::CachePadded;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Value of every sequence before anything is claimed, published or read.
pub const INITIAL_SEQUENCE: i64 = -1;

/// A cache-padded, monotonically increasing 64-bit position in the ring's
/// infinite stream.
///
/// Padding keeps the producer-hot claim counter, the published cursor and the
/// consumer's gating sequence on separate cache lines.
pub struct Sequence {
    value: CachePadded<AtomicI64>,
}

impl Sequence {
    /// Creates a sequence at `initial`.
    pub const fn new(initial: i64) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(initial)),
        }
    }

    /// Acquire load. Pairs with [`set`](Self::set) and
    /// [`compare_and_set`](Self::compare_and_set) from other threads.
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Release store. Everything written before it is visible to an
    /// acquiring reader that observes the new value.
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Load with no ordering, for values only used as hints.
    #[inline]
    pub fn get_relaxed(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Store with no ordering, for values only used as hints.
    #[inline]
    pub fn set_relaxed(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Atomically replaces `expected` with `new`. Returns `true` on success.
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_SEQUENCE)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sequence").field(&self.get_relaxed()).finish()
    }
}
