use crate::invariants::debug_assert_cache_bounded;

/// Consumer-local circular buffer holding messages already drained from the
/// ring but not yet handed to the caller.
///
/// Head and tail are free-running counters taken modulo the capacity. No
/// atomics: the cache belongs to the single consumer.
pub(crate) struct BatchCache<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    mask: usize,
}

impl<T> BatchCache<T> {
    /// `capacity` must be a power of two.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            mask: capacity - 1,
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.tail.wrapping_sub(self.head)
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn push(&mut self, value: T) {
        // INV-CACHE-01: a batch never exceeds the ring, so it always fits
        debug_assert_cache_bounded!(self.len(), self.capacity());

        self.slots[self.tail & self.mask] = Some(value);
        self.tail = self.tail.wrapping_add(1);
    }

    /// Takes the oldest entry and clears its slot.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.head & self.mask].take();
        self.head = self.head.wrapping_add(1);
        value
    }
}
