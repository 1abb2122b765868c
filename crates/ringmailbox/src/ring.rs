use crate::invariants::{
    debug_assert_gating_behind_cursor, debug_assert_monotonic, debug_assert_no_overwrite,
    debug_assert_published_read,
};
use crate::sequence::{Sequence, INITIAL_SEQUENCE};
use crate::{Backoff, Capacity};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Many producers, one consumer, one shared array of slots.
//
// ## Sequences
//
// Three `i64` sequences, all starting at -1 and only ever increasing:
// - `claim`:  highest sequence handed out to a producer
// - `cursor`: highest sequence S such that every sequence ≤ S is published
// - `gating`: highest sequence the consumer has copied out of the ring
//
// `gating ≤ cursor ≤ claim` and `claim - capacity ≤ gating` at all times.
// A slot index is `seq & mask`; with 2^63 sequences wrap-around never happens.
//
// ## Producer (claim → write → publish)
//
// 1. Load `claim`, compute `wrap_point = claim + 1 - capacity`
// 2. Load the shared `gating_cache` with Acquire. If `wrap_point` may pass
//    it, load `gating` with Acquire (synchronizes with the consumer's Release
//    after it copied the slot out), back off while `wrap_point > gating`, and
//    store the fresh value into `gating_cache` with Release. A producer that
//    claims on the strength of a cached value thereby inherits the refresher's
//    edge to the consumer's read of the slot it is about to overwrite.
// 3. CAS `claim` to `claim + 1`; only the CAS winner owns that sequence
// 4. Write the slot (exclusively owned, no ordering needed)
// 5. Store the slot's `published` stamp with SeqCst
// 6. Help advance `cursor` over every contiguously stamped slot (CAS, AcqRel)
//
// Out-of-order publication (seq 5 published before seq 4) leaves `cursor` at 3
// until the owner of 4 stamps it; that producer then sweeps the cursor to 5.
// The stamp store in step 5 and the stamp loads in step 6 are SeqCst; the
// cursor itself is loaded with Acquire. Of two racing publishers, the SeqCst
// stamp store/load pairs guarantee at least one observes the other's stamp,
// so nobody is left behind.
//
// ## Consumer
//
// 1. Load `cursor` with Acquire: every slot ≤ cursor was stamped, and each
//    stamp happens-before the cursor CAS that covered it
// 2. Read slots (exclusively owned by the consumer between cursor and gating)
// 3. Store `gating` with Release to hand the slots back to producers
//
// =============================================================================

/// One element of the backing array.
struct Slot<T> {
    /// Sequence of the value currently held, stamped when published.
    published: AtomicI64,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            published: AtomicI64::new(INITIAL_SEQUENCE),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Fixed-capacity multi-producer ring buffer.
///
/// Producers call [`claim_next`](Self::claim_next), [`write`](Self::write) and
/// [`publish`](Self::publish); a single consumer reads with
/// [`read`](Self::read) and hands slots back with
/// [`release_up_to`](Self::release_up_to). No lock is
/// held across a write: contention is limited to the claim CAS.
pub struct RingBuffer<T> {
    // === PRODUCER HOT ===
    /// Highest sequence claimed by a producer.
    claim: Sequence,
    /// Producers' cached view of `gating` (avoids cross-core reads).
    gating_cache: Sequence,

    // === SHARED ===
    /// Highest contiguously published sequence.
    cursor: Arc<Sequence>,
    /// Highest sequence the consumer has read out (written by consumer only).
    gating: Arc<Sequence>,

    // === CONFIG ===
    capacity: i64,
    mask: usize,

    // === DATA BUFFER ===
    slots: Box<[Slot<T>]>,
}

// Safety: a slot's value is only touched by the producer that claimed its
// sequence (before publish) or by the single consumer (after publish, before
// release). Sequence publication orders those accesses.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates a ring buffer with `capacity` pre-allocated slots.
    pub fn new(capacity: Capacity) -> Self {
        let slots = (0..capacity.get()).map(|_| Slot::new()).collect();

        Self {
            claim: Sequence::default(),
            gating_cache: Sequence::default(),
            cursor: Arc::new(Sequence::default()),
            gating: Arc::new(Sequence::default()),
            capacity: capacity.get() as i64,
            mask: capacity.mask(),
            slots,
        }
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the highest contiguously published sequence.
    ///
    /// A hint: it may already be stale when the caller acts on it.
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor.get()
    }

    /// Returns the highest sequence claimed by any producer.
    #[inline]
    pub fn claimed(&self) -> i64 {
        self.claim.get()
    }

    /// Returns the highest sequence the consumer has released to producers.
    #[inline]
    pub fn gating(&self) -> i64 {
        self.gating.get()
    }

    /// Returns the number of sequences that can be claimed without waiting.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        let in_flight = self.claim.get() - self.gating.get();
        (self.capacity - in_flight).max(0) as usize
    }

    /// Returns `true` if `seq` has been published and not yet overwritten.
    #[inline]
    pub fn is_published(&self, seq: i64) -> bool {
        seq >= 0 && self.slot(seq).published.load(Ordering::SeqCst) == seq
    }

    pub(crate) fn cursor_sequence(&self) -> &Arc<Sequence> {
        &self.cursor
    }

    pub(crate) fn gating_sequence(&self) -> &Arc<Sequence> {
        &self.gating
    }

    #[inline]
    fn slot(&self, seq: i64) -> &Slot<T> {
        &self.slots[(seq as usize) & self.mask]
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Claims the next sequence, waiting while the ring is full.
    ///
    /// Safe to call from any number of threads. A producer that finds the
    /// consumer a full lap behind backs off (spin → yield → park) until the
    /// consumer releases a slot.
    pub fn claim_next(&self) -> i64 {
        let mut backoff = Backoff::new();
        loop {
            match self.try_claim_once() {
                Claim::Claimed(seq) => return seq,
                Claim::Contended => {}
                Claim::Full => backoff.wait(),
            }
        }
    }

    /// Claims the next sequence, or returns `None` if the ring is full.
    pub fn try_claim_next(&self) -> Option<i64> {
        loop {
            match self.try_claim_once() {
                Claim::Claimed(seq) => return Some(seq),
                Claim::Contended => {}
                Claim::Full => return None,
            }
        }
    }

    /// Claims the next sequence, reporting whether waiting was required.
    pub(crate) fn claim_next_observed(&self) -> (i64, bool) {
        match self.try_claim_next() {
            Some(seq) => (seq, false),
            None => (self.claim_next(), true),
        }
    }

    fn try_claim_once(&self) -> Claim {
        let current = self.claim.get();
        let next = current + 1;
        let wrap_point = next - self.capacity;
        let cached_gating = self.gating_cache.get();

        if wrap_point > cached_gating || cached_gating > current {
            // Slow path: refresh the cached gating sequence
            let gating = self.gating.get().min(current);
            if wrap_point > gating {
                return Claim::Full;
            }
            self.gating_cache.set(gating);
            return Claim::Contended;
        }

        if self.claim.compare_and_set(current, next) {
            // INV-GATE-02: the claimed slot was vacated by the consumer
            debug_assert_no_overwrite!(next, self.capacity, self.gating.get());
            Claim::Claimed(next)
        } else {
            Claim::Contended
        }
    }

    /// Writes `value` into the slot for `seq`.
    ///
    /// # Safety
    ///
    /// `seq` must have been returned by `claim_next`/`try_claim_next` to the
    /// calling thread, must not have been written yet, and must not be published.
    #[inline]
    pub unsafe fn write(&self, seq: i64, value: T) {
        let slot = self.slot(seq);
        // SAFETY: the caller owns `seq`; the consumer will not read this slot
        // until it is published, and no other producer holds this sequence.
        unsafe {
            (*slot.value.get()).write(value);
        }
    }

    /// Publishes `seq`, making its write visible to the consumer.
    ///
    /// The cursor only moves past `seq` once every lower sequence is published.
    ///
    /// # Safety
    ///
    /// `seq` must have been claimed by the calling thread and written with
    /// [`write`](Self::write) exactly once.
    #[inline]
    pub unsafe fn publish(&self, seq: i64) {
        self.slot(seq).published.store(seq, Ordering::SeqCst);
        self.advance_cursor();
    }

    /// Moves the cursor across every contiguously published slot.
    fn advance_cursor(&self) {
        loop {
            let current = self.cursor.get();
            let next = current + 1;
            if self.slot(next).published.load(Ordering::SeqCst) != next {
                return;
            }
            // A failed CAS means another publisher moved the cursor; look again.
            self.cursor.compare_and_set(current, next);
        }
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Moves the value at `seq` out of the ring.
    ///
    /// # Safety
    ///
    /// Must only be called by the single consumer, with `gating < seq ≤ cursor`,
    /// and at most once per sequence.
    #[inline]
    pub unsafe fn read(&self, seq: i64) -> T {
        let slot = self.slot(seq);

        // INV-PUB-01: reading a slot stamped with the expected sequence
        debug_assert_published_read!(seq, slot.published.load(Ordering::Relaxed));

        // SAFETY: `seq ≤ cursor` and the Acquire load of the cursor that proved
        // it synchronizes with the publisher's stamp; producers cannot claim
        // this slot again until `gating` passes `seq`.
        unsafe { (*slot.value.get()).assume_init_read() }
    }

    /// Hands every slot up to and including `seq` back to producers.
    ///
    /// # Safety
    ///
    /// Must only be called by the single consumer, with `seq ≤ cursor`, after
    /// it has [`read`](Self::read) every sequence in `gating + 1 ..= seq`.
    #[inline]
    pub unsafe fn release_up_to(&self, seq: i64) {
        let gating = self.gating.get_relaxed();

        // INV-SEQ-01: gating only increases
        debug_assert_monotonic!("gating", gating, seq);
        // INV-GATE-01: never release unpublished slots
        debug_assert_gating_behind_cursor!(seq, self.cursor.get());

        self.gating.set(seq);
    }
}

enum Claim {
    Claimed(i64),
    /// Lost a race or refreshed the gating cache; try again immediately.
    Contended,
    Full,
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        // Drop every message published but never read. Claimed-but-unpublished
        // slots carry an older stamp and are skipped.
        let gating = self.gating.get_relaxed();
        let claimed = self.claim.get_relaxed();
        let mask = self.mask;

        for seq in (gating + 1)..=claimed {
            let slot = &mut self.slots[(seq as usize) & mask];
            if *slot.published.get_mut() == seq {
                // SAFETY: stamped with `seq` and above `gating`, so written and
                // never moved out; `&mut self` rules out concurrent access.
                unsafe {
                    slot.value.get_mut().assume_init_drop();
                }
            }
        }
    }
}
