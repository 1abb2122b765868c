//! Debug assertion macros for ring buffer and batch cache invariants.
//!
//! They are only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.
//!
//! Used by `RingBuffer<T>`, `BatchCache<T>` and the consumer side of `MailboxQueue<T>`.

// =============================================================================
// INV-GATE-01: Gating Never Passes Cursor
// =============================================================================

/// Assert that the consumer never releases slots that were not published.
///
/// **Invariant**: `gating ≤ cursor`
///
/// Used in: `RingBuffer::release_up_to()` before storing the gating sequence
macro_rules! debug_assert_gating_behind_cursor {
    ($gating:expr, $cursor:expr) => {
        debug_assert!(
            $gating <= $cursor,
            "INV-GATE-01 violated: releasing up to {} beyond published cursor {}",
            $gating,
            $cursor
        )
    };
}

// =============================================================================
// INV-GATE-02: No Overwrite
// =============================================================================

/// Assert that a claimed sequence maps onto a slot the consumer already vacated.
///
/// **Invariant**: `claimed - capacity ≤ gating`
///
/// Used in: `RingBuffer::claim_next()` / `try_claim_next()` after a successful claim
macro_rules! debug_assert_no_overwrite {
    ($claimed:expr, $capacity:expr, $gating:expr) => {
        debug_assert!(
            $claimed - $capacity <= $gating,
            "INV-GATE-02 violated: claim {} would overwrite slot still gated at {} (capacity {})",
            $claimed,
            $gating,
            $capacity
        )
    };
}

// =============================================================================
// INV-SEQ-01: Monotonic Progress
// =============================================================================

/// Assert that a sequence number only increases.
///
/// **Invariant**: `new_value ≥ old_value`
///
/// Used in: `RingBuffer::release_up_to()` for the gating sequence
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-SEQ-01 violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-PUB-01: Published Read
// =============================================================================

/// Assert that the consumer only reads slots stamped with the sequence it expects.
///
/// **Invariant**: `slot(seq).published == seq` when `seq ≤ cursor`
///
/// Used in: `RingBuffer::read()` before `assume_init_read()`
macro_rules! debug_assert_published_read {
    ($seq:expr, $stamp:expr) => {
        debug_assert!(
            $seq == $stamp,
            "INV-PUB-01 violated: reading seq {} from slot stamped {}",
            $seq,
            $stamp
        )
    };
}

// =============================================================================
// INV-CACHE-01: Bounded Batch Cache
// =============================================================================

/// Assert that the batch cache never holds more entries than its capacity.
///
/// **Invariant**: `0 ≤ (tail - head) ≤ capacity`
///
/// Used in: `BatchCache::push()` before writing at tail
macro_rules! debug_assert_cache_bounded {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len < $capacity,
            "INV-CACHE-01 violated: batch cache holds {} of {} slots, no room to push",
            $len,
            $capacity
        )
    };
}

pub(crate) use debug_assert_cache_bounded;
pub(crate) use debug_assert_gating_behind_cursor;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_no_overwrite;
pub(crate) use debug_assert_published_read;
