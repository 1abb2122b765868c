//! Property-based tests for the invariants listed in `src/invariants.rs`.
//!
//! Single-threaded operation sequences are generated with proptest and
//! checked against a `VecDeque` model of the mailbox.

use proptest::prelude::*;
use ringmailbox::{Capacity, ConfigError, MailboxConfig, MailboxQueue, RingBuffer, MAX_CAPACITY};
use std::cell::RefCell;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Push(u32),
    Take,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u32>().prop_map(Op::Push),
        2 => Just(Op::Take),
    ]
}

fn capacity() -> impl Strategy<Value = i64> {
    (0u32..=8).prop_map(|shift| 1i64 << shift)
}

// =============================================================================
// Capacity validation
// =============================================================================

proptest! {
    /// Accepted iff positive, a power of two and no larger than the maximum.
    #[test]
    fn prop_capacity_validation(raw in any::<i64>()) {
        let expected_ok = raw >= 1
            && (raw as u64).is_power_of_two()
            && raw as u64 <= MAX_CAPACITY as u64;

        match Capacity::new(raw) {
            Ok(capacity) => {
                prop_assert!(expected_ok, "accepted {}", raw);
                prop_assert_eq!(capacity.get() as i64, raw);
                prop_assert_eq!(capacity.mask(), capacity.get() - 1);
            }
            Err(err) => {
                prop_assert!(!expected_ok, "rejected {}", raw);
                prop_assert_eq!(err.capacity(), raw);
                match err {
                    ConfigError::NonPositive { .. } => prop_assert!(raw < 1),
                    ConfigError::NotPowerOfTwo { .. } => {
                        prop_assert!(raw >= 1 && !(raw as u64).is_power_of_two())
                    }
                    ConfigError::TooLarge { max, .. } => {
                        prop_assert_eq!(max, MAX_CAPACITY);
                        prop_assert!(raw as u64 > MAX_CAPACITY as u64)
                    }
                }
            }
        }
    }

    /// Every power of two in range builds a queue of exactly that size.
    #[test]
    fn prop_power_of_two_accepted(shift in 0u32..=12) {
        let raw = 1i64 << shift;
        let queue = MailboxQueue::<u8>::with_capacity(raw).unwrap();
        prop_assert_eq!(queue.capacity() as i64, raw);
    }
}

// =============================================================================
// FIFO against a model
// =============================================================================

proptest! {
    /// Interleaved non-blocking pushes and takes match a bounded FIFO model.
    #[test]
    fn prop_fifo_matches_model(
        cap in capacity(),
        ops in prop::collection::vec(op(), 0..400),
    ) {
        let mut queue = MailboxQueue::<u32>::new(&MailboxConfig::new(cap).unwrap());
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    // The ring frees slots a whole batch at a time, so `try_push`
                    // may succeed even while the model still holds `cap` items.
                    match queue.try_push(v) {
                        Ok(()) => model.push_back(v),
                        Err(back) => {
                            prop_assert_eq!(back, v);
                            prop_assert!(model.len() >= cap as usize);
                        }
                    }
                }
                Op::Take => {
                    prop_assert_eq!(queue.try_take(), model.pop_front());
                }
            }
            prop_assert_eq!(queue.has_pending(), !model.is_empty());
            prop_assert_eq!(queue.pending_estimate(), model.len());
        }

        let rest = RefCell::new(Vec::new());
        queue.drain_to(&(), &|_: &(), v: u32| rest.borrow_mut().push(v));
        prop_assert_eq!(rest.into_inner(), model.into_iter().collect::<Vec<_>>());
        prop_assert!(!queue.has_pending());
    }

    /// A batch pushed in one go comes out in order, whatever the ring size.
    #[test]
    fn prop_fifo_batches(
        cap in capacity(),
        batches in prop::collection::vec(prop::collection::vec(any::<u16>(), 0..64), 0..16),
    ) {
        let mut queue = MailboxQueue::<u16>::new(&MailboxConfig::new(cap).unwrap());

        for batch in batches {
            for chunk in batch.chunks(cap as usize) {
                for &v in chunk {
                    prop_assert_eq!(queue.try_push(v), Ok(()));
                }
                for &v in chunk {
                    prop_assert_eq!(queue.take(), Some(v));
                }
            }
            prop_assert!(!queue.has_pending());
        }
    }
}

// =============================================================================
// INV-GATE-02: No Overwrite
// =============================================================================

proptest! {
    /// The ring never hands out more than `capacity` unreleased sequences.
    #[test]
    fn prop_claims_bounded_by_capacity(shift in 0u32..=6, extra in 0usize..8) {
        let capacity = Capacity::new(1i64 << shift).unwrap();
        let ring = RingBuffer::<u64>::new(capacity);

        let mut claimed = Vec::new();
        for _ in 0..capacity.get() + extra {
            match ring.try_claim_next() {
                Some(seq) => claimed.push(seq),
                None => break,
            }
        }
        prop_assert_eq!(claimed.len(), capacity.get());
        prop_assert_eq!(ring.remaining_capacity(), 0);

        // Unpublished claims keep the cursor where it was.
        prop_assert_eq!(ring.cursor(), -1);
        for (i, &seq) in claimed.iter().enumerate() {
            prop_assert_eq!(seq, i as i64);
            // SAFETY: each sequence was claimed above and is written once.
            unsafe {
                ring.write(seq, seq as u64);
                ring.publish(seq);
            }
        }
        prop_assert_eq!(ring.cursor(), capacity.get() as i64 - 1);
    }

    /// Publishing in any order still moves the cursor contiguously.
    #[test]
    fn prop_cursor_contiguous_for_any_publish_order(
        order in Just((0..16i64).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let ring = RingBuffer::<i64>::new(Capacity::new(16).unwrap());
        for _ in 0..16 {
            ring.try_claim_next().unwrap();
        }

        let mut published = [false; 16];
        for seq in order {
            // SAFETY: all 16 sequences were claimed above.
            unsafe {
                ring.write(seq, seq);
                ring.publish(seq);
            }
            published[seq as usize] = true;

            let contiguous = published.iter().take_while(|p| **p).count() as i64 - 1;
            prop_assert_eq!(ring.cursor(), contiguous);
        }
    }
}
