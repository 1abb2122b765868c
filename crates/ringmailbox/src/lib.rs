//! RingMailbox - Bounded Multi-Producer Single-Consumer Mailbox Queue
//!
//! A drop-in message queue for an actor mailbox, built on a pre-allocated ring
//! buffer in the style of the LMAX Disruptor. Any number of producer threads
//! publish concurrently; one consumer drains in batches.
//!
//! # Key Features
//!
//! - Claim/write/publish protocol: producers only contend on one CAS
//! - Contiguous cursor: out-of-order publishes are exposed in sequence order
//! - Bounded backpressure: producers wait (spin → yield → park) on a full ring
//! - Batched consumer: one wait drains every published entry into a local
//!   cache and releases those slots to producers immediately
//! - Pluggable wait strategy: sleeping (default), yielding, busy-spin, or your own
//!
//! # Example
//!
//! ```
//! use ringmailbox::{MailboxConfig, MailboxQueue, YieldingWaitStrategy};
//!
//! let config = MailboxConfig::new(64)
//!     .unwrap()
//!     .with_wait_strategy(YieldingWaitStrategy::default());
//! let mut queue = MailboxQueue::<String>::new(&config);
//!
//! let sender = queue.sender();
//! sender.push("hello".to_string());
//! sender.push("world".to_string());
//!
//! assert_eq!(queue.take().as_deref(), Some("hello"));
//! assert_eq!(queue.take().as_deref(), Some("world"));
//! assert!(!queue.has_pending());
//!
//! // Capacity must be a positive power of two.
//! assert!(MailboxConfig::new(6).is_err());
//! ```

mod backoff;
mod barrier;
mod cache;
mod config;
mod error;
mod invariants;
mod mailbox;
mod metrics;
mod queue;
mod ring;
mod sequence;
mod trace;
mod wait;

pub use backoff::{Backoff, BackoffPhase};
pub use barrier::{InterruptHandle, SequenceBarrier, StopHandle};
pub use config::{Capacity, MailboxConfig, MailboxSettings, MAX_CAPACITY};
pub use error::{ConfigError, WaitError};
pub use mailbox::{DeadLetters, Envelope, MessageQueue, RingMailbox};
pub use metrics::{Metrics, MetricsSnapshot};
pub use queue::{MailboxQueue, MailboxSender};
pub use ring::RingBuffer;
pub use sequence::{Sequence, INITIAL_SEQUENCE};
pub use trace::init_tracing;
pub use wait::{
    BusySpinWaitStrategy, SleepingWaitStrategy, WaitContext, WaitStrategy, WaitStrategyKind,
    YieldingWaitStrategy,
};
