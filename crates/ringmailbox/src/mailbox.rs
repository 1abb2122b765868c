//! The interface an actor runtime drives a mailbox queue through.
//!
//! `R` is the runtime's actor identity (an actor reference); `E` is whatever
//! the runtime enqueues, usually an [`Envelope`]. Neither is ever inspected by
//! the queue.

use crate::{ConfigError, MailboxConfig, MailboxQueue, MailboxSettings};

/// The mailbox type: a validated configuration that builds one queue per actor.
///
/// Configuration errors surface here, once, before any producer or consumer
/// exists.
#[derive(Debug, Clone)]
pub struct RingMailbox {
    config: MailboxConfig,
}

impl RingMailbox {
    pub fn new(config: MailboxConfig) -> Self {
        Self { config }
    }

    /// Builds the mailbox type from the host's configuration section.
    pub fn from_settings(settings: MailboxSettings) -> Result<Self, ConfigError> {
        MailboxConfig::try_from(settings).map(Self::new)
    }

    /// Creates the queue for one owning actor.
    ///
    /// Every queue gets its own ring; the wait strategy instance is shared.
    pub fn create<E>(&self) -> MailboxQueue<E> {
        MailboxQueue::new(&self.config)
    }

    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }
}

/// A message plus the address it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<M, A> {
    pub message: M,
    pub sender: A,
}

impl<M, A> Envelope<M, A> {
    pub fn new(message: M, sender: A) -> Self {
        Self { message, sender }
    }
}

/// A mailbox's message queue as seen by the owning actor runtime.
pub trait MessageQueue<R, E> {
    /// Appends `envelope` for `receiver`. Blocks while the queue is full.
    fn enqueue(&self, receiver: &R, envelope: E);

    /// Takes the next envelope, blocking until one is published.
    ///
    /// Returns `None` only when a stop was requested and nothing is published.
    fn dequeue(&mut self) -> Option<E>;

    /// Approximate number of queued messages. Not suitable for exact accounting.
    fn number_of_messages(&self) -> usize;

    /// Returns `true` if a dequeue would find a message without waiting.
    fn has_messages(&self) -> bool;

    /// Moves every remaining envelope to `dead_letters`. Called once, on shutdown.
    fn clean_up<D>(&mut self, owner: &R, dead_letters: &D)
    where
        D: DeadLetters<R, E> + ?Sized;
}

/// Destination for messages left over when a mailbox shuts down.
///
/// Assumed never to block indefinitely and never to fail.
pub trait DeadLetters<R, E> {
    fn dead_letter(&self, owner: &R, envelope: E);
}

impl<R, E, F> DeadLetters<R, E> for F
where
    F: Fn(&R, E),
{
    fn dead_letter(&self, owner: &R, envelope: E) {
        self(owner, envelope);
    }
}
