use crate::trace::warn;
use crate::wait::{SleepingWaitStrategy, WaitStrategy, WaitStrategyKind, YieldingWaitStrategy};
use crate::ConfigError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Largest ring a mailbox will allocate (2^30 slots).
pub const MAX_CAPACITY: usize = 1 << 30;

/// Validated ring capacity: a power of two in `1..=MAX_CAPACITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capacity(usize);

impl Capacity {
    /// Validates a capacity as supplied by the host configuration.
    pub fn new(capacity: i64) -> Result<Self, ConfigError> {
        let result = Self::validate(capacity);
        if let Err(_err) = &result {
            warn!(capacity, err = %_err, "rejecting mailbox capacity");
        }
        result
    }

    fn validate(capacity: i64) -> Result<Self, ConfigError> {
        if capacity < 1 {
            return Err(ConfigError::NonPositive { capacity });
        }
        if capacity.count_ones() != 1 {
            return Err(ConfigError::NotPowerOfTwo { capacity });
        }
        usize::try_from(capacity)
            .ok()
            .filter(|&c| c <= MAX_CAPACITY)
            .map(Self)
            .ok_or(ConfigError::TooLarge {
                capacity,
                max: MAX_CAPACITY,
            })
    }

    /// Returns the number of slots.
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Returns the mask that turns a sequence into a slot index.
    #[inline]
    pub const fn mask(self) -> usize {
        self.0 - 1
    }
}

impl TryFrom<i64> for Capacity {
    type Error = ConfigError;

    fn try_from(capacity: i64) -> Result<Self, Self::Error> {
        Self::new(capacity)
    }
}

impl TryFrom<usize> for Capacity {
    type Error = ConfigError;

    fn try_from(capacity: usize) -> Result<Self, Self::Error> {
        match i64::try_from(capacity) {
            Ok(capacity) => Self::new(capacity),
            Err(_) => Err(ConfigError::TooLarge {
                capacity: i64::MAX,
                max: MAX_CAPACITY,
            }),
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Configuration for a mailbox queue.
///
/// The wait strategy is injected as a shared policy object; the ring buffer
/// and barrier never branch on which one is in use.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    capacity: Capacity,
    wait_strategy: Arc<dyn WaitStrategy>,
    /// Deadline applied to each consumer wait. A timeout is retried, never surfaced.
    pub wait_timeout: Option<Duration>,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl MailboxConfig {
    /// Creates a configuration with the default sleeping wait strategy.
    ///
    /// Fails if `capacity` is not a positive power of two.
    pub fn new(capacity: i64) -> Result<Self, ConfigError> {
        Ok(Self::with_capacity(Capacity::new(capacity)?))
    }

    /// Creates a configuration from an already validated capacity.
    pub fn with_capacity(capacity: Capacity) -> Self {
        Self {
            capacity,
            wait_strategy: Arc::new(SleepingWaitStrategy::default()),
            wait_timeout: None,
            enable_metrics: false,
        }
    }

    /// Low latency configuration (4K slots, yielding consumer).
    pub fn low_latency() -> Self {
        Self::with_capacity(Capacity(1 << 12)).with_wait_strategy(YieldingWaitStrategy::default())
    }

    /// High throughput configuration (256K slots, sleeping consumer).
    pub fn high_throughput() -> Self {
        Self::with_capacity(Capacity(1 << 18))
    }

    /// Replaces the wait strategy.
    pub fn with_wait_strategy<W: WaitStrategy + 'static>(mut self, strategy: W) -> Self {
        self.wait_strategy = Arc::new(strategy);
        self
    }

    /// Replaces the wait strategy with an already shared instance.
    pub fn with_shared_wait_strategy(mut self, strategy: Arc<dyn WaitStrategy>) -> Self {
        self.wait_strategy = strategy;
        self
    }

    /// Sets the per-wait timeout.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Enables or disables metrics collection.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.enable_metrics = enabled;
        self
    }

    /// Returns the validated capacity.
    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub fn mask(&self) -> usize {
        self.capacity.mask()
    }

    /// Returns the configured wait strategy.
    #[inline]
    pub fn wait_strategy(&self) -> &Arc<dyn WaitStrategy> {
        &self.wait_strategy
    }
}

/// The mailbox section of a host configuration file.
///
/// With the `serde` feature it deserializes from kebab-case keys:
///
/// ```text
/// { "mailbox-capacity": 1024, "wait-strategy": "yielding", "wait-timeout-ms": 50 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", deny_unknown_fields))]
pub struct MailboxSettings {
    pub mailbox_capacity: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub wait_strategy: WaitStrategyKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub wait_timeout_ms: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enable_metrics: bool,
}

impl MailboxSettings {
    /// Settings with the given capacity and every other key at its default.
    pub fn new(mailbox_capacity: i64) -> Self {
        Self {
            mailbox_capacity,
            wait_strategy: WaitStrategyKind::default(),
            wait_timeout_ms: None,
            enable_metrics: false,
        }
    }
}

impl TryFrom<MailboxSettings> for MailboxConfig {
    type Error = ConfigError;

    fn try_from(settings: MailboxSettings) -> Result<Self, Self::Error> {
        let mut config = MailboxConfig::new(settings.mailbox_capacity)?
            .with_shared_wait_strategy(settings.wait_strategy.build())
            .with_metrics(settings.enable_metrics);
        config.wait_timeout = settings.wait_timeout_ms.map(Duration::from_millis);
        Ok(config)
    }
}
