#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::{Backoff, Constant};
use bon::Builder;

const DEFAULT_LIVENESS_INTERVAL_DURATION: Duration = Duration::from_secs(5);
const DEFAULT_RETRY_INTERVAL_DURATION: Duration = Duration::from_secs(3);
const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 10;
const DEFAULT_INITIAL_BACKOFF_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_MAX_BACKOFF_DURATION: Duration = Duration::from_secs(60);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Configuration for a [`ChannelManager`](super::ChannelManager).
///
/// Immutable once handed to the manager. Every field has a default, so either start from
/// [`Config::default`] or set only what differs through [`Config::builder`]:
///
/// ```
/// use std::time::Duration;
///
/// use ath_realtime::ws::config::Config;
///
/// let config = Config::builder()
///     .liveness_interval(Duration::from_secs(10))
///     .max_retry_attempts(5)
///     .build();
///
/// assert_eq!(config.max_retry_attempts, 5);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Config {
    /// Interval between liveness probes while the connection is open.
    ///
    /// A zero interval is replaced by the 5 second default.
    #[builder(default = DEFAULT_LIVENESS_INTERVAL_DURATION)]
    pub liveness_interval: Duration,
    /// Delay before each reconnection attempt
    #[builder(default)]
    pub retry_delay: RetryDelay,
    /// Reconnection attempts allowed between two successful opens. Zero disables reconnection.
    #[builder(default = DEFAULT_MAX_RETRY_ATTEMPTS)]
    pub max_retry_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            liveness_interval: DEFAULT_LIVENESS_INTERVAL_DURATION,
            retry_delay: RetryDelay::default(),
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }
}

impl Config {
    /// Liveness interval actually used by the manager.
    #[must_use]
    pub(crate) fn effective_liveness_interval(&self) -> Duration {
        if self.liveness_interval.is_zero() {
            DEFAULT_LIVENESS_INTERVAL_DURATION
        } else {
            self.liveness_interval
        }
    }
}

/// How long to wait before each reconnection attempt.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDelay {
    /// The same delay before every attempt
    Fixed(Duration),
    /// Exponentially growing delay with jitter, reset on every successful open
    Exponential(ExponentialDelay),
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RETRY_INTERVAL_DURATION)
    }
}

/// Parameters for [`RetryDelay::Exponential`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct ExponentialDelay {
    /// Backoff duration for the first reconnection attempt
    #[builder(default = DEFAULT_INITIAL_BACKOFF_DURATION)]
    pub initial: Duration,
    /// Maximum backoff duration
    #[builder(default = DEFAULT_MAX_BACKOFF_DURATION)]
    pub max: Duration,
    /// Multiplier applied after each attempt
    #[builder(default = DEFAULT_BACKOFF_MULTIPLIER)]
    pub multiplier: f64,
}

impl Default for ExponentialDelay {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_BACKOFF_DURATION,
            max: DEFAULT_MAX_BACKOFF_DURATION,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryDelay {
    /// Build the backoff schedule driving the reconnect loop.
    pub(crate) fn backoff(self) -> Box<dyn Backoff + Send> {
        match self {
            Self::Fixed(interval) => Box::new(Constant::new(interval)),
            Self::Exponential(delay) => Box::new(
                ExponentialBackoffBuilder::default()
                    .with_initial_interval(delay.initial)
                    .with_max_interval(delay.max)
                    .with_multiplier(delay.multiplier)
                    .with_max_elapsed_time(None) // Attempts are bounded by the manager instead
                    .build(),
            ),
        }
    }
}
