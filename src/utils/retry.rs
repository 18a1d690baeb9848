//! Retry settings shared by the bounded and unbounded configurations.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked after a failed attempt, right before the next one starts.
pub type OnRetryCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback that receives a failure the delivery strategy decided to swallow.
pub type OnExceptionCallback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Upper bound on the number of attempts in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attempts {
    /// At most this many attempts. Zero means the operation is never invoked.
    Bounded(u32),
    /// Retry until the operation succeeds or the run is cancelled.
    Unbounded,
}

impl Attempts {
    const DEFAULT_BOUND: u32 = 1;

    /// Default bound used when none is configured: a single attempt.
    pub const DEFAULT: Attempts = Attempts::Bounded(Self::DEFAULT_BOUND);

    /// Returns true if this bound allows no attempt at all.
    pub fn is_zero(&self) -> bool {
        matches!(self, Attempts::Bounded(0))
    }
}

impl TryFrom<i64> for Attempts {
    type Error = ConfigError;

    fn try_from(attempts: i64) -> Result<Self, Self::Error> {
        if attempts < 0 {
            return Err(ConfigError::NegativeAttempts { attempts });
        }
        u32::try_from(attempts)
            .map(Attempts::Bounded)
            .map_err(|_| ConfigError::TooManyAttempts { attempts })
    }
}

impl fmt::Display for Attempts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attempts::Bounded(n) => write!(f, "{n}"),
            Attempts::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Plain retry options for the bounded configuration.
///
/// Use the builder methods, or deserialize it from configuration:
///
/// ```rust
/// use retry_engine::RetryOptions;
/// use std::time::Duration;
///
/// let options = RetryOptions::default()
///     .with_attempts(5)
///     .with_delay(Duration::from_millis(200));
///
/// assert_eq!(options.attempts, 5);
/// assert_eq!(options.delay, Some(Duration::from_millis(200)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Maximum number of attempts (default: 1).
    pub attempts: u32,
    /// Fixed pause between attempts (default: none).
    #[serde(rename = "delay_ms", with = "delay_millis")]
    pub delay: Option<Duration>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            attempts: Attempts::DEFAULT_BOUND,
            delay: None,
        }
    }
}

impl RetryOptions {
    /// Set the maximum number of attempts.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the pause between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

mod delay_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(delay: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        delay
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

/// Everything a run needs besides the operation itself.
pub(crate) struct RetryPolicy<E> {
    pub(crate) attempts: Attempts,
    pub(crate) delay: Option<Duration>,
    pub(crate) on_retry: Option<OnRetryCallback>,
    pub(crate) on_exception: OnExceptionCallback<E>,
}

impl<E: 'static> RetryPolicy<E> {
    pub(crate) fn new(attempts: Attempts, delay: Option<Duration>) -> Self {
        Self {
            attempts,
            delay,
            on_retry: None,
            on_exception: Arc::new(|_: &E| {}),
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            attempts: self.attempts,
            delay: self.delay,
            on_retry: self.on_retry.clone(),
            on_exception: Arc::clone(&self.on_exception),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("attempts", &self.attempts)
            .field("delay", &self.delay)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "..."))
            .field("on_exception", &"...")
            .finish()
    }
}
