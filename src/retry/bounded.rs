//! Bounded retry configuration and its delivery strategies.

use super::handle::RetryHandle;
use super::unbounded::UnboundedRetry;
use crate::engine::{RetryOutcome, run_blocking, run_with_retry_async};
use crate::errors::ConfigError;
use crate::utils::retry::{Attempts, RetryOptions, RetryPolicy};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Retry configuration with a finite attempt bound.
///
/// Built around a fallible operation, configured with chained setters and
/// finished with one of the `resolve_*` strategies. Each strategy call is an
/// independent run, so one configuration can be resolved many times.
///
/// # Example
///
/// ```rust
/// use retry_engine::Retry;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// let calls = AtomicU32::new(0);
/// let value = Retry::new(|| {
///     if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///         Err("busy")
///     } else {
///         Ok(42)
///     }
/// })
/// .with_attempts(3)?
/// .with_delay(Duration::from_millis(1))
/// .resolve_or_throw();
///
/// assert_eq!(value, Ok(Some(42)));
/// # Ok::<(), retry_engine::ConfigError>(())
/// ```
pub struct Retry<F, E> {
    operation: Arc<F>,
    policy: RetryPolicy<E>,
}

impl<F, E> Clone for Retry<F, E> {
    fn clone(&self) -> Self {
        Self {
            operation: Arc::clone(&self.operation),
            policy: self.policy.clone(),
        }
    }
}

impl<F, E> fmt::Debug for Retry<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<F, T, E> Retry<F, E>
where
    F: Fn() -> Result<T, E>,
    E: 'static,
{
    /// Wrap an operation with the default bound of a single attempt and no delay.
    pub fn new(operation: F) -> Self {
        Self {
            operation: Arc::new(operation),
            policy: RetryPolicy::new(Attempts::DEFAULT, None),
        }
    }

    /// Wrap an operation with the bound and delay from `options`.
    pub fn with_options(operation: F, options: RetryOptions) -> Self {
        Self {
            operation: Arc::new(operation),
            policy: RetryPolicy::new(Attempts::Bounded(options.attempts), options.delay),
        }
    }

    /// Set the maximum number of attempts.
    ///
    /// Zero is allowed and means the operation is never invoked. A negative
    /// value is rejected with [`ConfigError::NegativeAttempts`].
    pub fn with_attempts(mut self, attempts: i64) -> Result<Self, ConfigError> {
        self.policy.attempts = Attempts::try_from(attempts)?;
        Ok(self)
    }

    /// Set the pause between a failed attempt and the next one.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.policy.delay = Some(delay);
        self
    }

    /// Set a callback invoked before every retry, after the delay.
    pub fn on_retry<C>(mut self, callback: C) -> Self
    where
        C: Fn() + Send + Sync + 'static,
    {
        self.policy.on_retry = Some(Arc::new(callback));
        self
    }

    /// Set the consumer for errors swallowed by
    /// [`resolve_optional`](Self::resolve_optional) and
    /// [`resolve_async`](Self::resolve_async). Defaults to a no-op.
    pub fn on_exception<C>(mut self, consumer: C) -> Self
    where
        C: Fn(&E) + Send + Sync + 'static,
    {
        self.policy.on_exception = Arc::new(consumer);
        self
    }

    /// Drop the attempt bound, keeping the operation, delay and callbacks.
    pub fn into_unbounded(self) -> UnboundedRetry<F, E> {
        UnboundedRetry::from_parts(self.operation, self.policy)
    }

    /// The configured attempt bound.
    pub fn attempts(&self) -> Attempts {
        self.policy.attempts
    }

    /// The configured delay between attempts.
    pub fn delay(&self) -> Option<Duration> {
        self.policy.delay
    }

    /// Run on the calling thread and return the last error unchanged if every
    /// attempt fails.
    ///
    /// The exception consumer is not called. `Ok(None)` is returned only for a
    /// zero-attempt bound.
    pub fn resolve_or_throw(&self) -> Result<Option<T>, E> {
        self.run().into_result()
    }

    /// Run on the calling thread and replace a terminal failure with the error
    /// built by `error_factory`.
    ///
    /// The original error is discarded, and the exception consumer is not
    /// called.
    pub fn resolve_or_throw_with<X, G>(&self, error_factory: G) -> Result<Option<T>, X>
    where
        G: FnOnce() -> X,
    {
        self.run().into_result().map_err(|_| error_factory())
    }

    /// Run on the calling thread and hand a terminal failure to the exception
    /// consumer instead of returning it.
    pub fn resolve_optional(&self) -> Option<T> {
        self.run().into_optional(&self.policy.on_exception)
    }

    fn run(&self) -> RetryOutcome<T, E> {
        #[cfg(feature = "tracing")]
        debug!(
            attempts = %self.policy.attempts,
            delay = ?self.policy.delay,
            "Starting retry run"
        );

        run_blocking(
            &*self.operation,
            self.policy.attempts,
            self.policy.delay,
            self.policy.on_retry.as_deref(),
        )
    }
}

impl<F, T, E> Retry<F, E>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Run on a background tokio task with the same semantics as
    /// [`resolve_optional`](Self::resolve_optional).
    ///
    /// A panic inside the operation is not swallowed; the handle resolves to
    /// [`HandleError::Panicked`](crate::HandleError::Panicked).
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn resolve_async(&self) -> RetryHandle<T> {
        let operation = Arc::clone(&self.operation);
        let policy = self.policy.clone();
        RetryHandle::spawn(move |token| async move {
            let outcome = run_with_retry_async(operation, &policy, None, token).await?;
            Ok(outcome.into_optional(&policy.on_exception))
        })
    }
}
