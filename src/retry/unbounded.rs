//! Retry configuration without an attempt bound.

use super::handle::RetryHandle;
use crate::engine::run_with_retry_async;
use crate::utils::retry::{Attempts, RetryPolicy};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Retry configuration that keeps trying until the operation succeeds or the
/// run is cancelled.
///
/// Only [`resolve_async`](Self::resolve_async) is available, because a loop
/// that may never end must not run on the caller's thread. Obtain one with
/// [`UnboundedRetry::new`] or [`Retry::into_unbounded`](crate::Retry::into_unbounded).
///
/// The exception consumer is called for every failed attempt, before the
/// delay that precedes the next one.
///
/// # Example
///
/// ```rust
/// use retry_engine::UnboundedRetry;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let calls = Arc::new(AtomicU32::new(0));
/// let counter = Arc::clone(&calls);
/// let handle = UnboundedRetry::new(move || {
///     if counter.fetch_add(1, Ordering::SeqCst) < 5 { Err("warming up") } else { Ok("ready") }
/// })
/// .with_delay(Duration::from_millis(1))
/// .resolve_async();
///
/// assert_eq!(handle.await, Ok(Some("ready")));
/// assert_eq!(calls.load(Ordering::SeqCst), 6);
/// # }
/// ```
pub struct UnboundedRetry<F, E> {
    operation: Arc<F>,
    policy: RetryPolicy<E>,
}

impl<F, E> Clone for UnboundedRetry<F, E> {
    fn clone(&self) -> Self {
        Self {
            operation: Arc::clone(&self.operation),
            policy: self.policy.clone(),
        }
    }
}

impl<F, E> fmt::Debug for UnboundedRetry<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnboundedRetry")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<F, E> UnboundedRetry<F, E> {
    pub(crate) fn from_parts(operation: Arc<F>, mut policy: RetryPolicy<E>) -> Self {
        policy.attempts = Attempts::Unbounded;
        Self { operation, policy }
    }
}

impl<F, T, E> UnboundedRetry<F, E>
where
    F: Fn() -> Result<T, E>,
    E: 'static,
{
    /// Wrap an operation with no delay and no callbacks.
    pub fn new(operation: F) -> Self {
        Self::from_parts(Arc::new(operation), RetryPolicy::new(Attempts::Unbounded, None))
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

    /// Set the consumer called with the error of every failed attempt.
    pub fn on_exception<C>(mut self, consumer: C) -> Self
    where
        C: Fn(&E) + Send + Sync + 'static,
    {
        self.policy.on_exception = Arc::new(consumer);
        self
    }

    /// The configured delay between attempts.
    pub fn delay(&self) -> Option<Duration> {
        self.policy.delay
    }
}

impl<F, T, E> UnboundedRetry<F, E>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Start retrying on a background tokio task.
    ///
    /// The handle resolves to `Ok(Some(value))` on the first success, or to
    /// an error if the run is cancelled or the operation panics.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn resolve_async(&self) -> RetryHandle<T> {
        let operation = Arc::clone(&self.operation);
        let policy = self.policy.clone();
        RetryHandle::spawn(move |token| async move {
            let on_failure = Arc::clone(&policy.on_exception);
            let outcome = run_with_retry_async(operation, &policy, Some(&on_failure), token).await?;
            Ok(outcome.into_result().unwrap_or_default())
        })
    }
}
