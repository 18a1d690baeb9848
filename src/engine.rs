//! The retry loop.
//!
//! A run invokes the operation until it succeeds or the attempt bound is
//! reached. Between attempts it pauses for the configured delay and then
//! notifies the retry callback, in that order. The final failed attempt of a
//! bounded run is never followed by a delay or a retry notification.
//!
//! The loop exists twice: [`run_with_retry`] blocks the calling thread, and an
//! async twin runs on tokio with cooperative cancellation. Both count attempts
//! through the same tracker.

use crate::errors::HandleError;
use crate::utils::retry::{Attempts, OnExceptionCallback, RetryPolicy};
use backon::{BackoffBuilder, ConstantBackoff, ConstantBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing")]
use opentelemetry::trace::Status;
#[cfg(feature = "tracing")]
use tracing::{Span, debug, warn};
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded.
    Success(T),
    /// Every allowed attempt failed. Holds the error of the last one.
    Exhausted(E),
    /// The bound was zero, so the operation was never invoked.
    NotAttempted,
}

impl<T, E> RetryOutcome<T, E> {
    /// Returns true if an attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success(_))
    }

    /// Surface the terminal error unchanged.
    ///
    /// A run that never attempted anything yields `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, E> {
        match self {
            RetryOutcome::Success(value) => Ok(Some(value)),
            RetryOutcome::Exhausted(err) => Err(err),
            RetryOutcome::NotAttempted => Ok(None),
        }
    }

    /// Hand the terminal error to `consumer` and drop it.
    ///
    /// The consumer runs at most once and never for a zero-attempt run.
    pub fn into_optional(self, consumer: &OnExceptionCallback<E>) -> Option<T> {
        match self {
            RetryOutcome::Success(value) => Some(value),
            RetryOutcome::Exhausted(err) => {
                consumer(&err);
                None
            }
            RetryOutcome::NotAttempted => None,
        }
    }
}

/// What happens after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Pause for the given duration, then try again.
    Retry(Duration),
    /// The bound is reached.
    Terminal,
}

/// Counts failed attempts and hands out the pause before each retry.
///
/// The pauses come from a constant backoff capped at `bound - 1` retries, so
/// the iterator running dry is exactly the terminal condition.
pub(crate) struct AttemptTracker {
    backoff: ConstantBackoff,
    failures: u64,
}

impl AttemptTracker {
    pub(crate) fn new(attempts: Attempts, delay: Option<Duration>) -> Self {
        let builder = ConstantBuilder::default().with_delay(delay.unwrap_or(Duration::ZERO));
        let builder = match attempts {
            Attempts::Bounded(n) => builder.with_max_times(n.saturating_sub(1) as usize),
            Attempts::Unbounded => builder.without_max_times(),
        };
        Self {
            backoff: builder.build(),
            failures: 0,
        }
    }

    /// Record a failed attempt and decide what comes next.
    pub(crate) fn record_failure(&mut self) -> Step {
        self.failures = self.failures.saturating_add(1);
        match self.backoff.next() {
            Some(delay) => Step::Retry(delay),
            None => Step::Terminal,
        }
    }

    /// Number of failed attempts so far.
    pub(crate) fn failures(&self) -> u64 {
        self.failures
    }
}

/// Run `operation` up to `max_attempts` times on the calling thread.
///
/// The delay, if any, is slept with [`std::thread::sleep`]. `on_retry` runs
/// after each delay and before the next attempt. The error of the last
/// attempt comes back unchanged in [`RetryOutcome::Exhausted`].
///
/// # Example
///
/// ```rust
/// use retry_engine::{RetryOutcome, run_with_retry};
/// use std::cell::Cell;
///
/// let calls = Cell::new(0);
/// let outcome = run_with_retry(
///     || {
///         calls.set(calls.get() + 1);
///         if calls.get() < 3 { Err("not yet") } else { Ok("done") }
///     },
///     3,
///     None,
///     None,
/// );
///
/// assert_eq!(outcome, RetryOutcome::Success("done"));
/// assert_eq!(calls.get(), 3);
/// ```
pub fn run_with_retry<T, E, F>(
    operation: F,
    max_attempts: u32,
    delay: Option<Duration>,
    on_retry: Option<&(dyn Fn() + Send + Sync)>,
) -> RetryOutcome<T, E>
where
    F: Fn() -> Result<T, E>,
{
    run_blocking(operation, Attempts::Bounded(max_attempts), delay, on_retry)
}

/// Blocking loop behind [`run_with_retry`] and the bounded configuration.
/// Callers only ever pass a bounded `attempts`.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(name = "retry.run", skip_all, fields(attempts = %attempts))
)]
pub(crate) fn run_blocking<T, E, F>(
    operation: F,
    attempts: Attempts,
    delay: Option<Duration>,
    on_retry: Option<&(dyn Fn() + Send + Sync)>,
) -> RetryOutcome<T, E>
where
    F: Fn() -> Result<T, E>,
{
    if attempts.is_zero() {
        return RetryOutcome::NotAttempted;
    }

    let mut tracker = AttemptTracker::new(attempts, delay);
    loop {
        let err = match operation() {
            Ok(value) => {
                #[cfg(feature = "tracing")]
                debug!(failures = tracker.failures(), "Operation succeeded");
                return RetryOutcome::Success(value);
            }
            Err(err) => err,
        };

        match tracker.record_failure() {
            Step::Terminal => {
                #[cfg(feature = "tracing")]
                warn!(failures = tracker.failures(), "Attempts exhausted");
                return RetryOutcome::Exhausted(err);
            }
            Step::Retry(pause) => {
                #[cfg(feature = "tracing")]
                debug!(
                    attempt = tracker.failures(),
                    retry_after_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
                    "Attempt failed, retrying"
                );
                if !pause.is_zero() {
                    std::thread::sleep(pause);
                }
                if let Some(callback) = on_retry {
                    callback();
                }
            }
        }
    }
}

/// Run the operation on tokio until it succeeds, exhausts the bound, or
/// `token` is cancelled.
///
/// Each attempt runs on the blocking pool. A cancellation observed while an
/// attempt is in flight ends the run immediately; the attempt itself finishes
/// in the background and its result is dropped. An attempt that already
/// finished when the cancellation is seen keeps its result.
///
/// `on_failure` is told about every failed attempt that will be retried. The
/// unbounded configuration uses it, since its loop has no terminal failure.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(name = "retry.run_async", skip_all, fields(attempts = %policy.attempts))
)]
pub(crate) async fn run_with_retry_async<T, E, F>(
    operation: Arc<F>,
    policy: &RetryPolicy<E>,
    on_failure: Option<&OnExceptionCallback<E>>,
    token: CancellationToken,
) -> Result<RetryOutcome<T, E>, HandleError>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    if policy.attempts.is_zero() {
        return Ok(RetryOutcome::NotAttempted);
    }

    let mut tracker = AttemptTracker::new(policy.attempts, policy.delay);
    loop {
        if token.is_cancelled() {
            return Err(cancelled(&tracker));
        }

        let op = Arc::clone(&operation);
        let attempt = tokio::task::spawn_blocking(move || (*op)());
        // A finished attempt wins over a cancellation that arrived after it.
        let result = tokio::select! {
            biased;
            joined = attempt => joined?,
            _ = token.cancelled() => return Err(cancelled(&tracker)),
        };

        let err = match result {
            Ok(value) => {
                #[cfg(feature = "tracing")]
                {
                    debug!(failures = tracker.failures(), "Operation succeeded");
                    Span::current().set_status(Status::Ok);
                }
                return Ok(RetryOutcome::Success(value));
            }
            Err(err) => err,
        };

        let pause = match tracker.record_failure() {
            Step::Terminal => {
                #[cfg(feature = "tracing")]
                {
                    warn!(failures = tracker.failures(), "Attempts exhausted");
                    Span::current().set_status(Status::error("attempts exhausted"));
                }
                return Ok(RetryOutcome::Exhausted(err));
            }
            Step::Retry(pause) => {
                if let Some(consumer) = on_failure {
                    consumer(&err);
                }
                pause
            }
        };

        #[cfg(feature = "tracing")]
        debug!(
            attempt = tracker.failures(),
            retry_after_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
            "Attempt failed, retrying"
        );

        if !pause.is_zero() {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(cancelled(&tracker)),
                _ = tokio::time::sleep(pause) => {}
            }
        }
        if let Some(callback) = &policy.on_retry {
            callback();
        }
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn cancelled(tracker: &AttemptTracker) -> HandleError {
    #[cfg(feature = "tracing")]
    {
        debug!(failures = tracker.failures(), "Retry run cancelled");
        Span::current().set_status(Status::error("cancelled"));
    }
    HandleError::Cancelled
}
