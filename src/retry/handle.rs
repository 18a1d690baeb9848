//! Handle to a retry run executing on a background task.

use crate::errors::HandleError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker, ready};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancellable handle returned by `resolve_async`.
///
/// Await it (it is a [`Future`]), wait with a limit via
/// [`wait_timeout`](Self::wait_timeout), or check without blocking via
/// [`try_result`](Self::try_result). It resolves to:
///
/// - `Ok(Some(value))` when an attempt succeeded,
/// - `Ok(None)` when the bound was exhausted or was zero,
/// - `Err(HandleError)` when the run was cancelled or the operation panicked.
///
/// Dropping the handle detaches the run; call [`cancel`](Self::cancel) first
/// to stop it.
pub struct RetryHandle<T> {
    join: Option<JoinHandle<Result<Option<T>, HandleError>>>,
    token: CancellationToken,
}

impl<T: Send + 'static> RetryHandle<T> {
    /// Spawn `run` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub(crate) fn spawn<R, Fut>(run: R) -> Self
    where
        R: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<Option<T>, HandleError>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let join = tokio::spawn(run(token.clone()));
        Self {
            join: Some(join),
            token,
        }
    }
}

impl<T> RetryHandle<T> {
    /// Request cancellation.
    ///
    /// No attempt starts after this call. A run waiting in its delay or in a
    /// running attempt resolves to [`HandleError::Cancelled`]. A run that had
    /// already produced its result keeps it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns true if the background task has completed, or its result was
    /// already taken.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Token that cancels this run, for wiring into other shutdown logic.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Take the result if the run has completed, without waiting.
    ///
    /// Returns `None` while the run is still going.
    pub fn try_result(&mut self) -> Option<Result<Option<T>, HandleError>> {
        let mut cx = Context::from_waker(Waker::noop());
        match Pin::new(self).poll(&mut cx) {
            Poll::Ready(result) => Some(result),
            Poll::Pending => None,
        }
    }

    /// Wait for the result for at most `timeout`.
    ///
    /// Elapsing the limit returns [`HandleError::Timeout`] and leaves the run
    /// going, so the handle can be waited on again or cancelled.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<T>, HandleError> {
        match tokio::time::timeout(timeout, &mut *self).await {
            Ok(result) => result,
            Err(_) => Err(HandleError::Timeout { timeout }),
        }
    }
}

impl<T> Future for RetryHandle<T> {
    type Output = Result<Option<T>, HandleError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(join) = self.join.as_mut() else {
            return Poll::Ready(Err(HandleError::Consumed));
        };
        let joined = ready!(Pin::new(join).poll(cx));
        self.join = None;
        Poll::Ready(joined.unwrap_or_else(|err| Err(HandleError::from(err))))
    }
}

impl<T> fmt::Debug for RetryHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryHandle")
            .field("finished", &self.is_finished())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
