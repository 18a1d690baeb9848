//! Error types for retry configuration and asynchronous delivery.
//!
//! Failures raised by the retried operation itself are never wrapped in these
//! types. They are returned unchanged by the throwing strategies or handed to
//! the exception consumer by the swallowing ones.

use std::any::Any;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;

/// Invalid retry configuration, reported when the setter is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The attempt bound was negative.
    #[error("Attempt bound must not be negative, got {attempts}")]
    NegativeAttempts {
        /// The rejected value.
        attempts: i64,
    },

    /// The attempt bound does not fit into the supported range.
    #[error("Attempt bound {attempts} exceeds the maximum of {}", u32::MAX)]
    TooManyAttempts {
        /// The rejected value.
        attempts: i64,
    },
}

/// Errors reported by a [`RetryHandle`](crate::RetryHandle).
///
/// None of these variants describe a failure of the operation. Exhausting the
/// attempt bound resolves the handle to `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The run was cancelled before it produced a result.
    #[error("Retry run was cancelled")]
    Cancelled,

    /// Waiting on the handle took longer than allowed. The run keeps going.
    #[error("Timed out after {:.3}s waiting for retry run", timeout.as_secs_f64())]
    Timeout {
        /// The wait limit that elapsed.
        timeout: Duration,
    },

    /// The operation panicked during an attempt.
    #[error("Retried operation panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// The result was already taken from this handle.
    #[error("Retry result was already taken from this handle")]
    Consumed,
}

impl From<JoinError> for HandleError {
    fn from(err: JoinError) -> Self {
        if err.is_panic() {
            HandleError::Panicked {
                message: panic_message(err.into_panic()),
            }
        } else {
            HandleError::Cancelled
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
