//! Retry configurations and their delivery strategies.

pub(crate) mod bounded;
pub(crate) mod handle;
pub(crate) mod unbounded;

pub use bounded::Retry;
pub use handle::RetryHandle;
pub use unbounded::UnboundedRetry;
