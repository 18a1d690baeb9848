//! Settings and callback types shared across configurations.

pub(crate) mod retry;
