#![forbid(unsafe_code)]

//! Logging support.
//!
//! With the `tracing` feature enabled the `tracing` macros are re-exported;
//! without it no-op replacements keep call sites unconditional.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
mod noop {
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    pub(crate) use {debug, trace};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use noop::{debug, trace};
