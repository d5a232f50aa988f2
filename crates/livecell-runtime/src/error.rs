#![forbid(unsafe_code)]

//! Usage errors raised by the holder.
//!
//! | Condition | Example | Behavior |
//! |-----------|---------|----------|
//! | Off-executor call | `set_now` from a worker thread | panic (strict mode) |
//! | Owner conflict | same observer, two owners | panic / `Err` from `try_*` |
//! | Unknown thread mode | `"background".parse::<ThreadMode>()` | `Err` |
//!
//! Duplicate registration under the same owner and stale active flags are not
//! errors; they are logged and absorbed.

use std::fmt;

use crate::reactive::ObserverId;

/// Errors from holder operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveDataError {
    /// An executor-only operation was invoked from another thread.
    OffExecutor { operation: &'static str },
    /// The observer is already registered under a different owner.
    OwnerConflict { observer: ObserverId },
    /// A thread-mode option was not recognized.
    UnknownThreadMode(String),
}

impl fmt::Display for LiveDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffExecutor { operation } => {
                write!(f, "cannot invoke {operation} off the executor thread")
            }
            Self::OwnerConflict { observer } => {
                write!(f, "{observer} is already registered with a different owner")
            }
            Self::UnknownThreadMode(mode) => write!(f, "unsupported thread mode: {mode}"),
        }
    }
}

impl std::error::Error for LiveDataError {}
