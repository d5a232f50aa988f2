#![forbid(unsafe_code)]

//! Per-observer options.

use std::fmt;
use std::str::FromStr;

use crate::error::LiveDataError;

/// How a publish reaches an observer when the producer is off the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadMode {
    /// Commit on the executor: directly when already there, otherwise by
    /// posting through the coalescing slot.
    #[default]
    Main,
    /// Commit synchronously on the caller's thread.
    Poster,
}

impl ThreadMode {
    /// Integer code used by configuration sources.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Main => 1,
            Self::Poster => 2,
        }
    }
}

impl TryFrom<u8> for ThreadMode {
    type Error = LiveDataError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Main),
            2 => Ok(Self::Poster),
            other => Err(LiveDataError::UnknownThreadMode(other.to_string())),
        }
    }
}

impl FromStr for ThreadMode {
    type Err = LiveDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(Self::Main),
            "poster" => Ok(Self::Poster),
            other => Err(LiveDataError::UnknownThreadMode(other.to_string())),
        }
    }
}

impl fmt::Display for ThreadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Poster => f.write_str("poster"),
        }
    }
}

/// Options attached to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    pub thread_mode: ThreadMode,
}

impl ObserveOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn thread_mode(mut self, mode: ThreadMode) -> Self {
        self.thread_mode = mode;
        self
    }
}
