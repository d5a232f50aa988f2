#![forbid(unsafe_code)]

//! Dispatch sweep state machine.
//!
//! ```text
//!            begin()                      begin() while dispatching
//!   Idle ─────────────▶ Dispatching ─────────────────────────▶ RestartPending
//!    ▲                      │  ▲                                      │
//!    │  finish_sweep()      │  └──────── finish_sweep() ─────────────┘
//!    └──────────────────────┘         (restart with target = All)
//! ```
//!
//! A nested dispatch request never recurses; it only marks the running sweep
//! for restart. The outermost caller loops until a sweep finishes cleanly.

use super::observer::ObserverId;

/// Which delegates a sweep covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTarget {
    /// Every registered delegate, in registration order.
    All,
    /// Only the given delegate.
    One(ObserverId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    #[default]
    Idle,
    Dispatching,
    RestartPending,
}

impl DispatchState {
    /// Try to start a sweep.
    ///
    /// Returns `false` if a sweep is already running; the running sweep is
    /// then marked for restart and the caller must return immediately.
    pub fn begin(&mut self) -> bool {
        match self {
            Self::Idle => {
                *self = Self::Dispatching;
                true
            }
            Self::Dispatching | Self::RestartPending => {
                *self = Self::RestartPending;
                false
            }
        }
    }

    /// True when the current sweep should stop early and start over.
    #[must_use]
    pub fn restart_pending(self) -> bool {
        self == Self::RestartPending
    }

    /// End one sweep.
    ///
    /// Returns `true` when dispatch is complete (state is back to idle), or
    /// `false` when another full sweep is required.
    pub fn finish_sweep(&mut self) -> bool {
        match self {
            Self::RestartPending => {
                *self = Self::Dispatching;
                false
            }
            Self::Dispatching | Self::Idle => {
                *self = Self::Idle;
                true
            }
        }
    }

    /// Force the idle state; used when a sweep unwinds.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }

    #[must_use]
    pub fn is_dispatching(self) -> bool {
        self != Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_from_idle_starts_sweep() {
        let mut state = DispatchState::default();
        assert!(state.begin());
        assert!(state.is_dispatching());
        assert!(!state.restart_pending());
        assert!(state.finish_sweep());
        assert_eq!(state, DispatchState::Idle);
    }

    #[test]
    fn nested_begin_requests_restart() {
        let mut state = DispatchState::default();
        assert!(state.begin());
        assert!(!state.begin());
        assert!(state.restart_pending());
        // Repeated nested requests collapse into one restart.
        assert!(!state.begin());
        assert!(!state.finish_sweep());
        assert_eq!(state, DispatchState::Dispatching);
        assert!(state.finish_sweep());
        assert!(!state.is_dispatching());
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut state = DispatchState::default();
        state.begin();
        state.begin();
        state.reset();
        assert_eq!(state, DispatchState::Idle);
    }
}
