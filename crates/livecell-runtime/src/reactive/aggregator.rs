#![forbid(unsafe_code)]

//! Reduction of per-delegate active flags into a single count with
//! edge-triggered became-used / became-unused notifications.
//!
//! # Invariants
//!
//! 1. At quiescence `count` equals the number of active delegates.
//! 2. Only 0→N and N→0 edges fire; 1→2 or 2→1 are silent.
//! 3. Edge callbacks never nest. A flip caused by an edge callback only
//!    adjusts the count; the outermost reducer notices the difference on its
//!    next [`step`](ActiveCountAggregator::step) and fires whatever edge
//!    occurred since its last stable point.

/// A 0↔N transition of the active count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEdge {
    /// The count went from zero to positive.
    BecameUsed,
    /// The count went from positive to zero.
    BecameUnused,
}

impl ActivityEdge {
    /// The edge crossed when moving from `prev` to `current`, if any.
    #[must_use]
    pub fn between(prev: usize, current: usize) -> Option<Self> {
        match (prev, current) {
            (0, c) if c > 0 => Some(Self::BecameUsed),
            (p, 0) if p > 0 => Some(Self::BecameUnused),
            _ => None,
        }
    }
}

/// Outcome of one reduction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceStep {
    /// The count is stable; reduction is over.
    Converged,
    /// The count moved without crossing zero.
    Quiet,
    /// The count crossed zero; the caller must run the matching hook.
    Fire(ActivityEdge),
}

#[derive(Debug, Clone, Default)]
pub struct ActiveCountAggregator {
    count: usize,
    reducing: bool,
}

impl ActiveCountAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_reducing(&self) -> bool {
        self.reducing
    }

    /// Record one delegate flipping to `active`.
    ///
    /// Returns the count before the flip when the caller has become the
    /// reducer, or `None` when a reduction is already running further up the
    /// stack.
    pub fn apply(&mut self, active: bool) -> Option<usize> {
        let prev = self.count;
        if active {
            self.count += 1;
        } else {
            debug_assert!(self.count > 0, "active count underflow");
            self.count = self.count.saturating_sub(1);
        }
        if self.reducing {
            return None;
        }
        self.reducing = true;
        Some(prev)
    }

    /// Compare `prev` with the current count and advance `prev`.
    ///
    /// Clears the reducing flag once the count has converged.
    pub fn step(&mut self, prev: &mut usize) -> ReduceStep {
        if *prev == self.count {
            self.reducing = false;
            return ReduceStep::Converged;
        }
        let edge = ActivityEdge::between(*prev, self.count);
        *prev = self.count;
        match edge {
            Some(edge) => ReduceStep::Fire(edge),
            None => ReduceStep::Quiet,
        }
    }

    /// Drop the reducing flag without converging; used when a hook unwinds.
    pub fn abort(&mut self) {
        self.reducing = false;
    }
}
