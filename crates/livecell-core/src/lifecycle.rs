#![forbid(unsafe_code)]

//! Lifecycle states and the owner capability.
//!
//! A [`LifecycleOwner`] is anything whose lifespan moves through the ordered
//! [`LifecycleState`]s. Observers bound to an owner are only eligible for
//! delivery while the owner is at least [`LifecycleState::Started`], and are
//! removed automatically once it reaches [`LifecycleState::Destroyed`].
//!
//! # Ordering
//!
//! ```text
//! Destroyed < Initialized < Created < Started < Resumed
//! ```
//!
//! `Destroyed` sorts lowest so that "at least started" is a single
//! comparison, matching the usual UI lifecycle model.

use std::fmt;
use std::sync::Arc;

/// Ordered lifecycle state reported by a [`LifecycleOwner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Terminal state. No further transitions are expected.
    Destroyed,
    /// Constructed but not yet created.
    Initialized,
    /// Created, not visible.
    Created,
    /// Visible; observers bound to this owner are active.
    Started,
    /// Visible and focused.
    Resumed,
}

impl LifecycleState {
    /// True when `self` is at or beyond `other` in the lifecycle order.
    #[inline]
    #[must_use]
    pub fn is_at_least(self, other: Self) -> bool {
        self >= other
    }

    /// True for states in which bound observers may receive values.
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        self.is_at_least(Self::Started)
    }

    /// True for the terminal state.
    #[inline]
    #[must_use]
    pub fn is_destroyed(self) -> bool {
        self == Self::Destroyed
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Destroyed => "destroyed",
            Self::Initialized => "initialized",
            Self::Created => "created",
            Self::Started => "started",
            Self::Resumed => "resumed",
        };
        f.write_str(name)
    }
}

/// Handle returned by [`LifecycleOwner::add_listener`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// Callback invoked with the owner's new state after each transition.
pub type LifecycleListener = Arc<dyn Fn(LifecycleState) + Send + Sync>;

/// Something with a lifecycle that observers can be bound to.
///
/// Implementations must invoke listeners *without* holding internal locks:
/// listeners routinely call back into [`current_state`](Self::current_state)
/// and may trigger further transitions.
pub trait LifecycleOwner: Send + Sync {
    /// The authoritative current state.
    fn current_state(&self) -> LifecycleState;

    /// Register a listener for state transitions.
    fn add_listener(&self, listener: LifecycleListener) -> ListenerId;

    /// Unregister a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Human-readable name for diagnostics.
    fn name(&self) -> &str {
        "lifecycle-owner"
    }
}

/// Identity comparison for owners behind trait objects.
///
/// Compares data addresses only; two `Arc`s to the same owner are the same
/// owner even if they were coerced through different vtables.
#[inline]
#[must_use]
pub fn same_owner(a: &Arc<dyn LifecycleOwner>, b: &Arc<dyn LifecycleOwner>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
