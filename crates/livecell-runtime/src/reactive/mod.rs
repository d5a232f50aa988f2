#![forbid(unsafe_code)]

//! Lifecycle-aware value holder and its dispatch machinery.
//!
//! This module provides:
//!
//! - [`LiveData`]: a shared, version-tracked latest value delivered to
//!   observers while their owners are active.
//! - [`Observer`]: a callback with stable identity, used to register and
//!   remove.
//! - [`ObserveOptions`] / [`ThreadMode`]: per-observer delivery options.
//!
//! # Architecture
//!
//! Leaves first: [`cell`] (value, version, pending slot), [`registry`]
//! (mutation-tolerant ordered map), [`delegate`] (per-observer state),
//! [`dispatch`] (sweep state machine), [`aggregator`] (active count and
//! edges), [`ledger`] (versions kept across removal), and finally
//! [`live_data`], which wires them together.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per committed value, equal or not.
//! 2. Observers are visited in registration order; late registrations made
//!    during a sweep are visited by that sweep.
//! 3. An observer is handed a given version at most once.
//! 4. Nested updates restart the running sweep; the stack never grows with
//!    nesting depth.

pub mod aggregator;
pub mod cell;
pub mod delegate;
pub mod dispatch;
pub mod ledger;
pub mod live_data;
pub mod observer;
pub mod options;
pub mod registry;

pub use aggregator::ActivityEdge;
pub use cell::{NEVER_DELIVERED, START_VERSION, Version};
pub use live_data::{LiveData, LiveDataBuilder};
pub use observer::{Observer, ObserverId};
pub use options::{ObserveOptions, ThreadMode};
