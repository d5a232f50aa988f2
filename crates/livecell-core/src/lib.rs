#![forbid(unsafe_code)]

//! Core: the capabilities a livecell value holder consumes.
//!
//! # Role in livecell
//! `livecell-core` is the vocabulary layer. It defines the two external
//! collaborators that the runtime depends on without knowing how they are
//! implemented:
//!
//! - **LifecycleOwner**: something with an ordered lifecycle (created, started,
//!   resumed, destroyed) that reports its current state and notifies listeners
//!   when that state changes.
//! - **Executor**: the designated single-threaded executor. It runs tasks and
//!   answers whether the calling thread is the executor thread.
//!
//! # How it fits in the system
//! The runtime (`livecell-runtime`) binds observers to lifecycle owners and
//! funnels every mutation through an executor. The harness
//! (`livecell-harness`) provides deterministic implementations of both
//! traits for tests.

pub mod executor;
pub mod lifecycle;

pub use executor::{Executor, Task};
pub use lifecycle::{LifecycleListener, LifecycleOwner, LifecycleState, ListenerId, same_owner};
