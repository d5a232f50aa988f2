#![forbid(unsafe_code)]

//! Runtime: the lifecycle-aware latest-value holder.
//!
//! # Role in livecell
//! `livecell-runtime` owns the value cell, the observer registry and the
//! dispatch engine. It consumes the capabilities defined in `livecell-core`
//! (lifecycle owners and the designated executor) and exposes [`LiveData`].
//!
//! # Quick start
//!
//! ```ignore
//! let live = LiveData::with_value(executor, 1);
//! let printer = Observer::new(|v: &i32| println!("value = {v}"));
//! live.observe(&owner, &printer);   // delivered once the owner starts
//! live.set_now(2);                  // on the executor thread
//! live.set_later(3);                // from any thread; coalesced
//! live.remove_observer(&printer);
//! ```
//!
//! # Threading
//! Registry mutation and dispatch happen on the executor. Other threads use
//! [`LiveData::set_later`] (or [`LiveData::send`]), which coalesce into at
//! most one pending executor task.

pub mod config;
pub mod error;
pub mod reactive;

pub use config::LiveDataConfig;
pub use error::LiveDataError;
pub use reactive::{
    ActivityEdge, LiveData, LiveDataBuilder, NEVER_DELIVERED, ObserveOptions, Observer,
    ObserverId, START_VERSION, ThreadMode, Version,
};
