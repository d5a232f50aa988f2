#![forbid(unsafe_code)]

//! Test harness for livecell.
//!
//! Deterministic stand-ins for the capabilities a holder consumes:
//!
//! - [`ManualLifecycle`]: a lifecycle owner moved by hand.
//! - [`ManualExecutor`]: tasks queue up until the test drains them.
//! - [`InlineExecutor`]: every thread is the executor; tasks run at once.
//! - [`ThreadExecutor`]: a real dedicated executor thread.
//! - [`Recorder`]: captures delivered values in order.

pub mod executor;
pub mod lifecycle;
pub mod recorder;

pub use executor::{InlineExecutor, ManualExecutor, ThreadExecutor};
pub use lifecycle::ManualLifecycle;
pub use recorder::Recorder;
