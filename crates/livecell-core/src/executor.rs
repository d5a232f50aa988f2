#![forbid(unsafe_code)]

//! The designated single-threaded executor capability.
//!
//! Every registry mutation, dispatch sweep and active-state transition runs
//! on one executor thread. Producers on other threads reach it only through
//! [`Executor::execute`].

use std::sync::Arc;

/// A unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A single-threaded executor that owns all holder state transitions.
pub trait Executor: Send + Sync {
    /// Queue `task` to run on the executor thread.
    ///
    /// Must not run the task synchronously while the caller holds any lock it
    /// might need; implementations that run inline are only suitable for
    /// single-threaded tests.
    fn execute(&self, task: Task);

    /// True when the calling thread is the executor thread.
    fn is_current(&self) -> bool;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, task: Task) {
        (**self).execute(task);
    }

    fn is_current(&self) -> bool {
        (**self).is_current()
    }
}
