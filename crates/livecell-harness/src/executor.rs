#![forbid(unsafe_code)]

//! Executor implementations for tests.
//!
//! | Executor          | Designated thread      | `execute`                 |
//! |-------------------|------------------------|---------------------------|
//! | `ManualExecutor`  | the creating thread    | queued until drained      |
//! | `InlineExecutor`  | every thread           | runs immediately          |
//! | `ThreadExecutor`  | a dedicated thread     | sent over a channel       |

use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use livecell_core::{Executor, Task};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Queues tasks until the test drains them from the creating thread.
pub struct ManualExecutor {
    thread: ThreadId,
    queue: Mutex<VecDeque<Task>>,
}

impl std::fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("thread", &self.thread)
            .field("pending", &self.pending())
            .finish()
    }
}

impl Default for ManualExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualExecutor {
    /// The calling thread becomes the designated thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            thread: thread::current().id(),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest queued task. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        debug_assert!(self.is_current(), "ManualExecutor drained off its thread");
        // Pop first so the task can queue more work without deadlocking.
        let task = self.queue.lock().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including any queued meanwhile.
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        trace!(ran, "manual executor drained");
        ran
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, task: Task) {
        self.queue.lock().push_back(task);
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }
}

/// Treats every thread as the executor and runs tasks synchronously.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }

    fn is_current(&self) -> bool {
        true
    }
}

enum Msg {
    Run(Task),
    Shutdown,
}

/// A dedicated executor thread fed through a channel.
///
/// Tasks run in submission order. Dropping the executor stops the thread
/// after the tasks already queued have run.
pub struct ThreadExecutor {
    sender: mpsc::Sender<Msg>,
    thread: ThreadId,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ThreadExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadExecutor")
            .field("thread", &self.thread)
            .finish_non_exhaustive()
    }
}

impl ThreadExecutor {
    /// Spawn the executor thread.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn a thread.
    #[must_use]
    pub fn start() -> Self {
        let (tx, rx) = mpsc::channel::<Msg>();
        let handle = thread::Builder::new()
            .name("livecell-executor".into())
            .spawn(move || executor_loop(rx))
            .expect("failed to spawn executor thread");
        let thread = handle.thread().id();
        debug!(?thread, "executor thread started");
        Self {
            sender: tx,
            thread,
            handle: Some(handle),
        }
    }

    /// Run `f` on the executor thread and wait for its result.
    ///
    /// Runs inline when already on the executor thread.
    ///
    /// # Panics
    ///
    /// Panics if the executor thread has stopped or `f` panicked there.
    pub fn run_sync<R, F>(&self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return f();
        }
        let (tx, rx) = mpsc::sync_channel(1);
        self.execute(Box::new(move || {
            let _ = tx.send(f());
        }));
        rx.recv().expect("executor thread stopped before replying")
    }

    /// Block until every task submitted before this call has run.
    pub fn flush(&self) {
        self.run_sync(|| ());
    }

    /// Stop the thread after draining queued tasks.
    pub fn shutdown(self) {
        // Drop does the work.
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, task: Task) {
        // Sends after shutdown are dropped, like the render thread's.
        let _ = self.sender.send(Msg::Run(task));
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        let _ = self.sender.send(Msg::Shutdown);
        if self.is_current() {
            // Dropped by one of its own tasks; the loop exits on Shutdown.
            return;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn executor_loop(rx: mpsc::Receiver<Msg>) {
    while let Ok(msg) = rx.recv() {
        match msg {
            Msg::Run(task) => task(),
            Msg::Shutdown => break,
        }
    }
    debug!("executor thread stopped");
}
