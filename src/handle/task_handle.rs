/*!
 * Task Handle
 *
 * Observing side of a task's eventual outcome. Cloning a handle yields
 * another observer of the same outcome.
 */

use super::promise::Promise;
use super::state::Shared;
use crate::core::{next_task_id, TaskId, TaskResult};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Handle to the eventual outcome of a task or combinator
///
/// States: Pending, then exactly one of Completed(value) / Failed(error).
/// A terminal handle never changes again.
///
/// # Observing
///
/// - `.await` (requires `T: Clone`): suspends without holding a worker
/// - [`Handle::on_complete`]: continuation run exactly once
/// - [`Handle::wait_blocking`]: for synchronous callers only
/// - [`Handle::result`]: non-blocking, lock-free peek
pub struct Handle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Create a linked promise/handle pair
pub(crate) fn pair<T>(id: TaskId) -> (Promise<T>, Handle<T>) {
    let shared = Arc::new(Shared::new(id));
    (Promise::new(Arc::clone(&shared)), Handle { shared })
}

impl<T> Handle<T> {
    /// Handle that is already terminal with `result`
    pub fn ready(result: TaskResult<T>) -> Self {
        let (promise, handle) = pair(next_task_id());
        promise.complete(result);
        handle
    }

    #[inline]
    pub fn id(&self) -> TaskId {
        self.shared.id()
    }

    /// Terminal outcome, if any. Never blocks, takes no lock.
    #[inline]
    pub fn result(&self) -> Option<&TaskResult<T>> {
        self.shared.outcome()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.result().is_some()
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        !self.is_finished()
    }

    /// Cancel the task if it is still pending
    ///
    /// Converts Pending into `Failed(TaskError::Cancelled)` and aborts the
    /// backing runtime task. Idempotent: returns `true` only for the call
    /// that performed the transition, `false` if the handle was already
    /// terminal.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Register a continuation invoked exactly once with the terminal outcome
    ///
    /// If the handle is already terminal the continuation runs immediately on
    /// the calling thread; otherwise it runs on the thread that completes the
    /// handle. A panicking continuation is logged and does not affect others.
    pub fn on_complete<F>(&self, continuation: F)
    where
        F: FnOnce(&TaskResult<T>) + Send + 'static,
    {
        self.shared.on_complete(Box::new(continuation));
    }

    /// Block the current thread until the handle is terminal
    ///
    /// Must not be called from inside a runtime worker: it parks the OS
    /// thread. Async code should `.await` the handle instead.
    pub fn wait_blocking(&self) -> TaskResult<T>
    where
        T: Clone + Send + 'static,
    {
        if let Some(result) = self.result() {
            return result.clone();
        }

        let signal = Arc::new((Mutex::new(None::<TaskResult<T>>), Condvar::new()));
        let notifier = Arc::clone(&signal);
        self.on_complete(move |result| {
            let (slot, cvar) = &*notifier;
            *slot.lock() = Some(result.clone());
            cvar.notify_all();
        });

        let (slot, cvar) = &*signal;
        let mut slot = slot.lock();
        loop {
            if let Some(result) = slot.take() {
                return result;
            }
            cvar.wait(&mut slot);
        }
    }

    pub(crate) fn attach_abort(&self, handle: tokio::task::AbortHandle) {
        self.shared.attach_abort(handle);
    }
}

impl<T: Clone> Future for Handle<T> {
    type Output = TaskResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.shared.poll_outcome(cx.waker()) {
            Some(result) => Poll::Ready(result.clone()),
            None => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.result() {
            None => "pending",
            Some(Ok(_)) => "completed",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("Handle")
            .field("id", &self.id())
            .field("state", &state)
            .finish()
    }
}
