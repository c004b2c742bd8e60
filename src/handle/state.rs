/*!
 * Shared Handle State
 *
 * Write-once outcome cell shared between the producing side (`Promise`)
 * and every observing `Handle` clone.
 *
 * ## Publication protocol
 *
 * - The outcome is set at most once, while holding the waiter lock.
 * - Waiter registration checks the outcome under the same lock, so a
 *   waiter is either queued before publication (and drained by it) or
 *   sees the published outcome. No waiter is lost, none runs twice.
 * - Reads of a published outcome go through `OnceLock::get` and take no
 *   lock.
 * - Wakers and continuations run after the lock is released.
 */

use crate::core::errors::panic_message;
use crate::core::{TaskError, TaskId, TaskResult};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;
use std::task::Waker;
use tokio::task::AbortHandle;
use tracing::{error, trace};

/// Callback invoked once with the terminal outcome
pub(crate) type Continuation<T> = Box<dyn FnOnce(&TaskResult<T>) + Send + 'static>;

struct Waiters<T> {
    wakers: Vec<Waker>,
    continuations: Vec<Continuation<T>>,
}

impl<T> Default for Waiters<T> {
    fn default() -> Self {
        Self {
            wakers: Vec::new(),
            continuations: Vec::new(),
        }
    }
}

pub(crate) struct Shared<T> {
    id: TaskId,
    outcome: OnceLock<TaskResult<T>>,
    waiters: Mutex<Waiters<T>>,
    /// Runtime task backing this handle, if any (combinator handles have none)
    abort: OnceLock<AbortHandle>,
}

impl<T> Shared<T> {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            id,
            outcome: OnceLock::new(),
            waiters: Mutex::new(Waiters::default()),
            abort: OnceLock::new(),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    /// Lock-free read of the published outcome
    #[inline]
    pub(crate) fn outcome(&self) -> Option<&TaskResult<T>> {
        self.outcome.get()
    }

    /// Publish the terminal outcome
    ///
    /// Returns `false` if the cell was already terminal; the supplied
    /// result is discarded in that case.
    pub(crate) fn complete(&self, result: TaskResult<T>) -> bool {
        let drained = {
            let mut waiters = self.waiters.lock();
            if self.outcome.set(result).is_err() {
                return false;
            }
            std::mem::take(&mut *waiters)
        };

        trace!(
            task = %self.id,
            wakers = drained.wakers.len(),
            continuations = drained.continuations.len(),
            "handle completed"
        );

        for waker in drained.wakers {
            waker.wake();
        }

        if let Some(outcome) = self.outcome.get() {
            for continuation in drained.continuations {
                run_continuation(self.id, continuation, outcome);
            }
        }

        true
    }

    /// Register a waker, or return the outcome if already terminal
    pub(crate) fn poll_outcome(&self, waker: &Waker) -> Option<&TaskResult<T>> {
        if let Some(outcome) = self.outcome.get() {
            return Some(outcome);
        }

        let mut waiters = self.waiters.lock();
        match self.outcome.get() {
            Some(outcome) => Some(outcome),
            None => {
                if !waiters.wakers.iter().any(|w| w.will_wake(waker)) {
                    waiters.wakers.push(waker.clone());
                }
                None
            }
        }
    }

    /// Register a continuation; runs it immediately if already terminal
    pub(crate) fn on_complete(&self, continuation: Continuation<T>) {
        let waiters = self.waiters.lock();
        match self.outcome.get() {
            Some(outcome) => {
                drop(waiters);
                run_continuation(self.id, continuation, outcome);
            }
            None => {
                let mut waiters = waiters;
                waiters.continuations.push(continuation);
            }
        }
    }

    /// Attach the runtime task so cancellation can abort it
    pub(crate) fn attach_abort(&self, handle: AbortHandle) {
        if self.abort.set(handle).is_ok() {
            // Cancelled between spawn and attach
            if let Some(Err(TaskError::Cancelled)) = self.outcome.get() {
                if let Some(handle) = self.abort.get() {
                    handle.abort();
                }
            }
        }
    }

    /// Transition Pending -> Failed(Cancelled), aborting the backing task
    pub(crate) fn cancel(&self) -> bool {
        let cancelled = self.complete(Err(TaskError::Cancelled));
        if cancelled {
            if let Some(handle) = self.abort.get() {
                handle.abort();
            }
        }
        cancelled
    }
}

fn run_continuation<T>(id: TaskId, continuation: Continuation<T>, outcome: &TaskResult<T>) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| continuation(outcome))) {
        error!(
            task = %id,
            panic = %panic_message(payload.as_ref()),
            "continuation panicked; ignoring"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_complete_only_once() {
        let shared = Shared::new(TaskId(1));
        assert!(shared.complete(Ok(1)));
        assert!(!shared.complete(Ok(2)));
        assert!(!shared.complete(Err(TaskError::Cancelled)));
        assert_eq!(shared.outcome(), Some(&Ok(1)));
    }

    #[test]
    fn test_continuations_drained_on_complete() {
        let shared = Shared::<u32>::new(TaskId(2));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            shared.on_complete(Box::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        shared.complete(Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // A second completion attempt must not re-run anything
        shared.complete(Ok(6));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_panicking_continuation_is_isolated() {
        let shared = Shared::<u32>::new(TaskId(3));
        let ran = Arc::new(AtomicUsize::new(0));

        shared.on_complete(Box::new(|_| panic!("bad continuation")));
        let ran_clone = ran.clone();
        shared.on_complete(Box::new(move |_| {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(shared.complete(Ok(1)));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_without_backing_task() {
        let shared = Shared::<u32>::new(TaskId(4));
        assert!(shared.cancel());
        assert!(!shared.cancel());
        assert_eq!(shared.outcome(), Some(&Err(TaskError::Cancelled)));
    }
}
