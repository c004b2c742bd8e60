/*!
 * In-Flight Tracking
 *
 * Counts tasks that have been accepted but are not yet terminal, and lets
 * shutdown wait for that count to reach zero from either async or blocking
 * code.
 */

use super::stats::{Settlement, StatsCounters};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    notify: Notify,
    lock: Mutex<()>,
    idle: Condvar,
}

impl InFlight {
    /// Returns the count after incrementing
    pub(crate) fn enter(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn exit(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
            // Taken so a blocking waiter cannot miss the wakeup between
            // checking the count and parking.
            let _guard = self.lock.lock();
            self.idle.notify_all();
        }
    }

    #[inline]
    pub(crate) fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn wait_idle_blocking(&self) {
        let mut guard = self.lock.lock();
        while self.current() != 0 {
            self.idle.wait(&mut guard);
        }
    }
}

/// State shared between the executor and its running tasks
pub(crate) struct ExecutorInner {
    pub(crate) id: Uuid,
    pub(crate) accepting: AtomicBool,
    pub(crate) in_flight: InFlight,
    pub(crate) stats: StatsCounters,
}

impl ExecutorInner {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            accepting: AtomicBool::new(true),
            in_flight: InFlight::default(),
            stats: StatsCounters::default(),
        }
    }

    /// Stop accepting; `true` only for the call that flipped the flag
    pub(crate) fn close(&self) -> bool {
        self.accepting.swap(false, Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

/// Accounts one task from admission until it is dropped
///
/// The in-flight count is released on drop, so tasks aborted or dropped by
/// the runtime are accounted as cancelled without reaching `settle`.
pub(crate) struct TaskGuard {
    inner: Arc<ExecutorInner>,
    settled: bool,
}

impl TaskGuard {
    /// Admit a task, or `None` if the executor is closed
    ///
    /// The count is raised before the accepting flag is read. Together with
    /// shutdown closing the flag before reading the count, this guarantees
    /// shutdown either waits for the task or the task is rejected.
    pub(crate) fn admit(inner: &Arc<ExecutorInner>) -> Option<Self> {
        let in_flight = inner.in_flight.enter();
        if !inner.is_accepting() {
            inner.in_flight.exit();
            return None;
        }
        inner.stats.record_spawn(in_flight);
        Some(Self {
            inner: Arc::clone(inner),
            settled: false,
        })
    }

    pub(crate) fn settle(&mut self, settlement: Settlement) {
        if !self.settled {
            self.settled = true;
            self.inner.stats.record(settlement);
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.settle(Settlement::Cancelled);
        self.inner.in_flight.exit();
    }
}
