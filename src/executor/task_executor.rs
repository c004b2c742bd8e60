/*!
 * Task Executor
 *
 * Runs each submitted unit of work as an independently scheduled logical
 * thread on an owned multi-thread runtime.
 *
 * ## Scheduling model
 *
 * ```text
 *   spawn() x N                        worker pool (few OS threads)
 *  ┌────────────┐   admit + handle   ┌───────────────────────────┐
 *  │  caller    ├───────────────────►│ tokio multi-thread runtime│
 *  └────────────┘                    │  tasks yield at .await,   │
 *        ▲                           │  sleep, handle waits      │
 *        │ Handle<R>                 └─────────────┬─────────────┘
 *        │                                         │ Promise::complete
 *        └─────────────────────────────────────────┘
 * ```
 *
 * A task holds a worker only while it is being polled. Sleeping or waiting
 * on another handle parks the task, not the thread, so the number of tasks
 * is bounded by memory rather than by thread count.
 *
 * ## Failure isolation
 *
 * Panics are caught per task (`catch_unwind`) and `Err` values from
 * `try_spawn` are captured; both end up as the handle's failed state and
 * never reach the executor or sibling tasks.
 */

use super::config::ExecutorConfig;
use super::stats::{ExecutorStats, Settlement};
use super::tracker::{ExecutorInner, TaskGuard};
use crate::core::{ExecutorError, ExecutorResult, TaskError, TaskId, TaskResult};
use crate::handle::{pair, Handle};
use crate::monitoring::span_operation;
use futures::FutureExt;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, debug_span, info, trace, warn, Instrument};
use uuid::Uuid;

/// Executor for lightweight tasks
///
/// Explicitly constructed and explicitly passed; there is no global
/// instance. Dropping the executor from synchronous code waits for all
/// in-flight tasks, like [`TaskExecutor::shutdown_blocking`].
///
/// # Example
///
/// ```ignore
/// let executor = TaskExecutor::new(ExecutorConfig::default())?;
/// let handles = executor.submit_many((0..10_000).map(|i| async move {
///     tokio::time::sleep(Duration::from_millis(10)).await;
///     i
/// }))?;
/// executor.shutdown_blocking();
/// ```
pub struct TaskExecutor {
    inner: Arc<ExecutorInner>,
    runtime: Option<Runtime>,
    handle: tokio::runtime::Handle,
    config: ExecutorConfig,
}

impl TaskExecutor {
    /// Build an executor and its worker pool
    pub fn new(config: ExecutorConfig) -> ExecutorResult<Self> {
        config.validate()?;

        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name(config.thread_name.clone())
            .enable_all();
        if let Some(bytes) = config.thread_stack_size {
            builder.thread_stack_size(bytes);
        }
        let runtime = builder.build()?;

        let inner = Arc::new(ExecutorInner::new());
        info!(
            executor = %inner.id,
            worker_threads = config.worker_threads,
            max_blocking_threads = config.max_blocking_threads,
            "Task executor started"
        );

        Ok(Self {
            inner,
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            config,
        })
    }

    /// Executor configured from `VTASK_*` environment variables
    pub fn from_env() -> ExecutorResult<Self> {
        Self::new(ExecutorConfig::from_env())
    }

    /// Spawn a task; a panic inside it becomes `TaskError::Panicked`
    pub fn spawn<F>(&self, future: F) -> ExecutorResult<Handle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + Sync + 'static,
    {
        self.launch("async", move |id| async move {
            AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .map_err(|payload| TaskError::panicked(id, payload))
        })
    }

    /// Spawn a fallible task; `Err(e)` becomes `TaskError::Failed`
    pub fn try_spawn<F, T, E>(&self, future: F) -> ExecutorResult<Handle<T>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + Sync + 'static,
        E: Display + Send + 'static,
    {
        self.launch("async", move |id| async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(TaskError::failed(id, err)),
                Err(payload) => Err(TaskError::panicked(id, payload)),
            }
        })
    }

    /// Run a blocking closure on the runtime's blocking pool
    ///
    /// Cancelling the handle settles it immediately, but a closure that has
    /// already started runs to completion; its result is discarded.
    pub fn spawn_blocking<F, T>(&self, f: F) -> ExecutorResult<Handle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.launch("blocking", move |id| async move {
            match tokio::task::spawn_blocking(f).await {
                Ok(value) => Ok(value),
                Err(err) if err.is_panic() => Err(TaskError::panicked(id, err.into_panic())),
                Err(_) => Err(TaskError::Cancelled),
            }
        })
    }

    /// Spawn every task; `handles[i]` belongs to the i-th task
    ///
    /// Stops at the first rejection (executor shut down). Tasks spawned
    /// before that point keep running.
    pub fn submit_many<I, F>(&self, tasks: I) -> ExecutorResult<Vec<Handle<F::Output>>>
    where
        I: IntoIterator<Item = F>,
        F: Future + Send + 'static,
        F::Output: Send + Sync + 'static,
    {
        let op = span_operation("submit_many");
        let handles = tasks
            .into_iter()
            .map(|task| self.spawn(task))
            .collect::<ExecutorResult<Vec<_>>>()?;

        op.record_items(handles.len());
        debug!(executor = %self.inner.id, count = handles.len(), "Submitted task batch");
        Ok(handles)
    }

    fn launch<T, Fut, B>(&self, kind: &'static str, build: B) -> ExecutorResult<Handle<T>>
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
        B: FnOnce(TaskId) -> Fut,
    {
        let mut guard = TaskGuard::admit(&self.inner).ok_or(ExecutorError::ShutDown)?;

        let id = crate::core::next_task_id();
        let (promise, handle) = pair::<T>(id);
        let work = build(id);
        let span = debug_span!("task", task = %id, executor = %self.inner.id, kind);

        let join = self.handle.spawn(
            async move {
                trace!("task started");
                let result = work.await;

                let settlement = match &result {
                    Ok(_) => Settlement::Completed,
                    Err(TaskError::Cancelled) => Settlement::Cancelled,
                    Err(err) => {
                        warn!(error = %err, "task failed");
                        Settlement::Failed
                    }
                };

                if promise.complete(result) {
                    guard.settle(settlement);
                } else {
                    // Cancelled through the handle while running
                    guard.settle(Settlement::Cancelled);
                }
                trace!(?settlement, "task finished");
            }
            .instrument(span),
        );
        handle.attach_abort(join.abort_handle());

        Ok(handle)
    }

    /// Stop accepting tasks and wait for every in-flight task
    ///
    /// Idempotent. Task failures are reported through their handles, never
    /// here. Must not be awaited from one of this executor's own tasks.
    pub async fn shutdown(&self) {
        let op = span_operation("shutdown").without_slow_warning();
        op.record_items(self.begin_shutdown());
        self.inner.in_flight.wait_idle().await;
        info!(executor = %self.inner.id, "Task executor drained");
    }

    /// Blocking form of [`TaskExecutor::shutdown`] for synchronous callers
    pub fn shutdown_blocking(&self) {
        let op = span_operation("shutdown").without_slow_warning();
        op.record_items(self.begin_shutdown());
        self.inner.in_flight.wait_idle_blocking();
        info!(executor = %self.inner.id, "Task executor drained");
    }

    /// Close admission; returns the in-flight count at that moment
    fn begin_shutdown(&self) -> usize {
        let in_flight = self.inner.in_flight.current();
        if self.inner.close() {
            info!(executor = %self.inner.id, in_flight, "Task executor shutting down");
        }
        in_flight
    }

    /// Drive a future to completion on this executor from synchronous code
    ///
    /// Panics if called from within an async context, like the runtime's own
    /// `block_on`.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Tasks accepted but not yet terminal
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.current()
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.is_accepting()
    }

    pub fn stats(&self) -> ExecutorStats {
        self.inner.stats.snapshot(self.inner.in_flight.current())
    }

    /// Underlying runtime handle, for entering the runtime context
    pub fn runtime_handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            // Blocking here would stall the surrounding runtime
            let outstanding = self.begin_shutdown();
            if outstanding > 0 {
                warn!(
                    executor = %self.inner.id,
                    outstanding,
                    "Executor dropped inside async context; outstanding tasks abandoned"
                );
            }
            runtime.shutdown_background();
        } else {
            self.shutdown_blocking();
            drop(runtime);
        }
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("id", &self.inner.id)
            .field("accepting", &self.is_accepting())
            .field("in_flight", &self.in_flight())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn executor() -> TaskExecutor {
        TaskExecutor::new(ExecutorConfig::default().with_worker_threads(2)).unwrap()
    }

    #[test]
    fn test_spawn_and_wait() {
        let executor = executor();
        let handle = executor.spawn(async { 21 * 2 }).unwrap();
        assert_eq!(handle.wait_blocking(), Ok(42));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = TaskExecutor::new(ExecutorConfig::default().with_worker_threads(0));
        assert!(matches!(result, Err(ExecutorError::InvalidConfig(_))));
    }

    #[test]
    fn test_panic_is_captured() {
        let executor = executor();
        let handle = executor
            .spawn(async {
                if true {
                    panic!("task exploded");
                }
                1u8
            })
            .unwrap();

        match handle.wait_blocking() {
            Err(TaskError::Panicked { task, message }) => {
                assert_eq!(task, handle.id());
                assert_eq!(message, "task exploded");
            }
            other => panic!("expected panic failure, got {:?}", other),
        }
        assert!(executor.is_accepting());
    }

    #[test]
    fn test_try_spawn_error_is_captured() {
        let executor = executor();
        let handle = executor
            .try_spawn(async { Err::<u8, _>("not today") })
            .unwrap();

        assert!(matches!(
            handle.wait_blocking(),
            Err(TaskError::Failed { ref message, .. }) if message == "not today"
        ));
    }

    #[test]
    fn test_spawn_blocking() {
        let executor = executor();
        let handle = executor
            .spawn_blocking(|| {
                std::thread::sleep(Duration::from_millis(5));
                "blocking done"
            })
            .unwrap();
        assert_eq!(handle.wait_blocking(), Ok("blocking done"));
    }

    #[test]
    fn test_spawn_after_shutdown_rejected() {
        let executor = executor();
        executor.shutdown_blocking();
        assert!(!executor.is_accepting());
        assert!(matches!(
            executor.spawn(async { 1 }),
            Err(ExecutorError::ShutDown)
        ));
    }

    #[test]
    fn test_stats_track_outcomes() {
        let executor = executor();
        let ok = executor.spawn(async { 1 }).unwrap();
        let bad = executor.try_spawn(async { Err::<i32, _>("nope") }).unwrap();
        let _ = ok.wait_blocking();
        let _ = bad.wait_blocking();
        executor.shutdown_blocking();

        let stats = executor.stats();
        assert_eq!(stats.spawned, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[test]
    fn test_block_on_runs_inside_runtime() {
        let executor = executor();
        let value = executor.block_on(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            7
        });
        assert_eq!(value, 7);
    }
}
