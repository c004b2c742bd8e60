/*!
 * Executor Configuration
 *
 * Worker pool sizing and thread naming, with environment overrides
 */

use crate::core::{ExecutorError, ExecutorResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Number of async worker threads
pub const ENV_WORKER_THREADS: &str = "VTASK_WORKER_THREADS";
/// Upper bound on the blocking pool used by `spawn_blocking`
pub const ENV_MAX_BLOCKING_THREADS: &str = "VTASK_MAX_BLOCKING_THREADS";
/// Name prefix of runtime threads
pub const ENV_THREAD_NAME: &str = "VTASK_THREAD_NAME";

const DEFAULT_MAX_BLOCKING_THREADS: usize = 512;
const DEFAULT_THREAD_NAME: &str = "vtask-worker";

/// Executor configuration
///
/// The worker pool is the small set of real threads that all logical tasks
/// are multiplexed onto; it does not bound the number of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Async worker threads (default: available parallelism)
    pub worker_threads: usize,
    /// Maximum threads in the blocking pool
    pub max_blocking_threads: usize,
    /// Thread name for runtime threads
    pub thread_name: String,
    /// Stack size per runtime thread (runtime default when `None`)
    pub thread_stack_size: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            max_blocking_threads: DEFAULT_MAX_BLOCKING_THREADS,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            thread_stack_size: None,
        }
    }
}

impl ExecutorConfig {
    /// Single worker, small blocking pool. Useful for tests and for showing
    /// that task count is independent of thread count.
    pub fn single_worker() -> Self {
        Self {
            worker_threads: 1,
            max_blocking_threads: 4,
            ..Self::default()
        }
    }

    /// Larger blocking pool for workloads that lean on `spawn_blocking`
    pub fn blocking_heavy() -> Self {
        Self {
            max_blocking_threads: 1024,
            ..Self::default()
        }
    }

    /// Defaults with environment overrides applied
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `VTASK_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = read_env_usize(ENV_WORKER_THREADS) {
            self.worker_threads = n;
        }
        if let Some(n) = read_env_usize(ENV_MAX_BLOCKING_THREADS) {
            self.max_blocking_threads = n;
        }
        if let Ok(name) = std::env::var(ENV_THREAD_NAME) {
            if !name.trim().is_empty() {
                self.thread_name = name;
            }
        }
        self
    }

    pub fn with_worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    pub fn with_max_blocking_threads(mut self, n: usize) -> Self {
        self.max_blocking_threads = n;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Reject values the runtime cannot honour
    pub fn validate(&self) -> ExecutorResult<()> {
        if self.worker_threads == 0 {
            return Err(ExecutorError::InvalidConfig(
                "worker_threads must be at least 1".into(),
            ));
        }
        if self.max_blocking_threads == 0 {
            return Err(ExecutorError::InvalidConfig(
                "max_blocking_threads must be at least 1".into(),
            ));
        }
        if self.thread_stack_size == Some(0) {
            return Err(ExecutorError::InvalidConfig(
                "thread_stack_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn read_env_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring unparsable environment override");
            None
        }
    }
}
