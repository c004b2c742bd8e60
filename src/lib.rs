/*!
 * vtask
 * Lightweight concurrent task execution
 *
 * - Executor: spawn very many logical threads onto a small worker pool
 * - Handle: write-once outcome shared by any number of observers
 * - Combinator: combine, map, join and react to outcomes without blocking
 */

pub mod combinator;
pub mod core;
pub mod executor;
pub mod handle;
pub mod monitoring;

// Re-exports
pub use crate::core::{ExecutorError, ExecutorResult, TaskError, TaskId, TaskResult};
pub use combinator::{combine, join_all, map, on_complete};
pub use executor::{ExecutorConfig, ExecutorStats, TaskExecutor};
pub use handle::Handle;
pub use monitoring::init_tracing;
