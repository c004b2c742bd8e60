/*!
 * Executor Module
 * Task submission, batch submission, and drain-on-shutdown lifecycle
 */

pub mod config;
pub mod stats;
mod task_executor;
mod tracker;

pub use config::ExecutorConfig;
pub use stats::ExecutorStats;
pub use task_executor::TaskExecutor;
