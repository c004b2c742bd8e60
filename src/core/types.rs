/*!
 * Core Types
 * Result aliases shared across the crate
 */

use super::errors::{ExecutorError, TaskError};

/// Terminal outcome of a task or combinator
pub type TaskResult<T> = Result<T, TaskError>;

/// Result of executor-level operations (spawn, construction)
pub type ExecutorResult<T> = Result<T, ExecutorError>;
