/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::id::TaskId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::any::Any;
use thiserror::Error;

/// Failure stored in a handle's terminal state
///
/// Cloneable so every observer of a shared handle can receive its own copy.
/// Combined handles carry the failing input's error unchanged.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum TaskError {
    #[error("Task {task} failed: {message}")]
    #[diagnostic(
        code(task::failed),
        help("The task body returned an error. Inspect the message for the cause.")
    )]
    Failed { task: TaskId, message: String },

    #[error("Task {task} panicked: {message}")]
    #[diagnostic(
        code(task::panicked),
        help("The task body panicked. The panic was contained to this task.")
    )]
    Panicked { task: TaskId, message: String },

    #[error("Task was cancelled")]
    #[diagnostic(code(task::cancelled))]
    Cancelled,

    #[error("Task was dropped before producing a result")]
    #[diagnostic(
        code(task::abandoned),
        help("The executor was torn down while the task was still pending.")
    )]
    Abandoned,
}

impl TaskError {
    /// Build a `Failed` error from any displayable error value
    pub fn failed(task: TaskId, err: impl std::fmt::Display) -> Self {
        TaskError::Failed {
            task,
            message: err.to_string(),
        }
    }

    /// Build a `Panicked` error from a caught panic payload
    pub fn panicked(task: TaskId, payload: Box<dyn Any + Send>) -> Self {
        TaskError::Panicked {
            task,
            message: panic_message(payload.as_ref()),
        }
    }

    /// Whether the error came from the task body itself
    pub fn is_task_failure(&self) -> bool {
        matches!(self, TaskError::Failed { .. } | TaskError::Panicked { .. })
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

/// Executor-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ExecutorError {
    #[error("Executor is shut down and no longer accepts tasks")]
    #[diagnostic(
        code(executor::shut_down),
        help("Create a new executor; shutdown is permanent.")
    )]
    ShutDown,

    #[error("Failed to build runtime: {0}")]
    #[diagnostic(
        code(executor::runtime_build),
        help("Check thread limits and available system resources.")
    )]
    RuntimeBuild(String),

    #[error("Invalid executor configuration: {0}")]
    #[diagnostic(code(executor::invalid_config))]
    InvalidConfig(String),
}

impl From<std::io::Error> for ExecutorError {
    fn from(err: std::io::Error) -> Self {
        ExecutorError::RuntimeBuild(err.to_string())
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_task_error_serialization() {
        let err = TaskError::failed(TaskId(3), "disk on fire");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"error_type\":\"failed\""));

        let back: TaskError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_classification() {
        assert!(TaskError::failed(TaskId(1), "x").is_task_failure());
        assert!(!TaskError::Cancelled.is_task_failure());
        assert!(TaskError::Cancelled.is_cancelled());
        assert!(!TaskError::Abandoned.is_cancelled());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "no threads");
        let err: ExecutorError = io.into();
        assert!(matches!(err, ExecutorError::RuntimeBuild(ref m) if m.contains("no threads")));
    }
}
