/*!
 * Promise
 * Writing side of a handle, owned by whoever produces the outcome
 */

use super::state::Shared;
use crate::core::{TaskError, TaskResult};
use std::sync::Arc;

/// Single-use writer for a handle's outcome
///
/// Dropping an unfulfilled promise fails the handle with
/// `TaskError::Abandoned`, so observers never wait on work that no longer
/// exists (e.g. a task dropped when its runtime was torn down).
pub(crate) struct Promise<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Promise<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self {
            shared: Some(shared),
        }
    }

    /// Publish the outcome; `false` if the handle was already terminal
    /// (for instance cancelled while the task was running)
    pub(crate) fn complete(mut self, result: TaskResult<T>) -> bool {
        match self.shared.take() {
            Some(shared) => shared.complete(result),
            None => false,
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            if shared.complete(Err(TaskError::Abandoned)) {
                tracing::debug!(task = %shared.id(), "promise dropped unfulfilled");
            }
        }
    }
}
