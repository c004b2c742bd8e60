/*!
 * Core Module
 * Fundamental types, identifiers and error handling
 */

pub mod errors;
pub mod id;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use id::{next_task_id, TaskId};
pub use types::*;
