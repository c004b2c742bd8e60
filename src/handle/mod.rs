/*!
 * Handle Module
 * Write-once task outcomes: the producing `Promise` and observing `Handle`
 */

mod promise;
mod state;
mod task_handle;

pub(crate) use promise::Promise;
pub(crate) use task_handle::pair;
pub use task_handle::Handle;
