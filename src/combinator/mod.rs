/*!
 * Combinator Module
 * Compose handles without blocking: pairwise combine, map, batch join,
 * and completion callbacks
 */

mod combine;
mod join;

pub use combine::{combine, map};
pub use join::join_all;

use crate::core::TaskResult;
use crate::handle::Handle;

/// Run `continuation` exactly once when `handle` becomes terminal
///
/// Free-function form of [`Handle::on_complete`].
pub fn on_complete<T, F>(handle: &Handle<T>, continuation: F)
where
    F: FnOnce(&TaskResult<T>) + Send + 'static,
{
    handle.on_complete(continuation);
}
