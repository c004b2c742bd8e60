/*!
 * Batch Join
 * Collect a sequence of handles into one handle, preserving input order
 */

use crate::core::{next_task_id, TaskResult};
use crate::handle::{pair, Handle, Promise};
use parking_lot::Mutex;
use std::sync::Arc;

struct JoinState<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
    promise: Option<Promise<Vec<T>>>,
}

/// Handle completing with every input value, in input order
///
/// `result[i]` is the value of `handles[i]` regardless of completion
/// order. The first input failure fails the joined handle; an empty input
/// completes immediately with an empty vector.
pub fn join_all<T, I>(handles: I) -> Handle<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Handle<T>>,
{
    let handles: Vec<Handle<T>> = handles.into_iter().collect();
    if handles.is_empty() {
        return Handle::ready(Ok(Vec::new()));
    }

    let (promise, joined) = pair::<Vec<T>>(next_task_id());
    let state = Arc::new(Mutex::new(JoinState {
        slots: vec![None; handles.len()],
        remaining: handles.len(),
        promise: Some(promise),
    }));

    tracing::trace!(joined = %joined.id(), inputs = handles.len(), "join registered");

    for (index, handle) in handles.iter().enumerate() {
        let state = Arc::clone(&state);
        handle.on_complete(move |result: &TaskResult<T>| {
            let finish = {
                let mut state = state.lock();
                match result {
                    Ok(value) => {
                        if state.promise.is_none() {
                            return;
                        }
                        state.slots[index] = Some(value.clone());
                        state.remaining -= 1;
                        if state.remaining == 0 {
                            let values = state.slots.drain(..).flatten().collect::<Vec<_>>();
                            state.promise.take().map(|p| (p, Ok(values)))
                        } else {
                            None
                        }
                    }
                    Err(err) => state.promise.take().map(|p| (p, Err(err.clone()))),
                }
            };

            if let Some((promise, outcome)) = finish {
                promise.complete(outcome);
            }
        });
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskError;

    #[test]
    fn test_empty_join() {
        let joined = join_all(Vec::<Handle<u8>>::new());
        assert_eq!(joined.result(), Some(&Ok(vec![])));
    }

    #[test]
    fn test_join_preserves_order() {
        let pairs: Vec<_> = (0..5).map(|_| pair::<usize>(next_task_id())).collect();
        let handles: Vec<_> = pairs.iter().map(|(_, h)| h.clone()).collect();
        let joined = join_all(handles);

        for (i, (promise, _)) in pairs.into_iter().enumerate().rev() {
            assert!(joined.is_pending());
            promise.complete(Ok(i * 100));
        }

        assert_eq!(joined.result(), Some(&Ok(vec![0, 100, 200, 300, 400])));
    }

    #[test]
    fn test_join_first_failure_wins() {
        let (p0, h0) = pair::<u8>(next_task_id());
        let (p1, h1) = pair::<u8>(next_task_id());
        let joined = join_all([h0, h1.clone()]);

        p1.complete(Err(TaskError::failed(h1.id(), "second")));
        assert!(matches!(
            joined.result(),
            Some(Err(TaskError::Failed { message, .. })) if message == "second"
        ));

        p0.complete(Ok(1));
        assert!(matches!(joined.result(), Some(Err(_))));
    }
}
