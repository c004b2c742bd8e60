/*!
 * Pairwise Combination
 *
 * `combine` joins two independently computed handles; `map` transforms a
 * single one. Both are driven by continuations registered on their inputs:
 * nothing polls or blocks, and the input that completes last runs the
 * user function on its completing thread.
 */

use crate::core::{next_task_id, TaskError, TaskId, TaskResult};
use crate::handle::{pair, Handle, Promise};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::trace;

struct CombineState<A, B, C, F> {
    id: TaskId,
    a: Option<A>,
    b: Option<B>,
    f: Option<F>,
    promise: Option<Promise<C>>,
}

/// Work decided under the lock, carried out after releasing it
enum Step<A, B, C, F> {
    Wait,
    Run(TaskId, Promise<C>, A, B, F),
    Fail(Promise<C>, TaskError),
}

impl<A, B, C, F> CombineState<A, B, C, F> {
    fn ready(&mut self) -> Step<A, B, C, F> {
        if self.a.is_none() || self.b.is_none() || self.promise.is_none() {
            return Step::Wait;
        }
        match (
            self.promise.take(),
            self.a.take(),
            self.b.take(),
            self.f.take(),
        ) {
            (Some(promise), Some(a), Some(b), Some(f)) => Step::Run(self.id, promise, a, b, f),
            _ => Step::Wait,
        }
    }

    /// First failure wins; later ones find the promise gone
    fn fail(&mut self, err: &TaskError) -> Step<A, B, C, F> {
        self.f = None;
        self.a = None;
        self.b = None;
        match self.promise.take() {
            Some(promise) => Step::Fail(promise, err.clone()),
            None => Step::Wait,
        }
    }
}

impl<A, B, C, F> Step<A, B, C, F>
where
    F: FnOnce(A, B) -> C,
{
    fn execute(self) {
        match self {
            Step::Wait => {}
            Step::Fail(promise, err) => {
                trace!(error = %err, "combine input failed");
                promise.complete(Err(err));
            }
            Step::Run(id, promise, a, b, f) => {
                let result = catch_unwind(AssertUnwindSafe(move || f(a, b)))
                    .map_err(|payload| TaskError::panicked(id, payload));
                promise.complete(result);
            }
        }
    }
}

/// Combine two handles once both complete
///
/// The returned handle completes with `f(a, b)` after both inputs complete,
/// or fails with the first input error observed (`f` is then never called).
/// Exactly one error is reported even if both inputs fail. A panic in `f`
/// fails the handle with `TaskError::Panicked`.
pub fn combine<A, B, C, F>(a: &Handle<A>, b: &Handle<B>, f: F) -> Handle<C>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    C: Send + Sync + 'static,
    F: FnOnce(A, B) -> C + Send + 'static,
{
    let (promise, combined) = pair::<C>(next_task_id());
    let state = Arc::new(Mutex::new(CombineState {
        id: combined.id(),
        a: None,
        b: None,
        f: Some(f),
        promise: Some(promise),
    }));

    trace!(left = %a.id(), right = %b.id(), combined = %combined.id(), "combine registered");

    let left = Arc::clone(&state);
    a.on_complete(move |result: &TaskResult<A>| {
        let step = {
            let mut state = left.lock();
            match result {
                Ok(value) => {
                    state.a = Some(value.clone());
                    state.ready()
                }
                Err(err) => state.fail(err),
            }
        };
        step.execute();
    });

    let right = state;
    b.on_complete(move |result: &TaskResult<B>| {
        let step = {
            let mut state = right.lock();
            match result {
                Ok(value) => {
                    state.b = Some(value.clone());
                    state.ready()
                }
                Err(err) => state.fail(err),
            }
        };
        step.execute();
    });

    combined
}

/// Transform a handle's success value; failures pass through unchanged
pub fn map<T, U, F>(handle: &Handle<T>, f: F) -> Handle<U>
where
    T: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
    F: FnOnce(T) -> U + Send + 'static,
{
    let (promise, mapped) = pair::<U>(next_task_id());
    let id = mapped.id();

    handle.on_complete(move |result: &TaskResult<T>| {
        let output = match result {
            Ok(value) => {
                let value = value.clone();
                catch_unwind(AssertUnwindSafe(move || f(value)))
                    .map_err(|payload| TaskError::panicked(id, payload))
            }
            Err(err) => Err(err.clone()),
        };
        promise.complete(output);
    });

    mapped
}

impl<T> Handle<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Method form of [`combine`]
    pub fn combine<B, C, F>(&self, other: &Handle<B>, f: F) -> Handle<C>
    where
        B: Clone + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: FnOnce(T, B) -> C + Send + 'static,
    {
        combine(self, other, f)
    }

    /// Method form of [`map`]
    pub fn map<U, F>(&self, f: F) -> Handle<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        map(self, f)
    }
}
