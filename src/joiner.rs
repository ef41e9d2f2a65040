//! Parallel joiner
//!
//! Fans out over an ordered list of tasks and folds them into one
//! `AsyncOperation` that completes with the results in input order.
//!
//! Every item is started before anything is awaited, so the join takes about
//! as long as its slowest item. Items report into a shared, mutex-guarded
//! [`JoinState`]; whichever report settles the join takes the continuation out
//! of the state, so the join completes exactly once no matter how many items
//! report afterwards or on which threads.
//!
//! Failure policy is fail-fast: the first failing item settles the join with
//! an error. Siblings that are already running keep running (operations have
//! no cancellation hook) and their results are dropped.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::operation::{AsyncOperation, Continuation};
use crate::resolver::task_operation;
use crate::scheduler::Scheduler;
use crate::types::{Task, TaskError, Val};

/// Shared bookkeeping for one fan-out
struct JoinState {
    slots: Vec<Option<Val>>,
    remaining: usize,
    /// Taken by whichever report settles the join
    continuation: Option<Continuation>,
}

/// What an item report decided, acted on after the lock is released
enum Settlement {
    Pending,
    Discarded,
    Done(Continuation, Result<Val, TaskError>),
}

impl JoinState {
    fn report(&mut self, index: usize, result: Result<Val, TaskError>) -> Settlement {
        if self.continuation.is_none() {
            return Settlement::Discarded;
        }

        match result {
            Err(e) => match self.continuation.take() {
                Some(k) => Settlement::Done(k, Err(TaskError::join(index, e))),
                None => Settlement::Discarded,
            },
            Ok(v) => {
                debug_assert!(self.slots[index].is_none(), "join item reported twice");
                self.slots[index] = Some(v);
                self.remaining -= 1;
                if self.remaining > 0 {
                    return Settlement::Pending;
                }
                match self.continuation.take() {
                    Some(k) => {
                        let values = std::mem::take(&mut self.slots)
                            .into_iter()
                            .map(|slot| slot.unwrap_or(Val::Null))
                            .collect();
                        Settlement::Done(k, Ok(Val::List(values)))
                    }
                    None => Settlement::Discarded,
                }
            }
        }
    }
}

/// Fold `items` into a single operation resolving to their ordered results.
pub fn join(items: Vec<Task>, scheduler: &Scheduler) -> AsyncOperation {
    let scheduler = scheduler.clone();
    AsyncOperation::new(move |k| start_join(items, &scheduler, k))
}

fn start_join(items: Vec<Task>, scheduler: &Scheduler, k: Continuation) {
    let width = items.len();
    if width == 0 {
        k(Ok(Val::List(Vec::new())));
        return;
    }

    debug!(width, "fan-out started");
    let state = Arc::new(Mutex::new(JoinState {
        slots: vec![None; width],
        remaining: width,
        continuation: Some(k),
    }));

    for (index, task) in items.into_iter().enumerate() {
        let state = Arc::clone(&state);
        let op = task_operation(task, scheduler);
        op.invoke(Box::new(move |result| {
            let settlement = state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .report(index, result);

            // The continuation may drive the parent coroutine further, so
            // it must run without the join lock held.
            match settlement {
                Settlement::Done(k, outcome) => {
                    debug!(index, ok = outcome.is_ok(), "fan-out settled");
                    k(outcome);
                }
                Settlement::Discarded => {
                    debug!(index, "fan-out item reported after settlement; discarded");
                }
                Settlement::Pending => {}
            }
        }));
    }
}

#[cfg(test)]
#[path = "joiner_tests.rs"]
mod tests;
