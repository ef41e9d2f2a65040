//! Scheduler - the run entry point
//!
//! A run owns one [`DelegationStack`] and drives it in a loop:
//! step the top frame → classify what it yielded → push a frame or wait on an
//! operation → feed the outcome back in → repeat, until the bottom frame
//! terminates and the completion callback fires.
//!
//! ## Synchronicity
//!
//! Waiting goes through a hand-off cell shared with the operation's
//! continuation. If the continuation fired before `invoke` returned, the cell
//! holds the result and the loop simply continues on the caller's stack. If
//! not, the driver parks itself inside the cell and `run` returns; the
//! continuation later takes the driver out and keeps driving from wherever it
//! was called. Consequently:
//!
//! - A run that never parks finishes inside `run`. An uncaught *raised* error
//!   is returned from `run` itself and the callback is not invoked.
//! - Once a run has parked, every outcome (including raised errors) reaches the
//!   completion callback and nothing is ever returned to a caller that has
//!   already moved on.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, debug_span, trace, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::coroutine::{Factory, Resume, Suspension};
use crate::operation::{AsyncOperation, Continuation};
use crate::resolver::{self, Resolution, Settle};
use crate::stack::DelegationStack;
use crate::types::errors;
use crate::types::{TaskError, Val};

/* ===================== Public API ===================== */

/// Runs coroutines; cheap to clone, shares its configuration.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: Arc<SchedulerConfig>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Instantiate `factory` with `args` and drive it to completion.
    ///
    /// `done` receives the outcome exactly once, except when the run never
    /// suspended asynchronously and a coroutine raised an uncaught error: that
    /// error is returned here instead and `done` is dropped uncalled.
    pub fn run<F>(&self, factory: Factory, args: Vec<Val>, done: F) -> Result<(), TaskError>
    where
        F: FnOnce(Result<Val, TaskError>) + Send + 'static,
    {
        self.start(factory, args, Box::new(done), Escape::Sync)
    }

    /// Drive `factory` to completion and await its outcome.
    ///
    /// A synchronous escape from [`Scheduler::run`] is returned as `Err` as
    /// well.
    pub async fn run_async(&self, factory: Factory, args: Vec<Val>) -> Result<Val, TaskError> {
        let (tx, rx) = oneshot::channel();
        self.run(factory, args, move |outcome| {
            // Receiver gone means the caller stopped waiting
            let _ = tx.send(outcome);
        })?;

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskError::raised_with_code(
                errors::ABANDONED,
                "run was dropped before it delivered an outcome",
            )),
        }
    }

    /// Run a nested coroutine (fan-out item or capture operand) on its own
    /// stack. Every outcome, raised errors included, goes to `k`.
    pub(crate) fn run_nested(&self, factory: Factory, k: Continuation) {
        if let Err(error) = self.start(factory, Vec::new(), k, Escape::Never) {
            // Escape::Never delivers everything through the continuation
            warn!(%error, "nested run escaped synchronously");
        }
    }

    fn start(
        &self,
        factory: Factory,
        args: Vec<Val>,
        completion: Continuation,
        escape: Escape,
    ) -> Result<(), TaskError> {
        let run_id = Uuid::new_v4();
        let span = debug_span!("run", %run_id);
        let _enter = span.enter();

        let mut driver = Driver {
            run_id,
            scheduler: self.clone(),
            stack: DelegationStack::new(self.config.max_delegation_depth),
            completion: Completion::new(completion),
            parks: 0,
        };

        if let Err(error) = driver.stack.push(factory.instantiate(args)) {
            driver.finish(Err(error));
            return Ok(());
        }

        match driver.drive(Resume::Start) {
            Driven::Parked => Ok(()),
            Driven::Finished(_, Err(error)) if escape == Escape::Sync && error.is_uncaught() => {
                debug!(%error, "uncaught error raised synchronously");
                Err(error)
            }
            Driven::Finished(driver, outcome) => {
                driver.finish(outcome);
                Ok(())
            }
        }
    }
}

/// Run `factory` on a scheduler with default configuration.
///
/// See [`Scheduler::run`].
pub fn run<F>(factory: Factory, args: Vec<Val>, done: F) -> Result<(), TaskError>
where
    F: FnOnce(Result<Val, TaskError>) + Send + 'static,
{
    Scheduler::default().run(factory, args, done)
}

/* ===================== Driver ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    /// Uncaught raised errors of a never-parked run are returned from `run`
    Sync,
    /// Everything goes through the completion callback
    Never,
}

/// Single-assignment completion callback
struct Completion {
    callback: Option<Continuation>,
}

impl Completion {
    fn new(callback: Continuation) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    fn deliver(&mut self, outcome: Result<Val, TaskError>) {
        match self.callback.take() {
            Some(callback) => callback(outcome),
            None => warn!("completion already delivered; dropping duplicate outcome"),
        }
    }
}

/// State of one run: its stack and its completion
struct Driver {
    run_id: Uuid,
    scheduler: Scheduler,
    stack: DelegationStack,
    completion: Completion,
    parks: usize,
}

enum Driven {
    Finished(Driver, Result<Val, TaskError>),
    Parked,
}

/// Meeting point between a waiting driver and an operation's continuation
enum Handoff {
    Waiting,
    Ready(Result<Val, TaskError>),
    Parked(Driver, Settle),
    Taken,
}

impl Driver {
    /// Drive the stack until the bottom frame terminates or an operation
    /// completes asynchronously.
    fn drive(mut self, mut input: Resume) -> Driven {
        loop {
            let Some(frame) = self.stack.top_mut() else {
                panic!("Internal error: driving an empty delegation stack");
            };

            match frame.advance(input) {
                Suspension::Completed(value) => {
                    self.stack.pop();
                    if self.stack.is_empty() {
                        return Driven::Finished(self, Ok(value));
                    }
                    input = Resume::Value(value);
                }

                Suspension::Failed(error) => {
                    self.stack.pop();
                    if self.stack.is_empty() {
                        return Driven::Finished(self, Err(error));
                    }
                    trace!(%error, depth = self.stack.depth(), "error thrown into parent frame");
                    input = Resume::Error(error);
                }

                Suspension::Yielded(instruction) => {
                    trace!(kind = instruction.kind(), depth = self.stack.depth(), "instruction yielded");
                    match resolver::classify(instruction, &self.scheduler) {
                        Resolution::Push(factory) => {
                            input = match self.stack.push(factory.instantiate(Vec::new())) {
                                Ok(()) => Resume::Start,
                                Err(error) => Resume::Error(error),
                            };
                        }
                        Resolution::Await { op, settle } => match self.wait(op, settle) {
                            Some((driver, next)) => {
                                self = driver;
                                input = next;
                            }
                            None => return Driven::Parked,
                        },
                    }
                }
            }
        }
    }

    /// Invoke `op`. Returns the driver and the next input if the operation
    /// completed synchronously; otherwise parks the driver with the
    /// continuation and returns `None`.
    fn wait(mut self, op: AsyncOperation, settle: Settle) -> Option<(Self, Resume)> {
        let cell = Arc::new(Mutex::new(Handoff::Waiting));
        let remote = Arc::clone(&cell);

        op.invoke(Box::new(move |result| {
            let mut guard = remote.lock().unwrap_or_else(PoisonError::into_inner);
            match std::mem::replace(&mut *guard, Handoff::Taken) {
                Handoff::Waiting => *guard = Handoff::Ready(result),
                Handoff::Parked(driver, settle) => {
                    drop(guard);
                    driver.resume_async(settle.apply(result));
                }
                Handoff::Ready(_) | Handoff::Taken => {
                    warn!("operation completed more than once; ignoring");
                }
            }
        }));

        let mut guard = cell.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *guard, Handoff::Taken) {
            Handoff::Ready(result) => Some((self, settle.apply(result))),
            Handoff::Waiting => {
                self.parks += 1;
                trace!(run_id = %self.run_id, parks = self.parks, "run parked");
                *guard = Handoff::Parked(self, settle);
                None
            }
            Handoff::Parked(..) | Handoff::Taken => {
                panic!("Internal error: hand-off cell consumed before the driver checked it");
            }
        }
    }

    /// Continue driving from an operation's continuation.
    fn resume_async(self, input: Resume) {
        let span = debug_span!("run", run_id = %self.run_id);
        let _enter = span.enter();

        match self.drive(input) {
            Driven::Finished(driver, outcome) => driver.finish(outcome),
            Driven::Parked => {}
        }
    }

    fn finish(mut self, outcome: Result<Val, TaskError>) {
        match &outcome {
            Ok(_) => debug!(parks = self.parks, "run completed"),
            Err(error) => debug!(parks = self.parks, %error, "run failed"),
        }
        self.completion.deliver(outcome);
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
