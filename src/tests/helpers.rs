//! Test helpers for scheduler scenarios
//!
//! Common utilities for running coroutines and observing their completion

use crate::coroutine::{from_fn, Factory, Resume, Step};
use crate::operation::{self, AsyncOperation};
use crate::scheduler::Scheduler;
use crate::types::{Instruction, TaskError, Val};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

/// Observes a completion callback: every outcome it receives and how often
/// it was called.
pub struct Observed {
    pub calls: Arc<AtomicUsize>,
    pub rx: Receiver<Result<Val, TaskError>>,
}

impl Observed {
    /// Outcome delivered before `run` returned, if any
    pub fn immediate(&self) -> Option<Result<Val, TaskError>> {
        self.rx.try_recv().ok()
    }

    /// Wait for the outcome of an asynchronous run
    pub fn wait(&self) -> Result<Val, TaskError> {
        self.rx
            .recv_timeout(Duration::from_secs(5))
            .expect("Run did not complete within 5s")
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Build a completion callback and the handle that observes it
pub fn observe() -> (
    impl FnOnce(Result<Val, TaskError>) + Send + 'static,
    Observed,
) {
    let (tx, rx) = mpsc::channel();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let done = move |outcome: Result<Val, TaskError>| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(outcome);
    };
    (done, Observed { calls, rx })
}

/// Run on a default scheduler and require a synchronous outcome through the
/// callback
pub fn run_sync(factory: Factory, args: Vec<Val>) -> Result<Val, TaskError> {
    let (done, observed) = observe();
    Scheduler::default()
        .run(factory, args, done)
        .expect("Run escaped synchronously");
    observed
        .immediate()
        .expect("Run did not complete synchronously")
}

/// Run on a default scheduler and wait for the callback
pub fn run_and_wait(factory: Factory, args: Vec<Val>) -> Result<Val, TaskError> {
    let (done, observed) = observe();
    Scheduler::default()
        .run(factory, args, done)
        .expect("Run escaped synchronously");
    let outcome = observed.wait();
    assert_eq!(observed.call_count(), 1);
    outcome
}

/// Coroutine that yields each operation in turn and returns the list of
/// values it was resumed with. Failures escape.
pub fn sequence(ops: Vec<AsyncOperation>) -> Factory {
    Factory::new(move |_| {
        let mut pending = ops.into_iter();
        let mut seen = Vec::new();
        let mut started = false;
        from_fn(move |input: Resume| {
            if started {
                match input.into_result() {
                    Ok(v) => seen.push(v),
                    Err(e) => return Step::Throw(e),
                }
            }
            started = true;
            match pending.next() {
                Some(op) => Step::Yield(Instruction::single(op)),
                None => Step::Return(Val::List(std::mem::take(&mut seen))),
            }
        })
    })
}

/// Operation that fails after `ms` milliseconds
pub fn failing_after(ms: u64, message: &str) -> AsyncOperation {
    operation::delayed_error(ms, TaskError::operation(message))
}

pub fn num(n: f64) -> Val {
    Val::Num(n)
}
