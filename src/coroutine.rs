//! Coroutine abstraction
//!
//! A coroutine is anything implementing [`Coroutine`]: a state machine that is
//! stepped with a [`Resume`] input and answers with a [`Step`]. The scheduler
//! never looks past this contract, so a coroutine may be a hand-written enum
//! state machine, a closure over some captured phase counter ([`from_fn`]), or
//! an adapter over a single async operation ([`Factory::from_operation_fn`]).
//!
//! [`Routine`] is the scheduler's owned view of one instantiated coroutine. It
//! tracks the lifecycle state and turns raw steps into [`Suspension`]s.

use std::fmt;

use crate::operation::AsyncOperation;
use crate::types::{Instruction, TaskError, Val};

/* ===================== Step Protocol ===================== */

/// Input delivered to a coroutine when it is stepped
#[derive(Debug)]
pub enum Resume {
    /// First step, no value yet
    Start,
    /// Result of the instruction the coroutine yielded last
    Value(Val),
    /// Failure thrown in at the coroutine's yield point
    Error(TaskError),
}

impl Resume {
    /// Value delivered on resume, with thrown errors as `Err`.
    ///
    /// `Start` reads as `Null`.
    pub fn into_result(self) -> Result<Val, TaskError> {
        match self {
            Resume::Start => Ok(Val::Null),
            Resume::Value(v) => Ok(v),
            Resume::Error(e) => Err(e),
        }
    }
}

/// What a coroutine does after being stepped
#[derive(Debug)]
pub enum Step {
    /// Suspend on an instruction
    Yield(Instruction),
    /// Finish with a value
    Return(Val),
    /// Finish by raising (or letting a thrown-in error escape)
    Throw(TaskError),
}

impl From<Result<Val, TaskError>> for Step {
    fn from(result: Result<Val, TaskError>) -> Self {
        match result {
            Ok(v) => Step::Return(v),
            Err(e) => Step::Throw(e),
        }
    }
}

/// Suspendable computation driven by the scheduler
pub trait Coroutine: Send {
    fn step(&mut self, input: Resume) -> Step;
}

pub type BoxCoroutine = Box<dyn Coroutine>;

impl<C: Coroutine + ?Sized> Coroutine for Box<C> {
    fn step(&mut self, input: Resume) -> Step {
        (**self).step(input)
    }
}

/* ===================== Closure Coroutines ===================== */

/// Coroutine backed by a closure; state lives in the closure's captures.
pub struct FnCoroutine<F> {
    f: F,
}

impl<F> Coroutine for FnCoroutine<F>
where
    F: FnMut(Resume) -> Step + Send,
{
    fn step(&mut self, input: Resume) -> Step {
        (self.f)(input)
    }
}

/// Build a coroutine from a step closure.
pub fn from_fn<F>(f: F) -> FnCoroutine<F>
where
    F: FnMut(Resume) -> Step + Send,
{
    FnCoroutine { f }
}

/// Coroutine that returns `value` on its first step.
pub fn returning(value: impl Into<Val>) -> impl Coroutine {
    let mut value = Some(value.into());
    from_fn(move |_| Step::Return(value.take().unwrap_or(Val::Null)))
}

/// Coroutine that raises `error` on its first step.
pub fn failing(error: TaskError) -> impl Coroutine {
    let mut error = Some(error);
    from_fn(move |_| match error.take() {
        Some(e) => Step::Throw(e),
        None => Step::Return(Val::Null),
    })
}

/// Pre-completed single-instruction coroutine: yields `op`, then returns
/// whatever it resolves to (or lets its failure escape).
struct OperationCoroutine {
    op: Option<AsyncOperation>,
}

impl Coroutine for OperationCoroutine {
    fn step(&mut self, input: Resume) -> Step {
        match self.op.take() {
            Some(op) => Step::Yield(Instruction::Single(op)),
            None => input.into_result().into(),
        }
    }
}

/* ===================== Factories ===================== */

/// Creates a coroutine from forwarded arguments
///
/// Factories are consumed when instantiated. Nested factories (delegation,
/// fan-out items, capture-both operands) are instantiated with no arguments;
/// they capture whatever they need when built.
pub struct Factory {
    make: Box<dyn FnOnce(Vec<Val>) -> BoxCoroutine + Send + 'static>,
}

impl Factory {
    pub fn new<F, C>(make: F) -> Self
    where
        F: FnOnce(Vec<Val>) -> C + Send + 'static,
        C: Coroutine + 'static,
    {
        Self {
            make: Box::new(move |args| Box::new(make(args)) as BoxCoroutine),
        }
    }

    /// Wrap an already instantiated coroutine. Arguments are ignored.
    pub fn from_coroutine<C>(coroutine: C) -> Self
    where
        C: Coroutine + 'static,
    {
        Self::new(move |_| coroutine)
    }

    /// Convenience form: a plain function returning an operation behaves as a
    /// coroutine that yields that operation once and returns its result.
    pub fn from_operation_fn<F>(make: F) -> Self
    where
        F: FnOnce(Vec<Val>) -> AsyncOperation + Send + 'static,
    {
        Self::new(move |args| OperationCoroutine {
            op: Some(make(args)),
        })
    }

    pub fn instantiate(self, args: Vec<Val>) -> BoxCoroutine {
        (self.make)(args)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory")
    }
}

/* ===================== Routine ===================== */

/// Lifecycle state of an instantiated coroutine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineState {
    Ready,
    Suspended,
    Completed,
    Failed,
}

impl RoutineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RoutineState::Completed | RoutineState::Failed)
    }
}

/// Outcome of stepping a routine once
#[derive(Debug)]
pub enum Suspension {
    Yielded(Instruction),
    Completed(Val),
    Failed(TaskError),
}

/// An instantiated coroutine plus its lifecycle state
///
/// Owned by exactly one delegation stack frame.
pub struct Routine {
    body: BoxCoroutine,
    state: RoutineState,
}

impl Routine {
    pub fn new(body: BoxCoroutine) -> Self {
        Self {
            body,
            state: RoutineState::Ready,
        }
    }

    pub fn state(&self) -> RoutineState {
        self.state
    }

    pub fn start(&mut self) -> Suspension {
        self.advance(Resume::Start)
    }

    pub fn resume(&mut self, value: Val) -> Suspension {
        self.advance(Resume::Value(value))
    }

    pub fn resume_with_error(&mut self, error: TaskError) -> Suspension {
        self.advance(Resume::Error(error))
    }

    /// Step the coroutine once.
    ///
    /// # Panics
    ///
    /// Stepping a routine that already completed or failed is a bug in the
    /// driver, not a recoverable error.
    pub fn advance(&mut self, input: Resume) -> Suspension {
        assert!(
            !self.state.is_terminal(),
            "coroutine stepped after reaching terminal state {:?}",
            self.state
        );
        debug_assert!(
            matches!(input, Resume::Start) == (self.state == RoutineState::Ready),
            "coroutine must be started exactly once, before any resume"
        );

        match self.body.step(input) {
            Step::Yield(instruction) => {
                self.state = RoutineState::Suspended;
                Suspension::Yielded(instruction)
            }
            // An error-shaped return value is a failure, not a success
            Step::Return(Val::Error(info)) => {
                self.state = RoutineState::Failed;
                Suspension::Failed(TaskError::returned(info))
            }
            Step::Return(value) => {
                self.state = RoutineState::Completed;
                Suspension::Completed(value)
            }
            Step::Throw(error) => {
                self.state = RoutineState::Failed;
                Suspension::Failed(error)
            }
        }
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine").field("state", &self.state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation;
    use crate::types::{ErrorInfo, ErrorKind};

    #[test]
    fn test_routine_lifecycle_to_completion() {
        let mut routine = Routine::new(Box::new(returning(5)));
        assert_eq!(routine.state(), RoutineState::Ready);

        match routine.start() {
            Suspension::Completed(v) => assert_eq!(v, Val::Num(5.0)),
            other => panic!("Expected Completed, got {:?}", other),
        }
        assert_eq!(routine.state(), RoutineState::Completed);
    }

    #[test]
    fn test_error_shaped_return_fails_routine() {
        let mut routine = Routine::new(Box::new(returning(Val::Error(ErrorInfo::new(
            "E",
            "normal error",
        )))));

        match routine.start() {
            Suspension::Failed(e) => {
                assert_eq!(e.kind, ErrorKind::ReturnedValue);
                assert_eq!(e.message(), "normal error");
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert_eq!(routine.state(), RoutineState::Failed);
    }

    #[test]
    fn test_yield_then_resume() {
        let mut routine = Routine::new(
            Factory::from_operation_fn(|_| operation::from("str")).instantiate(vec![]),
        );

        assert!(matches!(
            routine.start(),
            Suspension::Yielded(Instruction::Single(_))
        ));
        assert_eq!(routine.state(), RoutineState::Suspended);

        match routine.resume(Val::from("str")) {
            Suspension::Completed(v) => assert_eq!(v, Val::from("str")),
            other => panic!("Expected Completed, got {:?}", other),
        }
    }

    #[test]
    fn test_thrown_in_error_escapes_uncaught() {
        let mut routine = Routine::new(
            Factory::from_operation_fn(|_| operation::from(1)).instantiate(vec![]),
        );
        routine.start();

        match routine.resume_with_error(TaskError::operation("boom")) {
            Suspension::Failed(e) => {
                assert_eq!(e.kind, ErrorKind::Operation);
                assert_eq!(e.message(), "boom");
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_factory_forwards_arguments() {
        let factory = Factory::new(|args: Vec<Val>| returning(Val::List(args)));
        let mut routine = Routine::new(factory.instantiate(vec!["a".into(), Val::Num(1.0)]));

        match routine.start() {
            Suspension::Completed(v) => {
                assert_eq!(v, Val::List(vec!["a".into(), Val::Num(1.0)]))
            }
            other => panic!("Expected Completed, got {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "terminal state")]
    fn test_stepping_terminal_routine_panics() {
        let mut routine = Routine::new(Box::new(returning(1)));
        routine.start();
        routine.resume(Val::Null);
    }
}
