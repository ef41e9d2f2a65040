//! Instructions a coroutine can yield to the scheduler

use crate::coroutine::Factory;
use crate::operation::AsyncOperation;
use std::fmt;

/// A unit of work that can be awaited: an async operation or a coroutine
/// that will be run to completion on its own delegation stack.
pub enum Task {
    Operation(AsyncOperation),
    Coroutine(Factory),
}

impl From<AsyncOperation> for Task {
    fn from(op: AsyncOperation) -> Self {
        Task::Operation(op)
    }
}

impl From<Factory> for Task {
    fn from(factory: Factory) -> Self {
        Task::Coroutine(factory)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Operation(_) => f.write_str("Operation"),
            Task::Coroutine(_) => f.write_str("Coroutine"),
        }
    }
}

/// Yielded instruction
///
/// The shape is decided when the coroutine builds it, never inspected
/// afterwards.
pub enum Instruction {
    /// Wait for one operation; failure is thrown into the coroutine
    Single(AsyncOperation),
    /// Run every item concurrently; resume with results in input order
    FanOut(Vec<Task>),
    /// Wait for one task; resume with `[error, value]`, never throw
    CaptureBoth(Task),
    /// Run a nested coroutine inline on the current delegation stack
    Delegate(Factory),
}

impl Instruction {
    pub fn single(op: AsyncOperation) -> Self {
        Instruction::Single(op)
    }

    pub fn fan_out<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Task>,
    {
        Instruction::FanOut(items.into_iter().map(Into::into).collect())
    }

    pub fn both(task: impl Into<Task>) -> Self {
        Instruction::CaptureBoth(task.into())
    }

    pub fn delegate(factory: Factory) -> Self {
        Instruction::Delegate(factory)
    }

    /// Short name used in trace output
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Single(_) => "single",
            Instruction::FanOut(_) => "fan_out",
            Instruction::CaptureBoth(_) => "capture_both",
            Instruction::Delegate(_) => "delegate",
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Single(_) => f.write_str("Single(Operation)"),
            Instruction::FanOut(items) => f.debug_tuple("FanOut").field(items).finish(),
            Instruction::CaptureBoth(task) => f.debug_tuple("CaptureBoth").field(task).finish(),
            Instruction::Delegate(_) => f.write_str("Delegate(Coroutine)"),
        }
    }
}
