//! Instruction classifier and resolver
//!
//! Turns a yielded [`Instruction`] into either a frame to push or a single
//! async operation to wait on, together with the rule for turning that
//! operation's outcome into the next resume input. Fan-outs and coroutine
//! operands are folded into plain operations here, so the driver only ever
//! waits on one `AsyncOperation` at a time.

use crate::coroutine::{Factory, Resume};
use crate::joiner;
use crate::operation::AsyncOperation;
use crate::scheduler::Scheduler;
use crate::types::{Instruction, Task, TaskError, Val};

/// What the driver must do with a yielded instruction
pub enum Resolution {
    /// Instantiate the factory and drive it as the new top frame
    Push(Factory),
    /// Invoke the operation and resume the current frame with its outcome
    Await { op: AsyncOperation, settle: Settle },
}

/// How an operation's outcome is fed back into the coroutine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Success resumes with the value, failure is thrown in
    Throw,
    /// Always resumes with an `[error, value]` pair
    Capture,
}

impl Settle {
    pub fn apply(self, result: Result<Val, TaskError>) -> Resume {
        match (self, result) {
            (Settle::Throw, Ok(v)) => Resume::Value(v),
            (Settle::Throw, Err(e)) => Resume::Error(e),
            (Settle::Capture, Ok(v)) => Resume::Value(Val::pair(None, Some(v))),
            (Settle::Capture, Err(e)) => Resume::Value(Val::pair(Some(e.info), None)),
        }
    }
}

/// Classify a yielded instruction.
pub fn classify(instruction: Instruction, scheduler: &Scheduler) -> Resolution {
    match instruction {
        Instruction::Single(op) => Resolution::Await {
            op,
            settle: Settle::Throw,
        },
        Instruction::CaptureBoth(task) => Resolution::Await {
            op: task_operation(task, scheduler),
            settle: Settle::Capture,
        },
        Instruction::FanOut(items) => Resolution::Await {
            op: joiner::join(items, scheduler),
            settle: Settle::Throw,
        },
        Instruction::Delegate(factory) => Resolution::Push(factory),
    }
}

/// View any task as a single operation.
///
/// A coroutine task runs as an independent nested run on its own delegation
/// stack; its completion becomes the operation's completion.
pub fn task_operation(task: Task, scheduler: &Scheduler) -> AsyncOperation {
    match task {
        Task::Operation(op) => op,
        Task::Coroutine(factory) => {
            let scheduler = scheduler.clone();
            AsyncOperation::new(move |k| scheduler.run_nested(factory, k))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorInfo;

    #[test]
    fn test_capture_settles_failure_as_pair() {
        let resume = Settle::Capture.apply(Err(TaskError::operation("oops")));
        match resume {
            Resume::Value(Val::List(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], Val::Error(ErrorInfo::new("OperationFailed", "oops")));
                assert_eq!(items[1], Val::Null);
            }
            other => panic!("Expected pair, got {:?}", other),
        }
    }

    #[test]
    fn test_capture_settles_success_as_pair() {
        let resume = Settle::Capture.apply(Ok(Val::from("correct")));
        match resume {
            Resume::Value(v) => assert_eq!(v, Val::List(vec![Val::Null, "correct".into()])),
            other => panic!("Expected pair, got {:?}", other),
        }
    }

    #[test]
    fn test_throw_settles_failure_as_error() {
        let resume = Settle::Throw.apply(Err(TaskError::operation("oops")));
        assert!(matches!(resume, Resume::Error(e) if e.message() == "oops"));
    }

    #[test]
    fn test_delegate_classifies_as_push() {
        let scheduler = Scheduler::default();
        let factory = Factory::from_operation_fn(|_| crate::operation::from(1));
        assert!(matches!(
            classify(Instruction::delegate(factory), &scheduler),
            Resolution::Push(_)
        ));
    }
}
