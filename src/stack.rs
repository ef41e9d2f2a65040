//! Delegation stack
//!
//! All active frames of one run live in `frames: Vec<Routine>`; the top frame
//! is the one being driven. Delegating pushes, terminating pops, and the
//! popped frame's outcome becomes the resume input of the new top. No native
//! recursion is involved, so delegation depth costs heap, not call stack.

use tracing::trace;

use crate::coroutine::{BoxCoroutine, Routine};
use crate::types::errors;
use crate::types::TaskError;

#[derive(Debug)]
pub struct DelegationStack {
    frames: Vec<Routine>,
    max_depth: usize,
}

impl DelegationStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a freshly instantiated coroutine as the new top frame.
    ///
    /// Fails without pushing when the stack is already at its maximum depth.
    pub fn push(&mut self, coroutine: BoxCoroutine) -> Result<(), TaskError> {
        if self.frames.len() >= self.max_depth {
            return Err(TaskError::raised_with_code(
                errors::DELEGATION_DEPTH_EXCEEDED,
                format!("delegation depth limit of {} exceeded", self.max_depth),
            ));
        }
        self.frames.push(Routine::new(coroutine));
        trace!(depth = self.frames.len(), "frame pushed");
        Ok(())
    }

    /// Pop the top frame. Only called once that frame has terminated.
    pub fn pop(&mut self) -> Option<Routine> {
        let frame = self.frames.pop();
        if let Some(frame) = &frame {
            debug_assert!(frame.state().is_terminal(), "popped a live frame");
            trace!(depth = self.frames.len(), "frame popped");
        }
        frame
    }

    pub fn top_mut(&mut self) -> Option<&mut Routine> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::{returning, RoutineState, Suspension};
    use crate::types::{ErrorKind, Val};

    #[test]
    fn test_push_and_pop_follow_nesting() {
        let mut stack = DelegationStack::new(8);
        stack.push(Box::new(returning(1))).unwrap();
        stack.push(Box::new(returning(2))).unwrap();
        assert_eq!(stack.depth(), 2);

        // Only the top frame is driven
        match stack.top_mut().unwrap().start() {
            Suspension::Completed(v) => assert_eq!(v, Val::Num(2.0)),
            other => panic!("Expected Completed, got {:?}", other),
        }
        let popped = stack.pop().unwrap();
        assert_eq!(popped.state(), RoutineState::Completed);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top_mut().unwrap().state(), RoutineState::Ready);
    }

    #[test]
    fn test_push_beyond_max_depth_fails() {
        let mut stack = DelegationStack::new(1);
        stack.push(Box::new(returning(1))).unwrap();

        let err = stack.push(Box::new(returning(2))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Uncaught);
        assert_eq!(err.code(), errors::DELEGATION_DEPTH_EXCEEDED);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_empty_stack() {
        let mut stack = DelegationStack::new(4);
        assert!(stack.is_empty());
        assert!(stack.top_mut().is_none());
        assert!(stack.pop().is_none());
    }
}
