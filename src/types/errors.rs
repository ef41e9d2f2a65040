//! Error values and propagated errors
//!
//! `ErrorInfo` is the error as *data*: it lives inside `Val::Error` and is
//! what a capture-both wait hands back. `TaskError` is the error as it
//! travels through the scheduler, tagged with the kind of failure it came
//! from so the run entry point can apply the synchronicity rule.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/* ===================== Error Codes ===================== */

pub const OPERATION_FAILED: &str = "OperationFailed";
pub const UNCAUGHT: &str = "Uncaught";
pub const NOT_FOUND: &str = "NotFound";
pub const JOIN_FAILED: &str = "JoinFailed";
pub const DELEGATION_DEPTH_EXCEEDED: &str = "DelegationDepthExceeded";
pub const ABANDONED: &str = "Abandoned";

/* ===================== ErrorInfo ===================== */

/// Error value with code and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/* ===================== TaskError ===================== */

/// Where a propagated error originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An async operation reported failure
    Operation,
    /// A coroutine returned an error-shaped value instead of raising
    ReturnedValue,
    /// A coroutine body raised without catching
    Uncaught,
    /// First failure among the items of a fan-out
    Join,
}

/// Error propagated through frames and delivered to the completion callback
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{info}")]
pub struct TaskError {
    pub kind: ErrorKind,
    pub info: ErrorInfo,
}

impl TaskError {
    pub fn new(kind: ErrorKind, info: ErrorInfo) -> Self {
        Self { kind, info }
    }

    /// Failure reported by an async operation.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, ErrorInfo::new(OPERATION_FAILED, message))
    }

    /// Exception raised by a coroutine body.
    pub fn raised(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Uncaught, ErrorInfo::new(UNCAUGHT, message))
    }

    /// Exception raised by a coroutine body, with an explicit code.
    pub fn raised_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Uncaught, ErrorInfo::new(code, message))
    }

    /// Error value returned (not raised) by a coroutine.
    pub fn returned(info: ErrorInfo) -> Self {
        Self::new(ErrorKind::ReturnedValue, info)
    }

    /// Fan-out failure, naming the failing item and keeping its message.
    pub fn join(index: usize, cause: TaskError) -> Self {
        let info = ErrorInfo::new(
            JOIN_FAILED,
            format!("item {}: {}", index, cause.info.message),
        );
        Self::new(ErrorKind::Join, info)
    }

    pub fn code(&self) -> &str {
        &self.info.code
    }

    pub fn message(&self) -> &str {
        &self.info.message
    }

    pub fn is_uncaught(&self) -> bool {
        self.kind == ErrorKind::Uncaught
    }
}

impl From<ErrorInfo> for TaskError {
    fn from(info: ErrorInfo) -> Self {
        Self::new(ErrorKind::Operation, info)
    }
}
