//! Async operations
//!
//! An `AsyncOperation` is a single-shot unit of external work. It is invoked
//! with a `Continuation` and must call it exactly once with either a value or
//! an error. Both sides are `FnOnce`, so an operation cannot be replayed and a
//! continuation cannot be fired twice.
//!
//! Whether the continuation runs before `invoke` returns (synchronous) or
//! later from some other context (asynchronous) is up to the operation; the
//! scheduler observes which one happened and adjusts how it keeps driving.

use std::time::Duration;

use crate::types::{TaskError, Val};

/// Error-first completion handler handed to an operation
pub type Continuation = Box<dyn FnOnce(Result<Val, TaskError>) + Send + 'static>;

/// Opaque single-shot asynchronous operation
pub struct AsyncOperation {
    start: Box<dyn FnOnce(Continuation) + Send + 'static>,
}

impl AsyncOperation {
    pub fn new<F>(start: F) -> Self
    where
        F: FnOnce(Continuation) + Send + 'static,
    {
        Self {
            start: Box::new(start),
        }
    }

    /// Start the operation. `continuation` is called exactly once.
    pub fn invoke(self, continuation: Continuation) {
        (self.start)(continuation)
    }
}

/* ===================== Constructors ===================== */

/// Operation that completes synchronously with `value`.
pub fn from(value: impl Into<Val>) -> AsyncOperation {
    let value = value.into();
    AsyncOperation::new(move |k| k(Ok(value)))
}

/// Operation that fails synchronously with `error`.
pub fn error(error: TaskError) -> AsyncOperation {
    AsyncOperation::new(move |k| k(Err(error)))
}

/// Operation that completes with the number of milliseconds it waited.
///
/// Uses the ambient tokio runtime's timer when there is one; otherwise a
/// dedicated thread sleeps and completes the operation.
pub fn sleep(ms: u64) -> AsyncOperation {
    AsyncOperation::new(move |k| {
        let delay = Duration::from_millis(ms);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    k(Ok(Val::from(ms)));
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    k(Ok(Val::from(ms)));
                });
            }
        }
    })
}

/// Operation that waits `ms` milliseconds and then fails with `error`.
pub fn delayed_error(ms: u64, error: TaskError) -> AsyncOperation {
    AsyncOperation::new(move |k| {
        sleep(ms).invoke(Box::new(move |_| k(Err(error))));
    })
}
