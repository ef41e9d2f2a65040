//! Cadence - coroutine-driven asynchronous task scheduler
//!
//! Coroutines are explicit state machines that yield [`Instruction`]s. The
//! [`Scheduler`] drives them: single operations are awaited, fan-outs run
//! concurrently and join in order, capture-both turns failures into data, and
//! delegation runs a child coroutine on the same stack.

pub mod bench;
pub mod cli;
pub mod config;
pub mod coroutine;
pub mod demos;
pub mod joiner;
pub mod operation;
pub mod resolver;
pub mod scheduler;
pub mod stack;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export main types
pub use types::*;

pub use config::{Config, SchedulerConfig};
pub use coroutine::{from_fn, Coroutine, Factory, Resume, Step};
pub use operation::{AsyncOperation, Continuation};
pub use scheduler::{run, Scheduler};
