//! Type definitions for the scheduler
//!
//! This module contains the core types shared by every layer:
//! - Runtime values (Val)
//! - Error values and propagated errors (ErrorInfo, TaskError)
//! - Yielded instructions (Instruction, Task)

pub mod errors;
pub mod instruction;
pub mod values;

// Re-export all types for convenient access
pub use errors::{ErrorInfo, ErrorKind, TaskError};
pub use instruction::{Instruction, Task};
pub use values::{val_to_json, Val};
