//! Type definitions for the interpreter
//!
//! - Frames, next steps and symbol variables
//! - Coroutine state, suspension and completion types

pub mod control;
pub mod frame;

// Re-export all types for convenient access
pub use control::{Completion, CoState, CoroutineId, Outcome, PendingWait, Step, WaitReason};
pub use frame::{Frame, NextStep, SymbolVar};
