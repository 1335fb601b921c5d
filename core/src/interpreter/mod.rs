//! vDOM interpreter
//!
//! Walks a parsed element tree as a program. Each element under evaluation
//! owns one frame on its coroutine's stack; element operations advance the
//! frame step by step so a coroutine can suspend on a timer or a renderer
//! round trip and resume later without holding the host call stack.
//!
//! ## Layout
//! - `types`: frames, next steps, coroutine states and wait types
//! - `stack` / `coroutine`: per-coroutine execution state
//! - `elements`: operations of each element kind
//! - `exec_loop`: single-step dispatch
//! - `scheduler` / `runtime`: cooperative scheduling and the tokio driver

pub mod atoms;
pub mod bindings;
pub mod coroutine;
pub mod elements;
pub mod errors;
pub mod evaluator;
pub mod exec_loop;
pub mod rdr;
pub mod runtime;
pub mod scheduler;
pub mod stack;
pub mod types;

#[cfg(test)]
mod tests;

pub use atoms::{Atom, Except};
pub use bindings::{Bindings, Scope};
pub use coroutine::Coroutine;
pub use elements::{ElementKind, ElementOps, FrameContext};
pub use errors::{Exception, ExceptionInfo, InterpError};
pub use evaluator::{AttrEvaluator, DefaultEvaluator};
pub use exec_loop::{run_until_blocked, step, terminate, Env};
pub use rdr::{HeadlessRenderer, RdrRequest, RdrResponse, RendererBridge};
pub use runtime::Runtime;
pub use scheduler::{Finished, Scheduler};
pub use stack::{ExecStack, StackStats};
pub use types::{
    CoState, Completion, CoroutineId, Frame, NextStep, Outcome, PendingWait, Step, SymbolVar,
    WaitReason,
};
