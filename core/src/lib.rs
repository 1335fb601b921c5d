pub mod cli;
pub mod config;
pub mod interpreter;
pub mod variant;
pub mod vdom;

// Re-export main types
pub use interpreter::{Exception, Outcome, Runtime, Scheduler};
pub use variant::Val;
pub use vdom::{Document, NodeSpec};
