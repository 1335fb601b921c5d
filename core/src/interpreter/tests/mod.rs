//! Tests for the interpreter
//!
//! Organized by subsystem

mod bindings_tests;
mod helpers;
mod runtime_tests;
mod stack_tests;
