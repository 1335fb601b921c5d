//! Core execution loop
//!
//! This module contains the step() function - the heart of the interpreter.
//! It runs one element operation of the innermost frame, as selected by the
//! frame's `next_step`, and finishes the coroutine once its stack empties.
//!
//! ## Function Organization
//! 1. run_until_blocked() - Runs one coroutine for a bounded slice of steps
//! 2. step() - Dispatches a single element operation
//! 3. terminate() - Force-pops every frame of a coroutine

use std::collections::HashMap;
use tracing::{info, trace, warn};
use uuid::Uuid;

use super::bindings::{Bindings, Scope};
use super::coroutine::Coroutine;
use super::elements::ElementOps;
use super::errors::InterpError;
use super::evaluator::{AttrEvaluator, DefaultEvaluator};
use super::stack::ExecStack;
use super::types::{CoState, NextStep, Outcome};

/* ===================== Environment ===================== */

/// State shared by every coroutine of a scheduler
pub struct Env {
    pub evaluator: Box<dyn AttrEvaluator>,
    /// Document-global bindings, keyed by document id
    pub globals: HashMap<Uuid, Bindings>,
    /// Renderer DOM handle addressed by `<request>`
    pub renderer_target: u64,
}

impl Env {
    pub fn new(evaluator: Box<dyn AttrEvaluator>) -> Self {
        Env {
            evaluator,
            globals: HashMap::new(),
            renderer_target: 0,
        }
    }

    /// Name resolution view for the innermost frame of `stack`
    pub fn scope<'a>(&'a self, stack: &'a ExecStack) -> Scope<'a> {
        Scope::new(stack, self.globals.get(&stack.document().id()))
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new(Box::new(DefaultEvaluator))
    }
}

/* ===================== Public API ===================== */

/// Run a coroutine until it suspends, terminates or uses up `max_steps`
///
/// Returns the number of steps executed.
pub fn run_until_blocked(
    co: &mut Coroutine,
    env: &Env,
    max_steps: usize,
) -> Result<usize, InterpError> {
    co.state = CoState::Running;

    let mut steps = 0;
    while co.state == CoState::Running && steps < max_steps {
        step(co, env)?;
        steps += 1;
    }

    if co.state == CoState::Running {
        co.state = CoState::Ready;
    }
    Ok(steps)
}

/// Execute one operation of the innermost frame
///
/// An element that suspends moves the coroutine to `Waiting`; an empty stack
/// moves it to `Terminated`.
pub fn step(co: &mut Coroutine, env: &Env) -> Result<(), InterpError> {
    let Some(frame) = co.stack.bottom_frame() else {
        complete(co);
        return Ok(());
    };

    let ops = frame.ops;
    let next_step = frame.next_step;
    trace!(
        coroutine = %co.id,
        tag = ops.name(),
        step = ?next_step,
        depth = co.stack.frame_count(),
        "step"
    );

    match next_step {
        NextStep::AfterPushed => ops.after_pushed(co, env)?,
        NextStep::SelectChild => ops.select_child(co, env)?,
        NextStep::Rerun | NextStep::Customized(_) => ops.rerun(co, env)?,
        NextStep::OnPopping => {
            if ops.on_popping(co, env)? {
                co.stack.pop_frame();
            }
        }
    }

    if co.stack.is_empty() {
        complete(co);
    }
    Ok(())
}

/// Force-pop every frame, running each `on_popping` without catch interception
pub fn terminate(co: &mut Coroutine, env: &Env, outcome: Outcome) {
    while let Some(frame) = co.stack.bottom_frame() {
        let ops = frame.ops;
        if let Err(err) = ops.on_popping(co, env) {
            warn!(coroutine = %co.id, tag = ops.name(), error = %err, "on_popping failed during teardown");
        }
        co.stack.pop_frame();
    }

    info!(coroutine = %co.id, outcome = ?outcome, "coroutine terminated");
    co.finish(outcome);
}

/* ===================== Completion ===================== */

fn complete(co: &mut Coroutine) {
    let outcome = match co.stack.take_exception() {
        Some(exception) => {
            info!(coroutine = %co.id, category = %exception.atom, "coroutine ended with unhandled exception");
            Outcome::Throw(exception)
        }
        None => {
            info!(coroutine = %co.id, "coroutine finished");
            Outcome::Return(co.stack.ret_var().clone())
        }
    };
    co.finish(outcome);
}
