//! `<catch for="A B">`: intercepts an in-flight exception
//!
//! The exception is moved out of the stack before the filter is evaluated.
//! On a match it stays in this frame's context and the children run; on a
//! miss it is put back unchanged and the frame pops.

use tracing::debug;

use super::{element_of, eval_attr, frame_element, set_next_step, ChildCursor, FrameContext};
use crate::interpreter::atoms::{Atom, Except};
use crate::interpreter::coroutine::Coroutine;
use crate::interpreter::errors::{Exception, InterpError};
use crate::interpreter::exec_loop::Env;
use crate::interpreter::stack::ExecStack;
use crate::interpreter::types::{NextStep, SymbolVar};
use crate::variant::Val;
use crate::vdom::{AttrOp, Element};

#[derive(Debug)]
pub struct CatchContext {
    pub cursor: ChildCursor,
    /// Exception intercepted by this frame; dropped with the context
    pub caught: Option<Exception>,
}

pub(super) fn after_pushed(co: &mut Coroutine, env: &Env) -> Result<(), InterpError> {
    let (doc, pos) = frame_element(&co.stack)?;
    let element = element_of(&doc, pos, "catch")?;
    let cursor = ChildCursor::new(&doc, pos);

    let Some(exception) = co.stack.take_exception() else {
        co.stack.install_context(FrameContext::Catch(CatchContext {
            cursor,
            caught: None,
        }))?;
        return set_next_step(&mut co.stack, NextStep::OnPopping);
    };

    let filter = match eval_filter(&co.stack, env, element) {
        Ok(filter) => filter,
        Err(err) => {
            // The setup failure replaces the intercepted exception.
            let message = format!(
                "{} (while handling {})",
                err.message().unwrap_or_default(),
                exception.atom
            );
            let err = Exception::with_message(err.atom, message).at_element(element);
            co.stack.install_context(FrameContext::Catch(CatchContext {
                cursor,
                caught: None,
            }))?;
            co.stack.raise(err);
            return set_next_step(&mut co.stack, NextStep::OnPopping);
        }
    };

    if !matches_filter(filter.as_deref(), exception.atom) {
        debug!(category = %exception.atom, filter = ?filter, "catch did not match");
        co.stack.install_context(FrameContext::Catch(CatchContext {
            cursor,
            caught: None,
        }))?;
        co.stack.raise(exception);
        return set_next_step(&mut co.stack, NextStep::OnPopping);
    }

    debug!(category = %exception.atom, "exception caught");
    if let Some(frame) = co.stack.bottom_frame_mut() {
        frame.set_symbol(SymbolVar::QuestionMark, exception.to_val());
    }
    co.stack.install_context(FrameContext::Catch(CatchContext {
        cursor,
        caught: Some(exception),
    }))?;
    set_next_step(&mut co.stack, NextStep::SelectChild)
}

/// An absent filter or a filter of exactly `*` matches any category; an empty one matches none
pub fn matches_filter(filter: Option<&str>, atom: Atom) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if filter.trim() == "*" {
        return true;
    }
    filter
        .split_whitespace()
        .any(|token| Atom::lookup(token) == Some(atom))
}

/// Evaluate the `for` attribute; `None` when the element has none
fn eval_filter(
    stack: &ExecStack,
    env: &Env,
    element: &Element,
) -> Result<Option<String>, Exception> {
    let mut filter: Option<Val> = None;

    for attr in &element.attrs {
        if attr.name != "for" {
            return Err(Exception::builtin(
                Except::NotImplemented,
                format!("unknown attribute `{}` on <catch>", attr.name),
            ));
        }
        if filter.is_some() {
            return Err(Exception::builtin(
                Except::DuplicateName,
                "duplicate attribute `for`",
            ));
        }
        if attr.op != AttrOp::Assign {
            return Err(Exception::builtin(
                Except::InvalidValue,
                format!("unsupported operator `{}` for `for`", attr.op.as_str()),
            ));
        }
        if attr.value.is_none() {
            return Err(Exception::builtin(
                Except::InvalidValue,
                "attribute `for` requires a value",
            ));
        }
        filter = Some(eval_attr(stack, env, attr.value.as_ref())?);
    }

    match filter {
        None => Ok(None),
        Some(Val::Str(s)) => Ok(Some(s)),
        Some(other) => Err(Exception::builtin(
            Except::WrongDataType,
            format!("`for` must be a string, got {}", other.type_name()),
        )),
    }
}
