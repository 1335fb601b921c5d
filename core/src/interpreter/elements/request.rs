//! `<request to="update" on="#title" at="textContent" with="..." as="resp">`
//!
//! Sends one request to the renderer and suspends until the response is
//! delivered. The response payload becomes the frame's `?`; on pop it is
//! committed to the parent's `?` and, with `as`, bound in the parent's scope.
//! Nothing is committed while an exception is propagating.

use tracing::debug;

use super::{element_of, eval_attr, frame_element, set_next_step, ChildCursor, FrameContext};
use crate::interpreter::atoms::Except;
use crate::interpreter::coroutine::Coroutine;
use crate::interpreter::errors::{Exception, InterpError};
use crate::interpreter::exec_loop::Env;
use crate::interpreter::rdr::{RdrData, RdrRequest, RdrTarget};
use crate::interpreter::stack::ExecStack;
use crate::interpreter::types::{Completion, NextStep, SymbolVar, WaitReason};
use crate::variant::Val;
use crate::vdom::Element;

/// Sub-state of a request frame waiting on the renderer
pub const AWAIT_RESPONSE: u16 = 1;

#[derive(Debug)]
pub struct RequestContext {
    pub cursor: ChildCursor,
    /// Binding name from `as`
    pub bind_as: Option<String>,
    /// Response payload, set once a successful response arrives
    pub response: Option<Val>,
}

pub(super) fn after_pushed(co: &mut Coroutine, env: &Env) -> Result<(), InterpError> {
    let (doc, pos) = frame_element(&co.stack)?;
    let element = element_of(&doc, pos, "request")?;
    let cursor = ChildCursor::new(&doc, pos);

    let built = build_request(&co.stack, env, element);
    let (request, bind_as) = match built {
        Ok(built) => built,
        Err(exc) => {
            co.stack.install_context(FrameContext::Request(RequestContext {
                cursor,
                bind_as: None,
                response: None,
            }))?;
            co.stack.raise(exc.at_element(element));
            return set_next_step(&mut co.stack, NextStep::SelectChild);
        }
    };

    debug!(
        operation = %request.operation,
        request_id = %request.request_id,
        "request suspending for renderer"
    );
    co.stack.install_context(FrameContext::Request(RequestContext {
        cursor,
        bind_as,
        response: None,
    }))?;
    co.suspend(WaitReason::Renderer(request));
    set_next_step(&mut co.stack, NextStep::Customized(AWAIT_RESPONSE))
}

pub(super) fn rerun(co: &mut Coroutine, _env: &Env) -> Result<(), InterpError> {
    let (doc, pos) = frame_element(&co.stack)?;
    let element = element_of(&doc, pos, "request")?;

    match co.take_resume() {
        Some(Completion::Renderer(resp)) if resp.is_ok() => {
            let value = resp.data.into_val();
            let frame = co.stack.bottom_frame_mut().ok_or(InterpError::EmptyStack)?;
            frame.set_symbol(SymbolVar::QuestionMark, value.clone());
            match frame.context_mut() {
                Some(FrameContext::Request(ctx)) => ctx.response = Some(value),
                _ => return Err(InterpError::structural("request", "frame has no context")),
            }
        }
        Some(Completion::Renderer(resp)) => {
            let exc = Exception::builtin(
                Except::ServerRefused,
                format!("renderer answered {}", resp.ret_code),
            );
            co.stack.raise(exc.at_element(element));
        }
        Some(Completion::Failed(exc)) => co.stack.raise(exc.at_element(element)),
        Some(Completion::TimerFired) => {
            return Err(InterpError::structural("request", "resumed by a timer"))
        }
        None => {
            return Err(InterpError::structural(
                "request",
                "resumed without a completion",
            ))
        }
    }

    set_next_step(&mut co.stack, NextStep::SelectChild)
}

pub(super) fn on_popping(co: &mut Coroutine, _env: &Env) -> Result<bool, InterpError> {
    let Some(FrameContext::Request(ctx)) = co.stack.release_context() else {
        return Ok(true);
    };
    let Some(value) = ctx.response else {
        return Ok(true);
    };
    if co.stack.has_exception() {
        return Ok(true);
    }

    let Some(parent) = co.stack.parent_frame_mut() else {
        co.stack.set_ret_var(value);
        return Ok(true);
    };
    parent.set_symbol(SymbolVar::QuestionMark, value.clone());
    let scope = parent.scope;

    if let Some(name) = ctx.bind_as {
        co.stack.bind_scope_variable(scope, name, value);
    }
    Ok(true)
}

fn build_request(
    stack: &ExecStack,
    env: &Env,
    element: &Element,
) -> Result<(RdrRequest, Option<String>), Exception> {
    let mut to = None;
    let mut on = None;
    let mut at = None;
    let mut with = None;
    let mut bind_as = None;

    for attr in &element.attrs {
        let slot = match attr.name.as_str() {
            "to" => &mut to,
            "on" => &mut on,
            "at" => &mut at,
            "with" => &mut with,
            "as" => &mut bind_as,
            other => {
                return Err(Exception::builtin(
                    Except::NotImplemented,
                    format!("unknown attribute `{other}` on <request>"),
                ))
            }
        };
        if slot.is_some() {
            return Err(Exception::builtin(
                Except::DuplicateName,
                format!("duplicate attribute `{}`", attr.name),
            ));
        }
        *slot = Some(eval_attr(stack, env, attr.value.as_ref())?);
    }

    let to = to.map(|v| expect_string("to", v)).transpose()?;
    let on = on.map(|v| expect_string("on", v)).transpose()?;
    let at = at.map(|v| expect_string("at", v)).transpose()?;
    let bind_as = bind_as.map(|v| expect_string("as", v)).transpose()?;
    let with = with.unwrap_or(Val::Null);

    let Some(operation) = to else {
        return Err(Exception::builtin(
            Except::ArgumentMissed,
            "<request> requires a `to` attribute",
        ));
    };

    let mut request = RdrRequest::new(RdrTarget::Dom, env.renderer_target, operation)
        .with_data(RdrData::from_val(with));
    if let Some(on) = on {
        request = request.on_element(&on);
    }
    if let Some(at) = at {
        request = request.at_property(at);
    }
    Ok((request, bind_as))
}

fn expect_string(name: &str, value: Val) -> Result<String, Exception> {
    match value {
        Val::Str(s) => Ok(s),
        other => Err(Exception::builtin(
            Except::WrongDataType,
            format!("`{name}` must be a string, got {}", other.type_name()),
        )),
    }
}
