//! Structural element: evaluates its attributes and runs its children

use std::collections::HashMap;

use super::{element_of, eval_attr, frame_element, ChildCursor, FrameContext};
use crate::interpreter::atoms::Except;
use crate::interpreter::coroutine::Coroutine;
use crate::interpreter::errors::{Exception, InterpError};
use crate::interpreter::exec_loop::Env;
use crate::interpreter::stack::ExecStack;
use crate::interpreter::types::{NextStep, SymbolVar};
use crate::variant::Val;
use crate::vdom::Element;

pub(super) fn after_pushed(co: &mut Coroutine, env: &Env) -> Result<(), InterpError> {
    let (doc, pos) = frame_element(&co.stack)?;
    let element = element_of(&doc, pos, "undefined")?;

    co.stack
        .install_context(FrameContext::Structural(ChildCursor::new(&doc, pos)))?;

    let evaluated = eval_attrs(&co.stack, env, element);
    match evaluated {
        Ok(vars) => {
            if let Some(frame) = co.stack.bottom_frame_mut() {
                frame.attr_vars = vars;
            }
        }
        Err(exc) => co.stack.raise(exc.at_element(element)),
    }

    super::set_next_step(&mut co.stack, NextStep::SelectChild)
}

pub(super) fn on_popping(co: &mut Coroutine, _env: &Env) -> Result<bool, InterpError> {
    if co.stack.frame_count() == 1 {
        let result = co
            .stack
            .bottom_frame()
            .map(|f| f.symbol(SymbolVar::QuestionMark).clone())
            .unwrap_or_default();
        co.stack.set_ret_var(result);
    }
    Ok(true)
}

fn eval_attrs(
    stack: &ExecStack,
    env: &Env,
    element: &Element,
) -> Result<HashMap<String, Val>, Exception> {
    let mut vars = HashMap::with_capacity(element.attrs.len());
    for attr in &element.attrs {
        if vars.contains_key(&attr.name) {
            return Err(Exception::builtin(
                Except::DuplicateName,
                format!("duplicate attribute `{}`", attr.name),
            ));
        }
        let value = eval_attr(stack, env, attr.value.as_ref())?;
        vars.insert(attr.name.clone(), value);
    }
    Ok(vars)
}
