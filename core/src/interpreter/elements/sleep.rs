//! `<sleep for="250ms">`: suspends the coroutine on a timer, then runs its children

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::{element_of, eval_attr, frame_element, set_next_step, ChildCursor, FrameContext};
use crate::interpreter::atoms::Except;
use crate::interpreter::coroutine::Coroutine;
use crate::interpreter::errors::{Exception, InterpError};
use crate::interpreter::exec_loop::Env;
use crate::interpreter::stack::ExecStack;
use crate::interpreter::types::{Completion, NextStep, WaitReason};
use crate::variant::Val;
use crate::vdom::Element;

#[derive(Debug)]
pub struct SleepContext {
    pub cursor: ChildCursor,
    pub duration: Duration,
}

pub(super) fn after_pushed(co: &mut Coroutine, env: &Env) -> Result<(), InterpError> {
    let (doc, pos) = frame_element(&co.stack)?;
    let element = element_of(&doc, pos, "sleep")?;
    let cursor = ChildCursor::new(&doc, pos);

    let duration = match eval_duration(&co.stack, env, element) {
        Ok(duration) => duration,
        Err(exc) => {
            co.stack
                .install_context(FrameContext::Sleep(SleepContext {
                    cursor,
                    duration: Duration::ZERO,
                }))?;
            co.stack.raise(exc.at_element(element));
            return set_next_step(&mut co.stack, NextStep::SelectChild);
        }
    };

    co.stack
        .install_context(FrameContext::Sleep(SleepContext { cursor, duration }))?;

    let fire_at = chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    co.suspend(WaitReason::Timer { fire_at });
    set_next_step(&mut co.stack, NextStep::Rerun)
}

pub(super) fn rerun(co: &mut Coroutine, _env: &Env) -> Result<(), InterpError> {
    match co.take_resume() {
        Some(Completion::TimerFired) => {}
        Some(Completion::Failed(exc)) => co.stack.raise(exc),
        Some(Completion::Renderer(_)) => {
            return Err(InterpError::structural(
                "sleep",
                "resumed with a renderer response",
            ))
        }
        None => return Err(InterpError::structural("sleep", "resumed without a completion")),
    }
    set_next_step(&mut co.stack, NextStep::SelectChild)
}

fn eval_duration(stack: &ExecStack, env: &Env, element: &Element) -> Result<Duration, Exception> {
    let mut value: Option<Val> = None;

    for attr in &element.attrs {
        if attr.name != "for" {
            return Err(Exception::builtin(
                Except::NotImplemented,
                format!("unknown attribute `{}` on <sleep>", attr.name),
            ));
        }
        if value.is_some() {
            return Err(Exception::builtin(
                Except::DuplicateName,
                "duplicate attribute `for`",
            ));
        }
        value = Some(eval_attr(stack, env, attr.value.as_ref())?);
    }

    let Some(value) = value else {
        return Err(Exception::builtin(
            Except::ArgumentMissed,
            "<sleep> requires a `for` attribute",
        ));
    };

    match value {
        Val::Num(ms) if ms >= 0.0 => Duration::try_from_secs_f64(ms / 1000.0).map_err(|_| {
            Exception::builtin(Except::InvalidValue, format!("duration of {ms}ms out of range"))
        }),
        Val::Str(s) => parse_duration(&s).ok_or_else(|| {
            Exception::builtin(Except::InvalidValue, format!("invalid duration `{s}`"))
        }),
        other => Err(Exception::builtin(
            Except::WrongDataType,
            format!("`for` must be a duration, got {}", other.type_name()),
        )),
    }
}

/// Parse `"250ms"`, `"2s"`, `"1m"` or `"1h"`; `None` when malformed or out of range
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();

    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        scaled_secs(mins, 60)
    } else if let Some(hours) = s.strip_suffix('h') {
        scaled_secs(hours, 3600)
    } else {
        None
    }
}

fn scaled_secs(count: &str, unit: u64) -> Option<Duration> {
    let count: u64 = count.trim().parse().ok()?;
    count.checked_mul(unit).map(Duration::from_secs)
}
