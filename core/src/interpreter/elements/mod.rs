//! Element operations
//!
//! Every element kind supplies the same four operations, dispatched by the
//! frame's `next_step`:
//!
//! - `after_pushed`: install private context, evaluate attributes
//! - `select_child`: push the next element child, or move to `OnPopping`
//! - `on_popping`: commit results; `false` defers the pop
//! - `rerun`: continue after a suspension without re-pushing
//!
//! Operations carry no state of their own. Whatever an element needs between
//! steps lives in the frame's [`FrameContext`].

mod catch;
mod request;
mod sleep;
mod undefined;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::trace;

use super::coroutine::Coroutine;
use super::errors::{Exception, InterpError};
use super::exec_loop::Env;
use super::stack::ExecStack;
use super::types::NextStep;
use crate::variant::Val;
use crate::vdom::{Document, Element, NodeId, NodeKind};

pub use catch::{matches_filter, CatchContext};
pub use request::RequestContext;
pub use sleep::{parse_duration, SleepContext};

/* ===================== Operations ===================== */

pub trait ElementOps {
    fn name(&self) -> &'static str;

    fn after_pushed(&self, co: &mut Coroutine, env: &Env) -> Result<(), InterpError>;

    fn select_child(&self, co: &mut Coroutine, env: &Env) -> Result<(), InterpError>;

    fn on_popping(&self, co: &mut Coroutine, env: &Env) -> Result<bool, InterpError>;

    fn rerun(&self, _co: &mut Coroutine, _env: &Env) -> Result<(), InterpError> {
        Err(InterpError::structural(self.name(), "rerun is not supported"))
    }

    /// Whether the element may run while an exception is in flight
    fn catches(&self) -> bool {
        false
    }
}

/// Closed set of element kinds known to the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Structural element; also used for every unknown tag
    Undefined,
    Catch,
    Sleep,
    Request,
}

impl ElementKind {
    /// Element kind for a tag name
    pub fn for_tag(tag: &str) -> ElementKind {
        static TABLE: OnceLock<HashMap<&'static str, ElementKind>> = OnceLock::new();
        let table = TABLE.get_or_init(|| {
            HashMap::from([
                ("catch", ElementKind::Catch),
                ("sleep", ElementKind::Sleep),
                ("request", ElementKind::Request),
            ])
        });
        table.get(tag).copied().unwrap_or(ElementKind::Undefined)
    }
}

impl ElementOps for ElementKind {
    fn name(&self) -> &'static str {
        match self {
            ElementKind::Undefined => "undefined",
            ElementKind::Catch => "catch",
            ElementKind::Sleep => "sleep",
            ElementKind::Request => "request",
        }
    }

    fn after_pushed(&self, co: &mut Coroutine, env: &Env) -> Result<(), InterpError> {
        match self {
            ElementKind::Undefined => undefined::after_pushed(co, env),
            ElementKind::Catch => catch::after_pushed(co, env),
            ElementKind::Sleep => sleep::after_pushed(co, env),
            ElementKind::Request => request::after_pushed(co, env),
        }
    }

    fn select_child(&self, co: &mut Coroutine, _env: &Env) -> Result<(), InterpError> {
        select_child(co, self.name())
    }

    fn on_popping(&self, co: &mut Coroutine, env: &Env) -> Result<bool, InterpError> {
        match self {
            ElementKind::Undefined => undefined::on_popping(co, env),
            ElementKind::Catch => Ok(true),
            ElementKind::Sleep => Ok(true),
            ElementKind::Request => request::on_popping(co, env),
        }
    }

    fn rerun(&self, co: &mut Coroutine, env: &Env) -> Result<(), InterpError> {
        match self {
            ElementKind::Sleep => sleep::rerun(co, env),
            ElementKind::Request => request::rerun(co, env),
            ElementKind::Undefined | ElementKind::Catch => Err(InterpError::structural(
                self.name(),
                "rerun is not supported",
            )),
        }
    }

    fn catches(&self) -> bool {
        matches!(self, ElementKind::Catch)
    }
}

/* ===================== Frame Context ===================== */

/// Element private state held by a frame
#[derive(Debug)]
pub enum FrameContext {
    Structural(ChildCursor),
    Catch(CatchContext),
    Sleep(SleepContext),
    Request(RequestContext),
}

impl FrameContext {
    pub fn cursor_mut(&mut self) -> &mut ChildCursor {
        match self {
            FrameContext::Structural(cursor) => cursor,
            FrameContext::Catch(ctx) => &mut ctx.cursor,
            FrameContext::Sleep(ctx) => &mut ctx.cursor,
            FrameContext::Request(ctx) => &mut ctx.cursor,
        }
    }
}

/// Position over an element's child nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildCursor {
    next: Option<NodeId>,
}

impl ChildCursor {
    pub fn new(doc: &Document, parent: NodeId) -> Self {
        ChildCursor {
            next: doc.first_child(parent),
        }
    }

    /// Return the current child and move past it
    pub fn advance(&mut self, doc: &Document) -> Option<NodeId> {
        let curr = self.next?;
        self.next = doc.next_sibling(curr);
        Some(curr)
    }
}

/* ===================== Shared Steps ===================== */

/// Document and position of the innermost frame
pub(crate) fn frame_element(stack: &ExecStack) -> Result<(Arc<Document>, NodeId), InterpError> {
    let frame = stack.bottom_frame().ok_or(InterpError::EmptyStack)?;
    Ok((Arc::clone(stack.document()), frame.pos))
}

pub(crate) fn element_of<'d>(
    doc: &'d Document,
    pos: NodeId,
    name: &str,
) -> Result<&'d Element, InterpError> {
    doc.element(pos)
        .ok_or_else(|| InterpError::structural(name, "frame position is not an element"))
}

pub(crate) fn set_next_step(stack: &mut ExecStack, step: NextStep) -> Result<(), InterpError> {
    let frame = stack.bottom_frame_mut().ok_or(InterpError::EmptyStack)?;
    frame.next_step = step;
    Ok(())
}

/// Evaluate one attribute value in the innermost frame's scope
///
/// An attribute written without a value evaluates to null.
pub(crate) fn eval_attr(
    stack: &ExecStack,
    env: &Env,
    value: Option<&crate::vdom::Expr>,
) -> Result<Val, Exception> {
    match value {
        Some(expr) => env.evaluator.eval(expr, &env.scope(stack)),
        None => Ok(Val::Null),
    }
}

/// Advance the innermost frame's cursor to the next element child
///
/// Content and comment nodes are observed and skipped. While an exception is
/// in flight only catch-capable children are pushed.
pub(crate) fn select_child(co: &mut Coroutine, name: &str) -> Result<(), InterpError> {
    let doc = Arc::clone(co.stack.document());

    loop {
        let frame = co.stack.bottom_frame_mut().ok_or(InterpError::EmptyStack)?;
        let cursor = frame
            .context_mut()
            .map(FrameContext::cursor_mut)
            .ok_or_else(|| InterpError::structural(name, "frame has no context"))?;

        let Some(child) = cursor.advance(&doc) else {
            frame.next_step = NextStep::OnPopping;
            return Ok(());
        };

        match doc.kind(child) {
            Some(NodeKind::Element(element)) => {
                let kind = ElementKind::for_tag(&element.tag);
                if co.stack.has_exception() && !kind.catches() {
                    trace!(tag = %element.tag, "skipping child while exception is in flight");
                    continue;
                }
                co.stack.push_frame(kind, child)?;
                return Ok(());
            }
            Some(NodeKind::Content(text)) => {
                let content = match frame.content.take() {
                    Some(Val::Str(mut prev)) => {
                        prev.push_str(text);
                        prev
                    }
                    _ => text.clone(),
                };
                frame.content = Some(Val::Str(content));
            }
            Some(NodeKind::Comment(text)) => {
                trace!(comment = %text, "comment skipped");
            }
            Some(NodeKind::Document) | None => {
                return Err(InterpError::structural(
                    name,
                    "document node found among children",
                ));
            }
        }
    }
}
