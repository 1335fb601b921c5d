//! Execution stack
//!
//! Frames are kept innermost-last in a `Vec`; the "bottom" frame in the
//! interpreter's vocabulary is the most recently pushed one. The stack also
//! owns the in-flight exception, scope bindings and run statistics.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use super::bindings::ScopeVars;
use super::elements::{ElementKind, FrameContext};
use super::errors::{Exception, InterpError};
use super::types::Frame;
use crate::variant::Val;
use crate::vdom::{Document, NodeId};

/* ===================== Statistics ===================== */

/// Counters accumulated over the life of one stack
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StackStats {
    pub frames_pushed: u64,
    pub frames_popped: u64,
    pub peak_frames: usize,
    pub contexts_installed: u64,
    pub contexts_released: u64,
    pub time_executed: Duration,
    pub time_idle: Duration,
}

/* ===================== Stack ===================== */

#[derive(Debug)]
pub struct ExecStack {
    frames: Vec<Frame>,
    doc: Arc<Document>,
    ret_var: Val,
    exception: Option<Exception>,
    scope_vars: ScopeVars,
    max_frames: usize,
    stats: StackStats,
}

impl ExecStack {
    pub fn new(doc: Arc<Document>, max_frames: usize) -> Self {
        ExecStack {
            frames: Vec::new(),
            doc,
            ret_var: Val::Null,
            exception: None,
            scope_vars: ScopeVars::default(),
            max_frames,
            stats: StackStats::default(),
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.doc
    }

    /* -------- Frames -------- */

    /// Push a frame for `element`; its first step is `AfterPushed`
    pub fn push_frame(
        &mut self,
        ops: ElementKind,
        element: NodeId,
    ) -> Result<&mut Frame, InterpError> {
        let depth = self.frames.len();
        if depth >= self.max_frames {
            return Err(InterpError::StackOverflow {
                limit: self.max_frames,
            });
        }
        self.frames
            .try_reserve(1)
            .map_err(|_| InterpError::OutOfMemory { depth })?;

        self.frames.push(Frame::new(ops, element));
        self.stats.frames_pushed += 1;
        self.stats.peak_frames = self.stats.peak_frames.max(self.frames.len());
        trace!(depth = depth + 1, ?ops, element = element.0, "frame pushed");

        let Some(frame) = self.frames.last_mut() else {
            return Err(InterpError::EmptyStack);
        };
        Ok(frame)
    }

    /// Pop the innermost frame, releasing its context and scope bindings
    pub fn pop_frame(&mut self) {
        let Some(mut frame) = self.frames.pop() else {
            return;
        };

        if frame.context.take().is_some() {
            self.stats.contexts_released += 1;
        }
        if !self.frames.iter().any(|f| f.scope == frame.scope) {
            self.scope_vars.drop_scope(frame.scope);
        }

        self.stats.frames_popped += 1;
        trace!(depth = self.frames.len(), ops = ?frame.ops, "frame popped");
    }

    /// Innermost frame; `None` means the coroutine has nothing left to run
    pub fn bottom_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn bottom_frame_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Frame enclosing the one at `idx`
    pub fn frame_parent(&self, idx: usize) -> Option<&Frame> {
        idx.checked_sub(1).and_then(|i| self.frames.get(i))
    }

    /// Frame enclosing the innermost one
    pub fn parent_frame_mut(&mut self) -> Option<&mut Frame> {
        let idx = self.frames.len().checked_sub(2)?;
        self.frames.get_mut(idx)
    }

    /// Frames outermost first
    pub fn frames(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /* -------- Frame context -------- */

    /// Install private state on the innermost frame
    pub fn install_context(&mut self, context: FrameContext) -> Result<(), InterpError> {
        let frame = self.frames.last_mut().ok_or(InterpError::EmptyStack)?;
        if frame.context.replace(context).is_some() {
            self.stats.contexts_released += 1;
        }
        self.stats.contexts_installed += 1;
        Ok(())
    }

    /// Release the innermost frame's private state ahead of its pop
    pub fn release_context(&mut self) -> Option<FrameContext> {
        let context = self.frames.last_mut()?.context.take()?;
        self.stats.contexts_released += 1;
        Some(context)
    }

    /* -------- Exception slot -------- */

    pub fn raise(&mut self, exception: Exception) {
        trace!(category = %exception.atom, "exception raised");
        self.exception = Some(exception);
    }

    pub fn take_exception(&mut self) -> Option<Exception> {
        self.exception.take()
    }

    pub fn exception(&self) -> Option<&Exception> {
        self.exception.as_ref()
    }

    pub fn has_exception(&self) -> bool {
        self.exception.is_some()
    }

    /* -------- Bindings -------- */

    pub fn scope_vars(&self) -> &ScopeVars {
        &self.scope_vars
    }

    pub fn bind_scope_variable(
        &mut self,
        scope: NodeId,
        name: impl Into<String>,
        value: Val,
    ) -> Option<Val> {
        self.scope_vars.bind(scope, name, value)
    }

    pub fn unbind_scope_variable(&mut self, scope: NodeId, name: &str) -> Option<Val> {
        self.scope_vars.unbind(scope, name)
    }

    /* -------- Result & statistics -------- */

    pub fn ret_var(&self) -> &Val {
        &self.ret_var
    }

    pub fn set_ret_var(&mut self, value: Val) {
        self.ret_var = value;
    }

    pub fn stats(&self) -> &StackStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut StackStats {
        &mut self.stats
    }
}
