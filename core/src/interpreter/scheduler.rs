//! Cooperative coroutine scheduler
//!
//! Single-threaded: one coroutine runs at a time, for at most `slice_steps`
//! steps, and only suspends at explicit wait points. Wait requests collect in
//! an outbox the host drains with [`Scheduler::take_outbox`]; completions come
//! back through [`Scheduler::deliver`].

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::bindings::Bindings;
use super::coroutine::Coroutine;
use super::elements::ElementKind;
use super::errors::InterpError;
use super::evaluator::{AttrEvaluator, DefaultEvaluator};
use super::exec_loop::{run_until_blocked, terminate, Env};
use super::stack::{ExecStack, StackStats};
use super::types::{CoState, Completion, CoroutineId, Outcome, PendingWait, Step};
use crate::config::InterpreterConfig;
use crate::variant::Val;
use crate::vdom::Document;

/// A terminated coroutine removed from the scheduler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finished {
    pub id: CoroutineId,
    pub document: Uuid,
    pub outcome: Outcome,
    pub stats: StackStats,
}

pub struct Scheduler {
    coroutines: BTreeMap<CoroutineId, Coroutine>,
    ready: VecDeque<CoroutineId>,
    env: Env,
    outbox: Vec<PendingWait>,
    next_id: u64,
    max_frames: usize,
    slice_steps: usize,
}

impl Scheduler {
    pub fn new(config: &InterpreterConfig) -> Self {
        Self::with_evaluator(config, Box::new(DefaultEvaluator))
    }

    pub fn with_evaluator(config: &InterpreterConfig, evaluator: Box<dyn AttrEvaluator>) -> Self {
        Scheduler {
            coroutines: BTreeMap::new(),
            ready: VecDeque::new(),
            env: Env::new(evaluator),
            outbox: Vec::new(),
            next_id: 1,
            max_frames: config.max_frames,
            slice_steps: config.slice_steps.max(1),
        }
    }

    /// DOM handle addressed by `<request>` elements
    pub fn set_renderer_target(&mut self, handle: u64) {
        self.env.renderer_target = handle;
    }

    /* ===================== Globals ===================== */

    /// Bind a document-global variable
    pub fn bind_builtin_variable(
        &mut self,
        document: &Document,
        name: impl Into<String>,
        value: Val,
    ) -> Option<Val> {
        self.env
            .globals
            .entry(document.id())
            .or_insert_with(Bindings::new)
            .bind(name, value)
    }

    pub fn unbind_builtin_variable(&mut self, document: &Document, name: &str) -> Option<Val> {
        self.env.globals.get_mut(&document.id())?.unbind(name)
    }

    /* ===================== Coroutines ===================== */

    /// Create a coroutine for `doc` with its root element's frame pushed
    pub fn spawn(&mut self, doc: Arc<Document>) -> Result<CoroutineId, InterpError> {
        let root = doc.root_element().ok_or(InterpError::NoRootElement)?;
        let kind = doc
            .element(root)
            .map(|el| ElementKind::for_tag(&el.tag))
            .unwrap_or(ElementKind::Undefined);

        let mut stack = ExecStack::new(doc, self.max_frames);
        stack.push_frame(kind, root)?;

        let id = CoroutineId(self.next_id);
        self.next_id += 1;
        self.coroutines.insert(id, Coroutine::new(id, stack));
        self.ready.push_back(id);
        debug!(coroutine = %id, "coroutine spawned");
        Ok(id)
    }

    /// Run the next ready coroutine for one slice
    pub fn step(&mut self) -> Step {
        let id = loop {
            let Some(id) = self.ready.pop_front() else {
                return if self.has_waiting() {
                    Step::Idle
                } else {
                    Step::Done
                };
            };
            if matches!(self.coroutines.get(&id), Some(co) if co.state == CoState::Ready) {
                break id;
            }
        };
        let Some(co) = self.coroutines.get_mut(&id) else {
            return Step::Idle;
        };

        let started = Instant::now();
        let result = run_until_blocked(co, &self.env, self.slice_steps);
        co.stack.stats_mut().time_executed += started.elapsed();

        if let Err(err) = result {
            warn!(coroutine = %id, error = %err, "coroutine aborted");
            terminate(co, &self.env, Outcome::Fatal(err.to_string()));
        }

        match co.state {
            CoState::Ready => self.ready.push_back(id),
            CoState::Waiting => {
                for reason in co.take_pending() {
                    self.outbox.push(PendingWait {
                        coroutine: id,
                        reason,
                    });
                }
            }
            CoState::Running | CoState::Terminated => {}
        }

        Step::Ran(id)
    }

    /// Step until nothing is ready; returns the number of slices run
    pub fn run_until_idle(&mut self) -> usize {
        let mut slices = 0;
        while let Step::Ran(_) = self.step() {
            slices += 1;
        }
        slices
    }

    /// Hand a completed wait back to its coroutine
    pub fn deliver(&mut self, id: CoroutineId, completion: Completion) -> Result<(), InterpError> {
        let co = self
            .coroutines
            .get_mut(&id)
            .ok_or(InterpError::UnknownCoroutine(id.0))?;

        if co.state != CoState::Waiting {
            warn!(coroutine = %id, state = ?co.state, "dropping completion for coroutine that is not waiting");
            return Err(InterpError::NotWaiting(id.0));
        }

        if co.resume_with(completion) {
            self.ready.push_back(id);
        }
        Ok(())
    }

    /// Terminate a coroutine, force-popping its frames
    pub fn cancel(&mut self, id: CoroutineId) -> Result<(), InterpError> {
        let co = self
            .coroutines
            .get_mut(&id)
            .ok_or(InterpError::UnknownCoroutine(id.0))?;
        if co.is_terminated() {
            return Ok(());
        }

        terminate(co, &self.env, Outcome::Cancelled);
        self.outbox.retain(|w| w.coroutine != id);
        Ok(())
    }

    pub fn take_outbox(&mut self) -> Vec<PendingWait> {
        std::mem::take(&mut self.outbox)
    }

    /// Remove terminated coroutines and return their outcomes
    pub fn reap(&mut self) -> Vec<Finished> {
        let done: Vec<CoroutineId> = self
            .coroutines
            .iter()
            .filter(|(_, co)| co.is_terminated())
            .map(|(id, _)| *id)
            .collect();

        done.into_iter()
            .filter_map(|id| self.coroutines.remove(&id))
            .map(|co| Finished {
                id: co.id,
                document: co.stack.document().id(),
                stats: co.stack.stats().clone(),
                outcome: co.outcome.unwrap_or(Outcome::Cancelled),
            })
            .collect()
    }

    /* ===================== Queries ===================== */

    pub fn coroutine(&self, id: CoroutineId) -> Option<&Coroutine> {
        self.coroutines.get(&id)
    }

    pub fn outcome(&self, id: CoroutineId) -> Option<&Outcome> {
        self.coroutines.get(&id).and_then(|co| co.outcome.as_ref())
    }

    pub fn has_ready(&self) -> bool {
        self.ready
            .iter()
            .any(|id| matches!(self.coroutines.get(id), Some(co) if co.state == CoState::Ready))
    }

    pub fn has_waiting(&self) -> bool {
        self.coroutines
            .values()
            .any(|co| co.state == CoState::Waiting)
    }

    pub fn len(&self) -> usize {
        self.coroutines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coroutines.is_empty()
    }
}
