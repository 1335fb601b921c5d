//! Test helpers for interpreter tests
//!
//! Document builders, a recording evaluator and scheduler shortcuts

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::InterpreterConfig;
use crate::interpreter::atoms::Atom;
use crate::interpreter::bindings::Scope;
use crate::interpreter::errors::Exception;
use crate::interpreter::evaluator::{AttrEvaluator, DefaultEvaluator};
use crate::interpreter::scheduler::{Finished, Scheduler};
use crate::interpreter::types::CoroutineId;
use crate::variant::Val;
use crate::vdom::{Document, Expr, NodeSpec};

/// Evaluator that records every variable it is asked for
///
/// - names listed in `failures` raise an exception of the mapped category
/// - other names resolve through the scope chain, or to null when unbound
#[derive(Clone, Default)]
pub struct RecordingEvaluator {
    pub log: Arc<Mutex<Vec<String>>>,
    pub failures: HashMap<String, Atom>,
}

impl RecordingEvaluator {
    pub fn failing(failures: HashMap<String, Atom>) -> Self {
        RecordingEvaluator {
            log: Arc::default(),
            failures,
        }
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl AttrEvaluator for RecordingEvaluator {
    fn eval(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Val, Exception> {
        let Expr::Var { name } = expr else {
            return DefaultEvaluator.eval(expr, scope);
        };

        self.log.lock().unwrap().push(name.clone());
        if let Some(atom) = self.failures.get(name) {
            return Err(Exception::with_message(*atom, format!("${name} failed")));
        }
        Ok(scope.find_named_var(name).cloned().unwrap_or_default())
    }
}

/// Build a shared document from a tree
pub fn doc(tree: NodeSpec) -> Arc<Document> {
    Arc::new(Document::from_tree(tree).expect("build document"))
}

/// Build a shared document from its JSON form
pub fn doc_json(json: &str) -> Arc<Document> {
    Arc::new(Document::from_json(json).expect("parse document"))
}

/// `<catch for="...">` with the given children
pub fn catch_for(filter: &str) -> NodeSpec {
    NodeSpec::element("catch").attr("for", Expr::lit(filter))
}

pub fn scheduler_with(evaluator: impl AttrEvaluator + 'static) -> Scheduler {
    Scheduler::with_evaluator(&InterpreterConfig::default(), Box::new(evaluator))
}

/// Spawn `doc`, run until idle and return the single finished coroutine
pub fn run_single(sched: &mut Scheduler, doc: Arc<Document>) -> (CoroutineId, Finished) {
    let id = sched.spawn(doc).expect("spawn coroutine");
    sched.run_until_idle();
    let mut finished = sched.reap();
    assert_eq!(finished.len(), 1, "expected one finished coroutine");
    (id, finished.remove(0))
}
