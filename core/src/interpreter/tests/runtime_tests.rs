//! Tests for the tokio driver

use std::time::Duration;

use super::helpers::{catch_for, doc, doc_json, scheduler_with, RecordingEvaluator};
use crate::config::{InterpreterConfig, RendererConfig};
use crate::interpreter::atoms::Except;
use crate::interpreter::rdr::{
    BridgeError, HeadlessRenderer, RdrRequest, RdrResponse, RendererBridge, OP_UPDATE,
};
use crate::interpreter::runtime::Runtime;
use crate::interpreter::scheduler::Scheduler;
use crate::interpreter::types::Outcome;
use crate::variant::Val;
use crate::vdom::{Expr, NodeSpec};

/// Bridge whose every call times out
struct SilentRenderer;

impl RendererBridge for SilentRenderer {
    fn send_request_and_wait(
        &mut self,
        _request: &RdrRequest,
        timeout: Duration,
    ) -> Result<RdrResponse, BridgeError> {
        Err(BridgeError::Timeout(timeout))
    }
}

#[tokio::test]
async fn test_runtime_drives_timers_and_requests() {
    let evaluator = RecordingEvaluator::default();
    let sched = scheduler_with(evaluator.clone());
    let mut runtime = Runtime::new(sched, HeadlessRenderer::new(), &RendererConfig::default());

    let tree = NodeSpec::element("root")
        .child(NodeSpec::element("sleep").attr("for", Expr::lit("5ms")))
        .child(
            NodeSpec::element("request")
                .attr("to", Expr::lit(OP_UPDATE))
                .attr("on", Expr::lit("#count"))
                .attr("at", Expr::lit("textContent"))
                .attr("with", Expr::lit(3.0)),
        )
        .child(NodeSpec::element("done").attr("id", Expr::var("finished")));
    let id = runtime.scheduler_mut().spawn(doc(tree)).unwrap();

    let finished = runtime.run().await;

    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].id, id);
    assert_eq!(finished[0].outcome, Outcome::Return(Val::Num(3.0)));
    assert!(finished[0].stats.time_idle > Duration::ZERO);
    assert_eq!(evaluator.evaluated(), vec!["finished"]);

    let requests = runtime.renderer().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target_value, RendererConfig::default().dom_handle);
}

#[tokio::test]
async fn test_runtime_interleaves_sleeping_coroutines() {
    let sched = Scheduler::new(&InterpreterConfig::default());
    let mut runtime = Runtime::new(sched, HeadlessRenderer::new(), &RendererConfig::default());

    for delay in ["10ms", "1ms", "5ms"] {
        let tree = NodeSpec::element("root")
            .child(NodeSpec::element("sleep").attr("for", Expr::lit(delay)));
        runtime.scheduler_mut().spawn(doc(tree)).unwrap();
    }

    let finished = runtime.run().await;

    assert_eq!(finished.len(), 3);
    assert!(finished
        .iter()
        .all(|f| f.outcome == Outcome::Return(Val::Null)));
    assert!(runtime.scheduler().is_empty());
}

#[tokio::test]
async fn test_bridge_timeout_surfaces_as_exception() {
    let sched = Scheduler::new(&InterpreterConfig::default());
    let mut runtime = Runtime::new(sched, SilentRenderer, &RendererConfig::default());

    let failing = doc(NodeSpec::element("root").child(
        NodeSpec::element("request").attr("to", Expr::lit("clear")),
    ));
    let recovering = doc(
        NodeSpec::element("root").child(
            NodeSpec::element("request")
                .attr("to", Expr::lit("clear"))
                .child(catch_for("Timeout")),
        ),
    );
    let a = runtime.scheduler_mut().spawn(failing).unwrap();
    let b = runtime.scheduler_mut().spawn(recovering).unwrap();

    let finished = runtime.run().await;

    let outcome_of = |id| {
        finished
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.outcome.clone())
            .unwrap()
    };
    let Outcome::Throw(exc) = outcome_of(a) else {
        unreachable!("expected unhandled exception");
    };
    assert_eq!(exc.atom, Except::Timeout.atom());
    assert_eq!(outcome_of(b), Outcome::Return(Val::Null));
}

#[tokio::test]
async fn test_runtime_with_json_document() {
    let d = doc_json(
        r#"{"t": "element", "tag": "hvml", "children": [
            {"t": "element", "tag": "sleep",
             "attrs": [{"name": "for", "value": {"t": "Lit", "v": {"t": "Num", "v": 2}}}]},
            {"t": "comment", "text": "after the timer"}
        ]}"#,
    );
    let sched = Scheduler::new(&InterpreterConfig::default());
    let mut runtime = Runtime::new(sched, HeadlessRenderer::new(), &RendererConfig::default());
    runtime.scheduler_mut().spawn(d).unwrap();

    let finished = runtime.run().await;

    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].outcome, Outcome::Return(Val::Null));
    assert_eq!(finished[0].stats.frames_pushed, 2);
}
