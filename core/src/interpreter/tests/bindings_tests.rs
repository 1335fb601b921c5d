//! Tests for scoped variable bindings and name resolution

use std::sync::Arc;

use super::helpers::{doc, run_single, scheduler_with, RecordingEvaluator};
use crate::interpreter::bindings::{Bindings, Scope};
use crate::interpreter::coroutine::Coroutine;
use crate::interpreter::elements::ElementKind;
use crate::interpreter::exec_loop::{step, Env};
use crate::interpreter::scheduler::Scheduler;
use crate::interpreter::stack::ExecStack;
use crate::interpreter::types::{CoroutineId, Outcome, SymbolVar};
use crate::variant::Val;
use crate::vdom::{Document, Expr, NodeId, NodeSpec};

fn three_levels() -> (Arc<Document>, ExecStack, Vec<NodeId>) {
    let d = doc(NodeSpec::element("a").child(NodeSpec::element("b").child(NodeSpec::element("c"))));
    let a = d.root_element().unwrap();
    let b = d.first_child(a).unwrap();
    let c = d.first_child(b).unwrap();

    let mut stack = ExecStack::new(Arc::clone(&d), 16);
    for id in [a, b, c] {
        stack.push_frame(ElementKind::Undefined, id).unwrap();
    }
    (d, stack, vec![a, b, c])
}

fn coroutine_for(d: &Arc<Document>) -> Coroutine {
    let mut stack = ExecStack::new(Arc::clone(d), 16);
    stack
        .push_frame(ElementKind::Undefined, d.root_element().unwrap())
        .unwrap();
    Coroutine::new(CoroutineId(1), stack)
}

#[test]
fn test_rebind_replaces_and_unbind_absent_is_noop() {
    let mut vars = Bindings::new();

    assert_eq!(vars.bind("x", Val::Num(1.0)), None);
    assert_eq!(vars.bind("x", Val::Num(2.0)), Some(Val::Num(1.0)));
    assert_eq!(vars.get("x"), Some(&Val::Num(2.0)));

    assert_eq!(vars.unbind("never"), None);
    assert_eq!(vars.len(), 1);
    assert_eq!(vars.unbind("x"), Some(Val::Num(2.0)));
    assert!(vars.is_empty());
}

#[test]
fn test_lookup_walks_from_innermost_scope() {
    let (_, mut stack, ids) = three_levels();
    stack.bind_scope_variable(ids[0], "name", Val::from("outer"));
    stack.bind_scope_variable(ids[1], "name", Val::from("middle"));
    stack.bind_scope_variable(ids[0], "only_outer", Val::from("a"));

    let scope = Scope::new(&stack, None);
    assert_eq!(scope.find_named_var("name"), Some(&Val::from("middle")));
    assert_eq!(scope.find_named_var("only_outer"), Some(&Val::from("a")));
    assert_eq!(scope.find_named_var("missing"), None);
}

#[test]
fn test_lookup_falls_back_to_globals() {
    let (_, mut stack, ids) = three_levels();
    let mut globals = Bindings::new();
    globals.bind("name", Val::from("global"));
    globals.bind("shadowed", Val::from("global"));
    stack.bind_scope_variable(ids[2], "shadowed", Val::from("local"));

    let scope = Scope::new(&stack, Some(&globals));
    assert_eq!(scope.find_named_var("name"), Some(&Val::from("global")));
    assert_eq!(scope.find_named_var("shadowed"), Some(&Val::from("local")));
}

#[test]
fn test_symbol_names_resolve_to_innermost_slots() {
    let (_, mut stack, ids) = three_levels();
    stack
        .bottom_frame_mut()
        .unwrap()
        .set_symbol(SymbolVar::QuestionMark, Val::from("inner result"));
    stack.bind_scope_variable(ids[2], "?", Val::from("not a symbol lookup"));

    let scope = Scope::new(&stack, None);
    assert_eq!(scope.find_named_var("?"), Some(&Val::from("inner result")));
    assert_eq!(scope.find_named_var("@"), Some(&Val::Null));
}

#[test]
fn test_symbolized_and_numbered_vars() {
    let (_, mut stack, _) = three_levels();

    stack
        .bottom_frame_mut()
        .unwrap()
        .set_symbol(SymbolVar::QuestionMark, Val::Num(0.0));
    stack
        .parent_frame_mut()
        .unwrap()
        .set_symbol(SymbolVar::Colon, Val::from("key"));

    let scope = Scope::new(&stack, None);
    assert_eq!(scope.numbered_var(0), Some(&Val::Num(0.0)));
    assert_eq!(scope.symbolized_var(1, SymbolVar::Colon), Some(&Val::from("key")));
    assert_eq!(scope.numbered_var(2), Some(&Val::Null));
    assert_eq!(scope.numbered_var(3), None);
}

#[test]
fn test_builtin_variables_visible_to_attributes() {
    let d = doc(NodeSpec::element("root").attr("greeting", Expr::var("user")));
    let mut sched = scheduler_with(RecordingEvaluator::default());
    sched.bind_builtin_variable(&d, "user", Val::from("ada"));
    assert_eq!(
        sched.bind_builtin_variable(&d, "user", Val::from("grace")),
        Some(Val::from("ada"))
    );
    assert_eq!(sched.unbind_builtin_variable(&d, "user"), Some(Val::from("grace")));
    assert_eq!(sched.unbind_builtin_variable(&d, "user"), None);

    let mut env = Env::default();
    env.globals
        .entry(d.id())
        .or_default()
        .bind("user", Val::from("ada"));
    let mut co = coroutine_for(&d);
    step(&mut co, &env).unwrap();

    let frame = co.stack.bottom_frame().unwrap();
    assert_eq!(frame.attr_vars.get("greeting"), Some(&Val::from("ada")));
}

#[test]
fn test_missing_variable_raises_entity_not_found() {
    let d = doc(NodeSpec::element("root").attr("x", Expr::var("nope")));
    let mut sched = Scheduler::new(&Default::default());

    let (_, finished) = run_single(&mut sched, d);

    let Outcome::Throw(exc) = finished.outcome else {
        unreachable!("expected unhandled exception");
    };
    assert_eq!(exc.atom.as_str(), "EntityNotFound");
}

#[test]
fn test_concat_joins_display_strings() {
    let d = doc(NodeSpec::element("root").attr(
        "label",
        Expr::Concat {
            parts: vec![Expr::lit("n="), Expr::lit(3.0), Expr::var("suffix")],
        },
    ));
    let mut env = Env::default();
    env.globals
        .entry(d.id())
        .or_default()
        .bind("suffix", Val::from("!"));
    let mut co = coroutine_for(&d);
    step(&mut co, &env).unwrap();

    let frame = co.stack.bottom_frame().unwrap();
    assert_eq!(frame.attr_vars.get("label"), Some(&Val::from("n=3!")));
}
