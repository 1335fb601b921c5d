//! Tests for frame push/pop, contexts and depth limits

use std::sync::Arc;

use super::helpers::doc;
use crate::interpreter::atoms::Except;
use crate::interpreter::elements::{ChildCursor, ElementKind, FrameContext};
use crate::interpreter::errors::{Exception, InterpError};
use crate::interpreter::stack::ExecStack;
use crate::interpreter::types::{NextStep, SymbolVar};
use crate::variant::Val;
use crate::vdom::{Document, NodeId, NodeSpec};

fn nested(depth: usize) -> Arc<Document> {
    let mut tree = NodeSpec::element(format!("e{}", depth - 1));
    for i in (0..depth - 1).rev() {
        tree = NodeSpec::element(format!("e{}", i)).child(tree);
    }
    doc(tree)
}

/// Element ids from the root downwards
fn chain(doc: &Document) -> Vec<NodeId> {
    let mut ids = Vec::new();
    let mut cur = doc.root_element();
    while let Some(id) = cur {
        ids.push(id);
        cur = doc.first_child(id);
    }
    ids
}

#[test]
fn test_push_then_pop_restores_count_and_releases_contexts() {
    let d = nested(5);
    let mut stack = ExecStack::new(Arc::clone(&d), 64);

    for id in chain(&d) {
        let frame = stack.push_frame(ElementKind::Undefined, id).unwrap();
        assert_eq!(frame.next_step, NextStep::AfterPushed);
        assert_eq!(frame.pos, id);
        stack
            .install_context(FrameContext::Structural(ChildCursor::new(&d, id)))
            .unwrap();
    }
    assert_eq!(stack.frame_count(), 5);

    for expected in (0..5).rev() {
        stack.pop_frame();
        assert_eq!(stack.frame_count(), expected);
    }

    let stats = stack.stats();
    assert_eq!(stats.frames_pushed, 5);
    assert_eq!(stats.frames_popped, 5);
    assert_eq!(stats.peak_frames, 5);
    assert_eq!(stats.contexts_installed, 5);
    assert_eq!(stats.contexts_released, 5);
    assert!(stack.bottom_frame().is_none());
}

#[test]
fn test_early_release_is_not_counted_twice() {
    let d = nested(1);
    let root = d.root_element().unwrap();
    let mut stack = ExecStack::new(Arc::clone(&d), 8);

    stack.push_frame(ElementKind::Undefined, root).unwrap();
    stack
        .install_context(FrameContext::Structural(ChildCursor::new(&d, root)))
        .unwrap();

    assert!(stack.release_context().is_some());
    assert!(stack.release_context().is_none());
    stack.pop_frame();

    assert_eq!(stack.stats().contexts_installed, 1);
    assert_eq!(stack.stats().contexts_released, 1);
}

#[test]
fn test_pop_on_empty_stack_is_noop() {
    let mut stack = ExecStack::new(nested(1), 8);
    stack.pop_frame();
    assert_eq!(stack.frame_count(), 0);
    assert_eq!(stack.stats().frames_popped, 0);
}

#[test]
fn test_depth_limit_is_fatal() {
    let d = nested(3);
    let ids = chain(&d);
    let mut stack = ExecStack::new(Arc::clone(&d), 2);

    stack.push_frame(ElementKind::Undefined, ids[0]).unwrap();
    stack.push_frame(ElementKind::Undefined, ids[1]).unwrap();
    let err = stack.push_frame(ElementKind::Undefined, ids[2]).unwrap_err();

    assert_eq!(err, InterpError::StackOverflow { limit: 2 });
    assert_eq!(stack.frame_count(), 2);
}

#[test]
fn test_frame_parent_and_bottom_frame() {
    let d = nested(3);
    let ids = chain(&d);
    let mut stack = ExecStack::new(Arc::clone(&d), 8);
    for id in &ids {
        stack.push_frame(ElementKind::Undefined, *id).unwrap();
    }

    assert_eq!(stack.bottom_frame().unwrap().pos, ids[2]);
    assert_eq!(stack.frame_parent(2).unwrap().pos, ids[1]);
    assert_eq!(stack.frame_parent(1).unwrap().pos, ids[0]);
    assert!(stack.frame_parent(0).is_none());
}

#[test]
fn test_exception_flag_follows_slot() {
    let mut stack = ExecStack::new(nested(1), 8);
    assert!(!stack.has_exception());

    stack.raise(Exception::builtin(Except::NoData, "nothing"));
    assert!(stack.has_exception());

    let exc = stack.take_exception().unwrap();
    assert_eq!(exc.atom, Except::NoData.atom());
    assert!(!stack.has_exception());
    assert!(stack.take_exception().is_none());
}

#[test]
fn test_scope_bindings_die_with_their_frame() {
    let d = nested(2);
    let ids = chain(&d);
    let mut stack = ExecStack::new(Arc::clone(&d), 8);

    stack.push_frame(ElementKind::Undefined, ids[0]).unwrap();
    stack.push_frame(ElementKind::Undefined, ids[1]).unwrap();
    stack.bind_scope_variable(ids[0], "outer", Val::from("o"));
    stack.bind_scope_variable(ids[1], "inner", Val::from("i"));

    stack.pop_frame();
    assert!(stack.scope_vars().get(ids[1], "inner").is_none());
    assert_eq!(stack.scope_vars().get(ids[0], "outer"), Some(&Val::from("o")));

    stack.pop_frame();
    assert!(stack.scope_vars().get(ids[0], "outer").is_none());
}

#[test]
fn test_symbol_slots_start_null() {
    let d = nested(1);
    let mut stack = ExecStack::new(Arc::clone(&d), 8);
    let frame = stack
        .push_frame(ElementKind::Undefined, d.root_element().unwrap())
        .unwrap();

    assert_eq!(frame.symbol(SymbolVar::QuestionMark), &Val::Null);
    frame.set_symbol(SymbolVar::PercentSign, Val::Num(2.0));
    assert_eq!(frame.symbol(SymbolVar::PercentSign), &Val::Num(2.0));
}
