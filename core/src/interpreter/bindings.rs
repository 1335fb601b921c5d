//! Scoped variable bindings
//!
//! Name resolution inside a frame walks, in order:
//! 1. the frame's symbol slots (`?`, `@`, `#`, `*`, `:`, `&`, `%`)
//! 2. bindings owned by the frame's scope element
//! 3. bindings of each enclosing frame's scope element, innermost first
//! 4. document-global bindings

use std::collections::HashMap;

use super::stack::ExecStack;
use super::types::SymbolVar;
use crate::variant::Val;
use crate::vdom::NodeId;

/* ===================== Bindings ===================== */

/// A flat set of named variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    vars: HashMap<String, Val>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any previous value
    ///
    /// Returns the replaced value.
    pub fn bind(&mut self, name: impl Into<String>, value: Val) -> Option<Val> {
        self.vars.insert(name.into(), value)
    }

    /// Unbind `name`; unbinding an unknown name is a no-op
    pub fn unbind(&mut self, name: &str) -> Option<Val> {
        self.vars.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Val> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Element-scoped bindings of one coroutine
#[derive(Debug, Default)]
pub struct ScopeVars {
    scopes: HashMap<NodeId, Bindings>,
}

impl ScopeVars {
    pub fn bind(&mut self, scope: NodeId, name: impl Into<String>, value: Val) -> Option<Val> {
        self.scopes.entry(scope).or_default().bind(name, value)
    }

    pub fn unbind(&mut self, scope: NodeId, name: &str) -> Option<Val> {
        let bindings = self.scopes.get_mut(&scope)?;
        let old = bindings.unbind(name);
        if bindings.is_empty() {
            self.scopes.remove(&scope);
        }
        old
    }

    pub fn get(&self, scope: NodeId, name: &str) -> Option<&Val> {
        self.scopes.get(&scope).and_then(|b| b.get(name))
    }

    /// Drop every binding owned by `scope`
    pub fn drop_scope(&mut self, scope: NodeId) {
        self.scopes.remove(&scope);
    }

    pub fn has_scope(&self, scope: NodeId) -> bool {
        self.scopes.contains_key(&scope)
    }
}

/* ===================== Scope View ===================== */

/// Read-only view used to resolve names while evaluating attributes
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    stack: &'a ExecStack,
    globals: Option<&'a Bindings>,
}

impl<'a> Scope<'a> {
    pub fn new(stack: &'a ExecStack, globals: Option<&'a Bindings>) -> Self {
        Scope { stack, globals }
    }

    /// Resolve a bare variable name from the innermost frame outward
    pub fn find_named_var(&self, name: &str) -> Option<&'a Val> {
        let stack = self.stack;

        if let Some(symbol) = SymbolVar::from_name(name) {
            return stack.bottom_frame().map(|f| f.symbol(symbol));
        }

        for frame in stack.frames().rev() {
            if let Some(v) = stack.scope_vars().get(frame.scope, name) {
                return Some(v);
            }
        }

        self.globals.and_then(|g| g.get(name))
    }

    /// Symbol slot of the frame `number` levels out from the innermost one
    pub fn symbolized_var(&self, number: u32, symbol: SymbolVar) -> Option<&'a Val> {
        let stack = self.stack;
        stack
            .frames()
            .rev()
            .nth(number as usize)
            .map(|f| f.symbol(symbol))
    }

    /// `$N?` shorthand
    pub fn numbered_var(&self, number: u32) -> Option<&'a Val> {
        self.symbolized_var(number, SymbolVar::QuestionMark)
    }
}
