//! Attribute value evaluation

use super::atoms::Except;
use super::bindings::Scope;
use super::errors::Exception;
use super::types::SymbolVar;
use crate::variant::Val;
use crate::vdom::Expr;

/// Evaluates attribute value expressions against a frame's scope
///
/// Failures come back as exceptions, which the caller attaches to the stack.
pub trait AttrEvaluator: Send + Sync {
    fn eval(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Val, Exception>;
}

/// Resolves variables through the scope chain
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEvaluator;

impl AttrEvaluator for DefaultEvaluator {
    fn eval(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Val, Exception> {
        match expr {
            Expr::Lit { v } => Ok(v.clone()),

            Expr::Var { name } => scope.find_named_var(name).cloned().ok_or_else(|| {
                Exception::builtin(Except::EntityNotFound, format!("variable `${name}` not found"))
            }),

            Expr::Symbol { symbol, number } => {
                let Some(var) = SymbolVar::from_char(*symbol) else {
                    return Err(Exception::builtin(
                        Except::InvalidValue,
                        format!("`{symbol}` is not a symbol variable"),
                    ));
                };
                scope.symbolized_var(*number, var).cloned().ok_or_else(|| {
                    Exception::builtin(Except::NoData, format!("no frame at level {number}"))
                })
            }

            Expr::Concat { parts } => {
                let mut out = String::new();
                for part in parts {
                    out.push_str(&self.eval(part, scope)?.to_display_string());
                }
                Ok(Val::Str(out))
            }
        }
    }
}
