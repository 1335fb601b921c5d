//! Exceptions and fatal interpreter errors
//!
//! Two separate channels:
//! - [`Exception`]: raised by element operations, attached to the stack and
//!   recoverable by a matching `<catch>`.
//! - [`InterpError`]: structural faults and allocation exhaustion. These abort
//!   the coroutine; catch elements never see them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::atoms::{Atom, Except};
use crate::variant::Val;
use crate::vdom::{Element, SourcePos};

/* ===================== Exceptions ===================== */

/// Context attached to an exception
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExceptionInfo {
    pub message: String,
    /// Tag of the element whose operation raised the exception
    pub element: Option<String>,
    pub position: Option<SourcePos>,
}

/// An in-flight exception
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    pub atom: Atom,
    pub info: Option<ExceptionInfo>,
}

impl Exception {
    pub fn new(atom: Atom) -> Self {
        Exception { atom, info: None }
    }

    pub fn with_message(atom: Atom, message: impl Into<String>) -> Self {
        Exception {
            atom,
            info: Some(ExceptionInfo {
                message: message.into(),
                element: None,
                position: None,
            }),
        }
    }

    pub fn builtin(kind: Except, message: impl Into<String>) -> Self {
        Self::with_message(kind.atom(), message)
    }

    /// Attribute the exception to an element, keeping any earlier attribution
    pub fn at_element(mut self, element: &Element) -> Self {
        let info = self.info.get_or_insert_with(ExceptionInfo::default);
        if info.element.is_none() {
            info.element = Some(element.tag.clone());
            info.position = element.pos;
        }
        self
    }

    pub fn message(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.message.as_str())
    }

    /// Value bound to `$?` inside a catch body
    pub fn to_val(&self) -> Val {
        let mut obj = Val::object();
        obj.set("type", Val::from(self.atom.as_str()));
        if let Some(info) = &self.info {
            obj.set("message", Val::from(info.message.as_str()));
            if let Some(tag) = &info.element {
                obj.set("element", Val::from(tag.as_str()));
            }
            if let Some(pos) = info.position {
                obj.set("line", Val::Num(pos.line as f64));
                obj.set("column", Val::Num(pos.column as f64));
                obj.set("offset", Val::Num(pos.offset as f64));
            }
        }
        obj
    }
}

impl std::fmt::Display for Exception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.atom)?;
        if let Some(info) = &self.info {
            if !info.message.is_empty() {
                write!(f, ": {}", info.message)?;
            }
            if let Some(pos) = info.position {
                write!(f, " (line {}, column {})", pos.line, pos.column)?;
            }
        }
        Ok(())
    }
}

/* ===================== Fatal Errors ===================== */

/// Unrecoverable interpreter error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpError {
    #[error("out of memory while pushing frame at depth {depth}")]
    OutOfMemory { depth: usize },

    #[error("stack depth limit of {limit} frames exceeded")]
    StackOverflow { limit: usize },

    #[error("structural error in <{tag}>: {message}")]
    Structural { tag: String, message: String },

    #[error("no frame on the stack")]
    EmptyStack,

    #[error("document has no root element")]
    NoRootElement,

    #[error("unknown coroutine {0}")]
    UnknownCoroutine(u64),

    #[error("coroutine {0} is not waiting")]
    NotWaiting(u64),
}

impl InterpError {
    pub fn structural(tag: impl Into<String>, message: impl Into<String>) -> Self {
        InterpError::Structural {
            tag: tag.into(),
            message: message.into(),
        }
    }
}
