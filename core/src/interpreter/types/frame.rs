//! Stack frame types

use std::collections::HashMap;

use crate::interpreter::elements::{ElementKind, FrameContext};
use crate::variant::Val;
use crate::vdom::NodeId;

/* ===================== Next Step ===================== */

/// Which element operation the scheduler runs next for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    AfterPushed,
    OnPopping,
    Rerun,
    SelectChild,
    /// Element-specific sub-state, dispatched to `rerun`
    Customized(u16),
}

/* ===================== Symbol Variables ===================== */

/// Frame-local positional variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SymbolVar {
    /// `?` result of the element
    QuestionMark = 0,
    /// `@` current position
    AtSign = 1,
    /// `#` current event
    NumberSign = 2,
    /// `*` current match
    Asterisk = 3,
    /// `:` current key
    Colon = 4,
    /// `&` current value
    Ampersand = 5,
    /// `%` iteration index
    PercentSign = 6,
}

impl SymbolVar {
    pub const COUNT: usize = 7;

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '?' => Some(SymbolVar::QuestionMark),
            '@' => Some(SymbolVar::AtSign),
            '#' => Some(SymbolVar::NumberSign),
            '*' => Some(SymbolVar::Asterisk),
            ':' => Some(SymbolVar::Colon),
            '&' => Some(SymbolVar::Ampersand),
            '%' => Some(SymbolVar::PercentSign),
            _ => None,
        }
    }

    /// Parse a bare variable name consisting of exactly one symbol character
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/* ===================== Frame ===================== */

/// Execution frame - one per element under evaluation
#[derive(Debug)]
pub struct Frame {
    /// Scope element: bindings made for this frame are keyed by it
    pub scope: NodeId,

    /// Current execution position
    pub pos: NodeId,

    pub symbol_vars: [Val; SymbolVar::COUNT],

    /// Evaluated attributes (name -> value)
    pub attr_vars: HashMap<String, Val>,

    /// Evaluated content
    pub content: Option<Val>,

    /// Intermediate values, in production order
    pub mid_vars: Vec<Val>,

    pub ops: ElementKind,

    /// Element private state; released exactly once through the stack
    pub(crate) context: Option<FrameContext>,

    pub next_step: NextStep,
}

impl Frame {
    pub(crate) fn new(ops: ElementKind, element: NodeId) -> Self {
        Frame {
            scope: element,
            pos: element,
            symbol_vars: Default::default(),
            attr_vars: HashMap::new(),
            content: None,
            mid_vars: Vec::new(),
            ops,
            context: None,
            next_step: NextStep::AfterPushed,
        }
    }

    pub fn symbol(&self, var: SymbolVar) -> &Val {
        &self.symbol_vars[var.index()]
    }

    pub fn set_symbol(&mut self, var: SymbolVar, value: Val) {
        self.symbol_vars[var.index()] = value;
    }

    pub fn context(&self) -> Option<&FrameContext> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut FrameContext> {
        self.context.as_mut()
    }
}
