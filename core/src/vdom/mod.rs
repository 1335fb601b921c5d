//! Read-only element tree (vDOM)
//!
//! The interpreter walks a document that was produced elsewhere. Nodes live in
//! an arena and are addressed by [`NodeId`]; navigation is first-child /
//! next-sibling, the same shape the executor uses to advance its cursors.
//!
//! Documents are built from a nested [`NodeSpec`] tree, which is also the JSON
//! format accepted by the CLI:
//!
//! ```json
//! {"t": "element", "tag": "hvml", "children": [
//!     {"t": "element", "tag": "catch", "attrs": [
//!         {"name": "for", "value": {"t": "Lit", "v": {"t": "Str", "v": "*"}}}
//!     ]}
//! ]}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::variant::Val;

#[cfg(test)]
mod tests;

/* ===================== Identifiers ===================== */

/// Index of a node inside its document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Position of an element in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

/* ===================== Attributes ===================== */

/// Attribute value expression
///
/// Evaluated lazily by the interpreter against the scope of the frame that
/// owns the element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    /// Literal value
    Lit { v: Val },
    /// `$name`
    Var { name: String },
    /// `$?`, `$2@`, ...: symbol of the frame `number` levels out
    Symbol {
        symbol: char,
        #[serde(default)]
        number: u32,
    },
    /// String interpolation: each part is stringified and joined
    Concat { parts: Vec<Expr> },
}

impl Expr {
    pub fn lit(v: impl Into<Val>) -> Self {
        Expr::Lit { v: v.into() }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var { name: name.into() }
    }

    pub fn symbol(symbol: char, number: u32) -> Self {
        Expr::Symbol { symbol, number }
    }
}

/// Attribute operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttrOp {
    #[default]
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    Add,
    #[serde(rename = "-=")]
    Sub,
    #[serde(rename = "*=")]
    Mul,
    #[serde(rename = "/=")]
    Div,
    #[serde(rename = "%=")]
    Mod,
    #[serde(rename = "~=")]
    Regex,
    #[serde(rename = "^=")]
    Precede,
    #[serde(rename = "$=")]
    Succeed,
}

impl AttrOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttrOp::Assign => "=",
            AttrOp::Add => "+=",
            AttrOp::Sub => "-=",
            AttrOp::Mul => "*=",
            AttrOp::Div => "/=",
            AttrOp::Mod => "%=",
            AttrOp::Regex => "~=",
            AttrOp::Precede => "^=",
            AttrOp::Succeed => "$=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attr {
    pub name: String,
    #[serde(default)]
    pub op: AttrOp,
    /// `None` for an attribute written without a value
    #[serde(default)]
    pub value: Option<Expr>,
}

/* ===================== Nodes ===================== */

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attr>,
    pub pos: Option<SourcePos>,
}

/// Typed node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Content(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

/* ===================== Document ===================== */

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document has no root element")]
    NoRootElement,
}

/// Parsed document tree
///
/// Immutable once built; coroutines share it through an `Arc`.
#[derive(Debug)]
pub struct Document {
    id: Uuid,
    nodes: Vec<NodeData>,
}

impl Document {
    /// Build a document from a nested node tree
    ///
    /// A non-document root is wrapped in a document node.
    pub fn from_tree(spec: NodeSpec) -> Result<Self, DocumentError> {
        let mut doc = Document {
            id: Uuid::new_v4(),
            nodes: Vec::new(),
        };

        match spec {
            NodeSpec::Document { children } => {
                let root = doc.alloc(NodeKind::Document, None);
                for child in children {
                    doc.insert(child, root);
                }
            }
            other => {
                let root = doc.alloc(NodeKind::Document, None);
                doc.insert(other, root);
            }
        }

        if doc.root_element().is_none() {
            return Err(DocumentError::NoRootElement);
        }

        Ok(doc)
    }

    /// Parse a document from its JSON form
    pub fn from_json(source: &str) -> Result<Self, DocumentError> {
        let spec: NodeSpec = serde_json::from_str(source)?;
        Self::from_tree(spec)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The document node itself
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// First element child of the document node
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .find(|id| matches!(self.kind(*id), Some(NodeKind::Element(_))))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.first_child)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.next_sibling)
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.first_child(id),
        }
    }

    /// All element nodes in document order
    pub fn elements(&self) -> impl Iterator<Item = (NodeId, &Element)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match &n.kind {
                NodeKind::Element(element) => Some((NodeId(i), element)),
                _ => None,
            })
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent,
            first_child: None,
            last_child: None,
            next_sibling: None,
        });

        if let Some(parent) = parent {
            self.link_child(parent, id);
        }

        id
    }

    fn link_child(&mut self, parent: NodeId, child: NodeId) {
        match self.nodes[parent.0].last_child.replace(child) {
            Some(prev) => self.nodes[prev.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
    }

    fn insert(&mut self, spec: NodeSpec, parent: NodeId) {
        match spec {
            NodeSpec::Document { children } => {
                let id = self.alloc(NodeKind::Document, Some(parent));
                for child in children {
                    self.insert(child, id);
                }
            }
            NodeSpec::Element {
                tag,
                attrs,
                children,
                pos,
            } => {
                let id = self.alloc(NodeKind::Element(Element { tag, attrs, pos }), Some(parent));
                for child in children {
                    self.insert(child, id);
                }
            }
            NodeSpec::Content { text } => {
                self.alloc(NodeKind::Content(text), Some(parent));
            }
            NodeSpec::Comment { text } => {
                self.alloc(NodeKind::Comment(text), Some(parent));
            }
        }
    }
}

/// Iterator over the direct children of a node
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.doc.next_sibling(cur);
        Some(cur)
    }
}

/* ===================== Tree Spec ===================== */

/// Nested description of a document, used to build the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "lowercase")]
pub enum NodeSpec {
    Document {
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
    Element {
        tag: String,
        #[serde(default)]
        attrs: Vec<Attr>,
        #[serde(default)]
        children: Vec<NodeSpec>,
        #[serde(default)]
        pos: Option<SourcePos>,
    },
    Content {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl NodeSpec {
    pub fn element(tag: impl Into<String>) -> Self {
        NodeSpec::Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            pos: None,
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        NodeSpec::Content { text: text.into() }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        NodeSpec::Comment { text: text.into() }
    }

    /// Add an `name = value` attribute (no-op on non-elements)
    pub fn attr(self, name: impl Into<String>, value: Expr) -> Self {
        self.attr_op(name, AttrOp::Assign, Some(value))
    }

    pub fn attr_op(mut self, name: impl Into<String>, op: AttrOp, value: Option<Expr>) -> Self {
        if let NodeSpec::Element { attrs, .. } = &mut self {
            attrs.push(Attr {
                name: name.into(),
                op,
                value,
            });
        }
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        if let NodeSpec::Element { children, .. } | NodeSpec::Document { children } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn at(mut self, line: u32, column: u32, offset: usize) -> Self {
        if let NodeSpec::Element { pos, .. } = &mut self {
            *pos = Some(SourcePos {
                line,
                column,
                offset,
            });
        }
        self
    }
}
