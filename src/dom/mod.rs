//! The document model: one builder contract and three interchangeable representations
//! of an HTML-like tree.
//!
//! * [structured::Node] is an immutable tree.
//! * [stream::StreamNode] writes itself into a [stream::Sink] when rendered.
//! * [raw::RawNode] is an already rendered, escaped string.

mod builder;
pub mod raw;
pub mod stream;
pub mod structured;

use indexmap::IndexMap;
use std::rc::Rc;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::RuntimeError;

pub use builder::{check_element, rebuild, Builder};
pub use raw::{RawBuilder, RawNode};
pub use stream::{LeafKind, Sink, StreamBuilder, StreamNode};
pub use structured::{Element, Node, StructuredBuilder};

/// Attributes in insertion order. Inserting an existing key replaces its value in place.
pub type Attributes<V> = IndexMap<Rc<str>, V>;

/// An attribute value as written by a template author, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(Rc<str>),
    Number(f64),
    Bool(bool),
    Null,
    Undefined,
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(Rc::from(value))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<NormalizedAttribute> for AttributeValue {
    fn from(value: NormalizedAttribute) -> Self {
        match value {
            NormalizedAttribute::String(s) => AttributeValue::String(s),
            NormalizedAttribute::True => AttributeValue::Bool(true),
        }
    }
}

/// An attribute value that survived normalization. `True` renders as a bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NormalizedAttribute {
    String(Rc<str>),
    True,
}

/// The three output representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Representation {
    Structured,
    Stream,
    Raw,
}

impl Representation {
    /// Whether nodes of this representation can be written out as literal values.
    pub fn supports_literals(self) -> bool {
        match self {
            Representation::Structured | Representation::Raw => true,
            Representation::Stream => false,
        }
    }
}

/// A node of any representation.
#[derive(Debug, Clone)]
pub enum AnyNode {
    Structured(Node),
    Stream(StreamNode),
    Raw(RawNode),
}

impl AnyNode {
    pub fn representation(&self) -> Representation {
        match self {
            AnyNode::Structured(_) => Representation::Structured,
            AnyNode::Stream(_) => Representation::Stream,
            AnyNode::Raw(_) => Representation::Raw,
        }
    }

    /// Renders the node to HTML text. Two nodes are observationally equal when this
    /// returns the same string for both.
    pub fn to_html(&self) -> Result<String, RuntimeError> {
        match self {
            AnyNode::Structured(node) => node.to_html(),
            AnyNode::Stream(node) => node.materialize(),
            AnyNode::Raw(node) => Ok(node.value.to_string()),
        }
    }

    pub fn into_structured(self) -> Result<Node, RuntimeError> {
        match self {
            AnyNode::Structured(node) => Ok(node),
            other => Err(other.mismatch(Representation::Structured)),
        }
    }

    pub fn into_stream(self) -> Result<StreamNode, RuntimeError> {
        match self {
            AnyNode::Stream(node) => Ok(node),
            other => Err(other.mismatch(Representation::Stream)),
        }
    }

    pub fn into_raw(self) -> Result<RawNode, RuntimeError> {
        match self {
            AnyNode::Raw(node) => Ok(node),
            other => Err(other.mismatch(Representation::Raw)),
        }
    }

    fn mismatch(&self, expected: Representation) -> RuntimeError {
        RuntimeError::RepresentationMismatch {
            expected,
            found: self.representation(),
        }
    }
}

impl From<Node> for AnyNode {
    fn from(node: Node) -> Self {
        AnyNode::Structured(node)
    }
}

impl From<StreamNode> for AnyNode {
    fn from(node: StreamNode) -> Self {
        AnyNode::Stream(node)
    }
}

impl From<RawNode> for AnyNode {
    fn from(node: RawNode) -> Self {
        AnyNode::Raw(node)
    }
}
