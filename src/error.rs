use std::fmt;
use std::rc::Rc;

use crate::dom::Representation;

/// An error raised while building, normalizing, introspecting or rendering nodes, or
/// while evaluating generated code.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// A child value was neither a string, a list, a safe string nor a node. Holds the
    /// type name of the offending value.
    InvalidChild(&'static str),
    /// A macro name was used as an element tag.
    InvalidTag(Rc<str>),
    /// A void element was given children.
    VoidElement(Rc<str>),
    /// Attributes or children were added to a node that is not an element.
    NotAnElement,
    /// Attributes or children were added to a prerendered node.
    Prerendered,
    /// The representation does not support the requested operation.
    Unsupported(Representation),
    /// A node of one representation was combined with nodes of another.
    RepresentationMismatch {
        expected: Representation,
        found: Representation,
    },
    /// A value had the wrong type for the operation applied to it.
    TypeError(Rc<str>),
    /// An identifier was not bound in any enclosing scope.
    ReferenceError(Rc<str>),
    /// An import named a module path that is not registered.
    UnknownModule(Rc<str>),
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> RuntimeError {
        return RuntimeError::TypeError(Rc::from(message.into()));
    }
}

impl std::error::Error for RuntimeError {}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return match self {
            Self::InvalidChild(found) => write!(f, "invalid child of type {}", found),
            Self::InvalidTag(tag) => write!(
                f,
                "{} is a macro name and cannot be used as an element tag",
                tag
            ),
            Self::VoidElement(tag) => write!(f, "void element <{}> cannot have children", tag),
            Self::NotAnElement => write!(f, "cannot add attributes or children to a non-element"),
            Self::Prerendered => {
                write!(f, "cannot add attributes or children to a prerendered node")
            }
            Self::Unsupported(representation) => write!(
                f,
                "the {} representation does not support adding items",
                representation
            ),
            Self::RepresentationMismatch { expected, found } => write!(
                f,
                "expected a {} node but received a {} node",
                expected, found
            ),
            Self::TypeError(message) => write!(f, "type error: {}", message),
            Self::ReferenceError(name) => write!(f, "{} is not defined", name),
            Self::UnknownModule(path) => write!(f, "unknown module {}", path),
        };
    }
}

/// An error detected while compiling markup literals. Aborts the compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A statically known void tag was given children.
    VoidElementChildren(Rc<str>),
    /// A macro name appeared where a plain tag was required.
    MacroTag(Rc<str>),
    /// Building a constant subtree at compile time failed.
    Reify(RuntimeError),
}

impl std::error::Error for CompileError {}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return match self {
            Self::VoidElementChildren(tag) => {
                write!(f, "void element <{}> cannot have children", tag)
            }
            Self::MacroTag(tag) => write!(
                f,
                "{} is a macro name and cannot be used as a plain tag",
                tag
            ),
            Self::Reify(error) => write!(f, "cannot build constant markup: {}", error),
        };
    }
}
