use std::rc::Rc;

use super::{AttributeValue, Attributes, Node};
use crate::error::RuntimeError;
use crate::normalize::{is_macro_name, is_void_element};

/// The constructor interface every representation implements.
pub trait Builder {
    /// The node type of this representation.
    type Ast: Clone;
    /// The payload of prerendered nodes.
    type Payload: From<Rc<str>>;
    /// The attribute value stored on elements after normalization.
    type Attr;

    /// Creates a text node. The value is escaped when rendered.
    fn text(&self, value: &str) -> Self::Ast;

    /// Creates an element node.
    ///
    /// Fails with [RuntimeError::InvalidTag] when `tag` is a macro name, and with
    /// [RuntimeError::VoidElement] when `tag` is void and `children` is non-empty.
    fn element(
        &self,
        tag: &str,
        attributes: &Attributes<AttributeValue>,
        children: Vec<Self::Ast>,
    ) -> Result<Self::Ast, RuntimeError>;

    /// Creates a node from content that needs no further escaping.
    fn prerendered(&self, payload: Self::Payload) -> Self::Ast;

    /// Normalizes an attribute value. `None` drops the attribute.
    fn attribute_value(&self, raw: &AttributeValue) -> Option<Self::Attr>;

    /// Creates a content node from a string, escaped or taken as is.
    fn content(&self, value: &str, escape: bool) -> Self::Ast {
        if escape {
            self.text(value)
        } else {
            self.prerendered(Self::Payload::from(Rc::from(value)))
        }
    }

    /// Normalizes every attribute through [Builder::attribute_value], dropping absent values.
    fn attributes(&self, attributes: &Attributes<AttributeValue>) -> Attributes<Self::Attr> {
        attributes
            .iter()
            .filter_map(|(key, value)| {
                self.attribute_value(value)
                    .map(|value| (Rc::clone(key), value))
            })
            .collect()
    }
}

/// Validates a tag before an element is constructed with it.
pub fn check_element(tag: &str, has_children: bool) -> Result<(), RuntimeError> {
    if is_macro_name(tag) {
        return Err(RuntimeError::InvalidTag(Rc::from(tag)));
    }
    if has_children && is_void_element(tag) {
        return Err(RuntimeError::VoidElement(Rc::from(tag)));
    }
    return Ok(());
}

/// Builds a structured tree again with another builder.
pub fn rebuild<B: Builder>(node: &Node, builder: &B) -> Result<B::Ast, RuntimeError> {
    match node {
        Node::Text(value) => Ok(builder.text(value)),
        Node::Prerendered(payload) => Ok(builder.prerendered(B::Payload::from(Rc::clone(payload)))),
        Node::Element(element) => {
            let attributes: Attributes<AttributeValue> = element
                .attributes
                .iter()
                .map(|(key, value)| (Rc::clone(key), AttributeValue::from(value.clone())))
                .collect();
            let children = element
                .children
                .iter()
                .map(|child| rebuild(child, builder))
                .collect::<Result<Vec<_>, _>>()?;
            builder.element(&element.tag, &attributes, children)
        }
    }
}
