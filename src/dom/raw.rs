use std::rc::Rc;

use super::builder::{check_element, Builder};
use super::{AttributeValue, Attributes, NormalizedAttribute};
use crate::error::RuntimeError;
use crate::normalize::{
    escape_html, is_void_element, normalize_attribute, render_normalized_attributes,
};

/// A node of the raw representation: its rendered, escaped HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    pub value: Rc<str>,
}

impl RawNode {
    pub fn new(value: impl Into<Rc<str>>) -> RawNode {
        RawNode {
            value: value.into(),
        }
    }
}

/// Renders nodes to strings as soon as they are built.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBuilder;

impl Builder for RawBuilder {
    type Ast = RawNode;
    type Payload = Rc<str>;
    type Attr = NormalizedAttribute;

    fn text(&self, value: &str) -> RawNode {
        RawNode::new(escape_html(value))
    }

    fn element(
        &self,
        tag: &str,
        attributes: &Attributes<AttributeValue>,
        children: Vec<RawNode>,
    ) -> Result<RawNode, RuntimeError> {
        check_element(tag, !children.is_empty())?;
        let mut html = format!(
            "<{}{}>",
            tag,
            render_normalized_attributes(&self.attributes(attributes))
        );
        for child in &children {
            html.push_str(&child.value);
        }
        if !is_void_element(tag) {
            html.push_str(&format!("</{}>", tag));
        }
        Ok(RawNode::new(html))
    }

    fn prerendered(&self, payload: Rc<str>) -> RawNode {
        RawNode { value: payload }
    }

    fn attribute_value(&self, raw: &AttributeValue) -> Option<NormalizedAttribute> {
        normalize_attribute(raw)
    }
}
