use std::rc::Rc;

use super::builder::{check_element, rebuild, Builder};
use super::{AttributeValue, Attributes, NormalizedAttribute, RawBuilder};
use crate::error::RuntimeError;
use crate::normalize::normalize_attribute;

/// A node of the structured representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Text, escaped when rendered.
    Text(Rc<str>),
    Element(Element),
    /// Content that is already HTML.
    Prerendered(Rc<str>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Rc<str>,
    pub attributes: Attributes<NormalizedAttribute>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn text(value: &str) -> Node {
        Node::Text(Rc::from(value))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    /// Renders the tree through the raw representation.
    pub fn to_html(&self) -> Result<String, RuntimeError> {
        let raw = rebuild(self, &RawBuilder)?;
        Ok(raw.value.to_string())
    }

    /// Merges adjacent text children and drops empty ones, recursively.
    pub fn compact(&self) -> Node {
        match self {
            Node::Element(element) => Node::Element(Element {
                tag: Rc::clone(&element.tag),
                attributes: element.attributes.clone(),
                children: compact_children(element.children.iter().map(Node::compact)),
            }),
            other => other.clone(),
        }
    }
}

/// Merges runs of text nodes and removes empty text nodes.
pub fn compact_children(children: impl IntoIterator<Item = Node>) -> Vec<Node> {
    let mut compacted: Vec<Node> = vec![];
    for child in children {
        match child {
            Node::Text(value) if value.is_empty() => {}
            Node::Text(value) => match compacted.last_mut() {
                Some(Node::Text(previous)) => {
                    *previous = Rc::from(format!("{}{}", previous, value));
                }
                _ => compacted.push(Node::Text(value)),
            },
            other => compacted.push(other),
        }
    }
    compacted
}

/// Builds [Node] trees. Escaping is left to whoever renders the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredBuilder;

impl Builder for StructuredBuilder {
    type Ast = Node;
    type Payload = Rc<str>;
    type Attr = NormalizedAttribute;

    fn text(&self, value: &str) -> Node {
        Node::text(value)
    }

    fn element(
        &self,
        tag: &str,
        attributes: &Attributes<AttributeValue>,
        children: Vec<Node>,
    ) -> Result<Node, RuntimeError> {
        check_element(tag, !children.is_empty())?;
        Ok(Node::Element(Element {
            tag: Rc::from(tag),
            attributes: self.attributes(attributes),
            children,
        }))
    }

    fn prerendered(&self, payload: Rc<str>) -> Node {
        Node::Prerendered(payload)
    }

    fn attribute_value(&self, raw: &AttributeValue) -> Option<NormalizedAttribute> {
        normalize_attribute(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, children: Vec<Node>) -> Node {
        StructuredBuilder
            .element(tag, &Attributes::new(), children)
            .unwrap()
    }

    #[test]
    fn test_render_nested() {
        let b = StructuredBuilder;
        let node = element(
            "div",
            vec![b.text("1"), element("span", vec![]), b.text("2")],
        );
        assert_eq!(node.to_html().unwrap(), "<div>1<span></span>2</div>");
    }

    #[test]
    fn test_void_element() {
        assert_eq!(element("br", vec![]).to_html().unwrap(), "<br>");
        let result = StructuredBuilder.element("br", &Attributes::new(), vec![Node::text("x")]);
        assert_eq!(result, Err(RuntimeError::VoidElement(Rc::from("br"))));
    }

    #[test]
    fn test_prerendered_is_not_escaped() {
        let node = element(
            "p",
            vec![
                StructuredBuilder.prerendered(Rc::from("<b>hi</b>")),
                Node::text("<b>"),
            ],
        );
        assert_eq!(node.to_html().unwrap(), "<p><b>hi</b>&lt;b&gt;</p>");
    }

    #[test]
    fn test_compact() {
        let node = element(
            "p",
            vec![
                Node::text("a"),
                Node::text(""),
                Node::text("b"),
                element("i", vec![Node::text("c"), Node::text("d")]),
                Node::text("e"),
            ],
        );
        let compacted = node.compact();
        assert_eq!(
            compacted,
            element(
                "p",
                vec![
                    Node::text("ab"),
                    element("i", vec![Node::text("cd")]),
                    Node::text("e"),
                ]
            )
        );
        assert_eq!(compacted.compact(), compacted);
        assert_eq!(compacted.to_html().unwrap(), node.to_html().unwrap());
    }
}
