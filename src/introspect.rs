//! Adding attributes and children to nodes that are already built.
//!
//! Nothing is mutated: structured elements are rebuilt, stream nodes are wrapped in a
//! patch, and raw nodes are rejected because they are already rendered.

use std::rc::Rc;

use crate::dom::stream::{attributes_patch, children_patch};
use crate::dom::{
    AnyNode, AttributeValue, Attributes, Element, LeafKind, Node, RawNode, Representation, StreamBuilder,
    StreamNode, StructuredBuilder,
};
use crate::error::RuntimeError;
use crate::normalize::{is_void_element, merge_attributes, normalize_attributes, normalize_children, Child};

pub trait Introspect: Sized {
    /// Returns a node with `attributes` merged over the existing ones and `children`
    /// appended after the existing children.
    fn add_items(
        &self,
        attributes: &Attributes<AttributeValue>,
        children: Vec<Child<Self>>,
    ) -> Result<Self, RuntimeError>;
}

impl Introspect for Node {
    fn add_items(
        &self,
        attributes: &Attributes<AttributeValue>,
        children: Vec<Child<Node>>,
    ) -> Result<Node, RuntimeError> {
        let element = match self {
            Node::Element(element) => element,
            Node::Text(_) => return Err(RuntimeError::NotAnElement),
            Node::Prerendered(_) => return Err(RuntimeError::Prerendered),
        };
        if is_void_element(&element.tag) {
            return Err(RuntimeError::VoidElement(Rc::clone(&element.tag)));
        }
        let mut merged_children = element.children.clone();
        merged_children.extend(normalize_children(&StructuredBuilder, children)?);
        Ok(Node::Element(Element {
            tag: Rc::clone(&element.tag),
            attributes: normalize_attributes(&merge_attributes(&element.attributes, attributes)),
            children: merged_children,
        }))
    }
}

impl Introspect for StreamNode {
    fn add_items(
        &self,
        attributes: &Attributes<AttributeValue>,
        children: Vec<Child<StreamNode>>,
    ) -> Result<StreamNode, RuntimeError> {
        if let LeafKind::Prerendered = self.kind() {
            return Err(RuntimeError::Prerendered);
        }
        let extra_attributes = attributes.clone();
        let extra_children = normalize_children(&StreamBuilder::default(), children)?;
        Ok(self.clone_with(
            attributes_patch(move |mut current| {
                for (key, value) in &extra_attributes {
                    current.insert(Rc::clone(key), value.clone());
                }
                current
            }),
            children_patch(move |mut current| {
                current.extend(extra_children.iter().cloned());
                current
            }),
        ))
    }
}

impl Introspect for RawNode {
    fn add_items(
        &self,
        _attributes: &Attributes<AttributeValue>,
        _children: Vec<Child<RawNode>>,
    ) -> Result<RawNode, RuntimeError> {
        Err(RuntimeError::Unsupported(Representation::Raw))
    }
}

/// [Introspect::add_items] for a node of any representation. Every child node must
/// have the representation of `node`.
pub fn add_items(
    node: &AnyNode,
    attributes: &Attributes<AttributeValue>,
    children: Vec<Child<AnyNode>>,
) -> Result<AnyNode, RuntimeError> {
    match node {
        AnyNode::Structured(node) => {
            let children = narrow(children, AnyNode::into_structured)?;
            Ok(AnyNode::Structured(node.add_items(attributes, children)?))
        }
        AnyNode::Stream(node) => {
            let children = narrow(children, AnyNode::into_stream)?;
            Ok(AnyNode::Stream(node.add_items(attributes, children)?))
        }
        AnyNode::Raw(node) => {
            let children = narrow(children, AnyNode::into_raw)?;
            Ok(AnyNode::Raw(node.add_items(attributes, children)?))
        }
    }
}

/// Converts child nodes to one representation, failing on nodes of any other.
pub fn narrow<A, F>(children: Vec<Child<AnyNode>>, f: F) -> Result<Vec<Child<A>>, RuntimeError>
where
    F: Fn(AnyNode) -> Result<A, RuntimeError>,
{
    children.into_iter().map(|child| child.try_map(&f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Builder, RawBuilder};

    fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes<AttributeValue> {
        pairs
            .iter()
            .map(|(key, value)| (Rc::from(*key), value.clone()))
            .collect()
    }

    fn structured_div() -> Node {
        let b = StructuredBuilder;
        b.element("div", &attrs(&[("id", "x".into())]), vec![b.text("a")])
            .unwrap()
    }

    fn stream_div() -> StreamNode {
        let b = StreamBuilder::default();
        b.element("div", &attrs(&[("id", "x".into())]), vec![b.text("a")])
            .unwrap()
    }

    #[test]
    fn test_add_text_to_empty_div() {
        let b = StructuredBuilder;
        let div = b.element("div", &Attributes::new(), vec![]).unwrap();
        let added = div
            .add_items(&Attributes::new(), vec![Child::from("hi")])
            .unwrap();
        assert_eq!(
            added,
            b.element("div", &Attributes::new(), vec![b.text("hi")])
                .unwrap()
        );
    }

    #[test]
    fn test_identity() {
        let node = structured_div();
        assert_eq!(node.add_items(&Attributes::new(), vec![]).unwrap(), node);

        let stream = stream_div();
        assert_eq!(
            stream
                .add_items(&Attributes::new(), vec![])
                .unwrap()
                .materialize()
                .unwrap(),
            stream.materialize().unwrap()
        );
    }

    #[test]
    fn test_composition_structured() {
        let a1 = attrs(&[("id", "y".into()), ("title", "t".into())]);
        let a2 = attrs(&[("title", AttributeValue::Bool(false)), ("hidden", true.into())]);
        let node = structured_div();
        let twice = node
            .add_items(&a1, vec![Child::from("b")])
            .unwrap()
            .add_items(&a2, vec![Child::from("c")])
            .unwrap();
        let mut merged = a1.clone();
        merged.extend(a2.clone());
        let once = node
            .add_items(&merged, vec![Child::from("b"), Child::from("c")])
            .unwrap();
        assert_eq!(twice.to_html().unwrap(), once.to_html().unwrap());
        assert_eq!(once.to_html().unwrap(), "<div id=\"y\" hidden>abc</div>");
    }

    #[test]
    fn test_composition_stream() {
        let a1 = attrs(&[("id", "y".into()), ("title", "t".into())]);
        let a2 = attrs(&[("title", AttributeValue::Bool(false)), ("hidden", true.into())]);
        let node = stream_div();
        let twice = node
            .add_items(&a1, vec![Child::from("b")])
            .unwrap()
            .add_items(&a2, vec![Child::from("c")])
            .unwrap();
        let mut merged = a1.clone();
        merged.extend(a2.clone());
        let once = node
            .add_items(&merged, vec![Child::from("b"), Child::from("c")])
            .unwrap();
        assert_eq!(twice.materialize().unwrap(), once.materialize().unwrap());
        assert_eq!(
            once.materialize().unwrap(),
            structured_div()
                .add_items(&merged, vec![Child::from("b"), Child::from("c")])
                .unwrap()
                .to_html()
                .unwrap()
        );
    }

    #[test]
    fn test_unsupported_targets() {
        let b = StructuredBuilder;
        assert_eq!(
            b.text("x").add_items(&Attributes::new(), vec![]),
            Err(RuntimeError::NotAnElement)
        );
        assert_eq!(
            b.prerendered(Rc::from("<b>")).add_items(&Attributes::new(), vec![]),
            Err(RuntimeError::Prerendered)
        );
        let br = b.element("br", &Attributes::new(), vec![]).unwrap();
        assert_eq!(
            br.add_items(&Attributes::new(), vec![]),
            Err(RuntimeError::VoidElement(Rc::from("br")))
        );
        let stream = StreamBuilder::default();
        let payload = stream.prerendered(Rc::from("<i>x</i>"));
        assert!(matches!(
            payload.add_items(&Attributes::new(), vec![]),
            Err(RuntimeError::Prerendered)
        ));
        let text = stream.text("x").add_items(&Attributes::new(), vec![]).unwrap();
        assert_eq!(text.materialize().unwrap(), "x");
        let text = stream.text("x").add_items(&Attributes::new(), vec![Child::from("y")]).unwrap();
        assert_eq!(text.materialize(), Err(RuntimeError::NotAnElement));

        let raw = RawBuilder.text("x");
        assert_eq!(
            raw.add_items(&Attributes::new(), vec![]),
            Err(RuntimeError::Unsupported(Representation::Raw))
        );
    }

    #[test]
    fn test_stream_void_fails_on_render() {
        let br = StreamBuilder::default()
            .element("br", &Attributes::new(), vec![])
            .unwrap();
        let patched = br.add_items(&Attributes::new(), vec![Child::from("x")]).unwrap();
        assert_eq!(
            patched.materialize(),
            Err(RuntimeError::VoidElement(Rc::from("br")))
        );
    }

    #[test]
    fn test_any_node_mismatch() {
        let node = AnyNode::Structured(structured_div());
        let child = AnyNode::Raw(RawBuilder.text("x"));
        let result = add_items(&node, &Attributes::new(), vec![Child::Node(child)]);
        assert_eq!(
            result.unwrap_err(),
            RuntimeError::RepresentationMismatch {
                expected: Representation::Structured,
                found: Representation::Raw,
            }
        );
    }
}
