//! Conversions between evaluated values and document nodes.
//!
//! Structured nodes are objects `{ type: "element", tag, attributes, children }`,
//! `{ type: "text", value }` or `{ type: "prerendered", value }`. Raw nodes are
//! `{ type: "raw", value }`. Stream nodes stay native values.

use std::rc::Rc;

use crate::dom::stream::Extension;
use crate::dom::{
    AnyNode, AttributeValue, Attributes, Element, NormalizedAttribute, Node, RawNode,
};
use crate::error::RuntimeError;
use crate::eval::{Object, Value};
use crate::normalize::{normalize_attribute, Child};

pub fn node_to_value(node: &Node) -> Value {
    match node {
        Node::Text(value) => Value::object([
            ("type", Value::from("text")),
            ("value", Value::String(Rc::clone(value))),
        ]),
        Node::Prerendered(value) => Value::object([
            ("type", Value::from("prerendered")),
            ("value", Value::String(Rc::clone(value))),
        ]),
        Node::Element(element) => Value::object([
            ("type", Value::from("element")),
            ("tag", Value::String(Rc::clone(&element.tag))),
            ("attributes", normalized_to_value(&element.attributes)),
            (
                "children",
                Value::array(element.children.iter().map(node_to_value).collect()),
            ),
        ]),
    }
}

pub fn raw_to_value(node: &RawNode) -> Value {
    Value::object([
        ("type", Value::from("raw")),
        ("value", Value::String(Rc::clone(&node.value))),
    ])
}

pub fn any_to_value(node: AnyNode) -> Value {
    match node {
        AnyNode::Structured(node) => node_to_value(&node),
        AnyNode::Stream(node) => Value::Stream(node),
        AnyNode::Raw(node) => raw_to_value(&node),
    }
}

/// Recognizes a node of any representation. Returns `None` for other values.
pub fn value_to_node(value: &Value) -> Option<AnyNode> {
    match value {
        Value::Stream(node) => Some(AnyNode::Stream(node.clone())),
        Value::Object(fields) => match fields.get("type").and_then(Value::as_str)? {
            "raw" => Some(AnyNode::Raw(RawNode::new(string_field(fields, "value")?))),
            _ => structured_from_fields(fields).map(AnyNode::Structured),
        },
        _ => None,
    }
}

fn structured_from_fields(fields: &Object) -> Option<Node> {
    match fields.get("type").and_then(Value::as_str)? {
        "text" => Some(Node::Text(string_field(fields, "value")?)),
        "prerendered" => Some(Node::Prerendered(string_field(fields, "value")?)),
        "element" => {
            let attributes = match fields.get("attributes") {
                None | Some(Value::Undefined) | Some(Value::Null) => Attributes::new(),
                Some(Value::Object(attributes)) => attributes
                    .iter()
                    .filter_map(|(key, value)| {
                        normalize_attribute(&value_to_attribute(value))
                            .map(|value| (Rc::clone(key), value))
                    })
                    .collect(),
                Some(_) => return None,
            };
            let children = match fields.get("children") {
                None | Some(Value::Undefined) => vec![],
                Some(Value::Array(children)) => children
                    .iter()
                    .map(|child| match value_to_node(child)? {
                        AnyNode::Structured(node) => Some(node),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()?,
                Some(_) => return None,
            };
            Some(Node::Element(Element {
                tag: string_field(fields, "tag")?,
                attributes,
                children,
            }))
        }
        _ => None,
    }
}

fn string_field(fields: &Object, name: &str) -> Option<Rc<str>> {
    match fields.get(name)? {
        Value::String(s) => Some(Rc::clone(s)),
        _ => None,
    }
}

pub fn value_to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Undefined => AttributeValue::Undefined,
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::Number(*n),
        Value::String(s) => AttributeValue::String(Rc::clone(s)),
        other => AttributeValue::String(Rc::from(other.to_string())),
    }
}

pub fn attribute_to_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Undefined => Value::Undefined,
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Number(n) => Value::Number(*n),
        AttributeValue::String(s) => Value::String(Rc::clone(s)),
    }
}

/// Reads an attribute object. `undefined` and `null` are no attributes.
pub fn value_to_attributes(value: &Value) -> Result<Attributes<AttributeValue>, RuntimeError> {
    match value {
        Value::Undefined | Value::Null => Ok(Attributes::new()),
        Value::Object(fields) => Ok(fields
            .iter()
            .map(|(key, value)| (Rc::clone(key), value_to_attribute(value)))
            .collect()),
        other => Err(RuntimeError::type_error(format!(
            "attributes must be an object, received {}",
            other.type_name()
        ))),
    }
}

pub fn attributes_to_value(attributes: &Attributes<AttributeValue>) -> Value {
    Value::object(
        attributes
            .iter()
            .map(|(key, value)| (Rc::clone(key), attribute_to_value(value))),
    )
}

pub fn normalized_to_value(attributes: &Attributes<NormalizedAttribute>) -> Value {
    Value::object(attributes.iter().map(|(key, value)| {
        let value = match value {
            NormalizedAttribute::True => Value::Bool(true),
            NormalizedAttribute::String(s) => Value::String(Rc::clone(s)),
        };
        (Rc::clone(key), value)
    }))
}

/// Classifies a child value before normalization.
pub fn value_to_child(value: &Value) -> Child<AnyNode> {
    match value {
        Value::Undefined | Value::Null | Value::Bool(false) => Child::Absent,
        Value::String(s) => Child::Text(Rc::clone(s)),
        Value::Number(n) => Child::Number(*n),
        Value::Safe(html) => Child::Safe(html.clone()),
        Value::Array(items) => Child::List(items.iter().map(value_to_child).collect()),
        other => match value_to_node(other) {
            Some(node) => Child::Node(node),
            None => Child::Invalid(other.type_name()),
        },
    }
}

/// The `ext` argument of a generated stream render function. Absent slots are
/// `undefined`.
pub fn extension_to_value(extension: &Extension) -> Value {
    let attributes = match &extension.attributes {
        Some(attributes) => attributes_to_value(attributes),
        None => Value::Undefined,
    };
    let children = match &extension.children {
        Some(children) => Value::array(children.iter().cloned().map(Value::Stream).collect()),
        None => Value::Undefined,
    };
    Value::object([("attributes", attributes), ("children", children)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Builder, StructuredBuilder};
    use crate::normalize::SafeString;

    #[test]
    fn test_structured_values_round_trip() {
        let b = StructuredBuilder;
        let mut attributes = Attributes::new();
        attributes.insert(Rc::from("hidden"), AttributeValue::Bool(true));
        attributes.insert(Rc::from("class"), AttributeValue::from("a"));
        let node = b
            .element(
                "div",
                &attributes,
                vec![b.text("x"), b.prerendered(Rc::from("<b>y</b>"))],
            )
            .unwrap();
        match value_to_node(&node_to_value(&node)) {
            Some(AnyNode::Structured(back)) => assert_eq!(back, node),
            other => panic!("not recognized: {:?}", other),
        }
    }

    #[test]
    fn test_raw_value() {
        let value = Value::object([
            ("type", Value::from("raw")),
            ("value", Value::from("<p></p>")),
        ]);
        assert!(matches!(
            value_to_node(&value),
            Some(AnyNode::Raw(RawNode { ref value })) if value.as_ref() == "<p></p>"
        ));
    }

    #[test]
    fn test_children() {
        assert!(matches!(value_to_child(&Value::Bool(false)), Child::Absent));
        assert!(matches!(
            value_to_child(&Value::Bool(true)),
            Child::Invalid("boolean")
        ));
        assert!(matches!(
            value_to_child(&Value::object([("a", Value::Null)])),
            Child::Invalid("object")
        ));
        assert!(matches!(
            value_to_child(&Value::Safe(SafeString::new("<i>"))),
            Child::Safe(_)
        ));
        match value_to_child(&Value::array(vec![Value::from("a"), Value::from(1.0)])) {
            Child::List(items) => assert_eq!(items.len(), 2),
            other => panic!("not a list: {:?}", other),
        }
    }
}
