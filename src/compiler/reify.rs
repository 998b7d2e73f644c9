//! Builds constant subtrees at compile time and writes them out as literals.

use log::trace;
use std::rc::Rc;

use super::classify::{Compiled, Reified, Shape};
use crate::dom::{
    AttributeValue, Attributes, Builder, NormalizedAttribute, Node, RawBuilder, RawNode,
    Representation, StructuredBuilder,
};
use crate::error::CompileError;
use crate::syntax::{Expr, Item, Property};

/// Builds a static element with the builder of `target`. Every child must be static.
pub fn reify_element(
    target: Representation,
    tag: &str,
    attributes: &Attributes<AttributeValue>,
    children: &[Compiled],
) -> Result<Option<Reified>, CompileError> {
    let reified = match target {
        Representation::Structured => {
            let mut nodes = Vec::with_capacity(children.len());
            for child in children {
                match &child.shape {
                    Shape::Text(value) => nodes.push(StructuredBuilder.text(value)),
                    Shape::Reified(Reified::Structured(node)) => nodes.push(node.clone()),
                    _ => return Ok(None),
                }
            }
            let node = StructuredBuilder
                .element(tag, attributes, nodes)
                .map_err(CompileError::Reify)?;
            Reified::Structured(node.compact())
        }
        Representation::Raw => {
            let mut nodes = Vec::with_capacity(children.len());
            for child in children {
                match &child.shape {
                    Shape::Text(value) => nodes.push(RawBuilder.text(value)),
                    Shape::Reified(Reified::Raw(node)) => nodes.push(node.clone()),
                    _ => return Ok(None),
                }
            }
            Reified::Raw(
                RawBuilder
                    .element(tag, attributes, nodes)
                    .map_err(CompileError::Reify)?,
            )
        }
        Representation::Stream => return Ok(None),
    };
    trace!("reified <{}>", tag);
    Ok(Some(reified))
}

/// The literal that evaluates to `reified`.
pub fn literal(reified: &Reified) -> Expr {
    match reified {
        Reified::Structured(node) => structured_literal(node),
        Reified::Raw(node) => raw_literal(node),
    }
}

pub fn structured_literal(node: &Node) -> Expr {
    match node {
        Node::Text(value) => object(vec![("type", Expr::string("text")), ("value", Expr::string(value))]),
        Node::Prerendered(value) => object(vec![
            ("type", Expr::string("prerendered")),
            ("value", Expr::string(value)),
        ]),
        Node::Element(element) => object(vec![
            ("type", Expr::string("element")),
            ("tag", Expr::string(&element.tag)),
            ("attributes", normalized_literal(&element.attributes)),
            (
                "children",
                Expr::Array(
                    element
                        .children
                        .iter()
                        .map(|child| Item::Expr(structured_literal(child)))
                        .collect(),
                ),
            ),
        ]),
    }
}

pub fn raw_literal(node: &RawNode) -> Expr {
    object(vec![
        ("type", Expr::string("raw")),
        ("value", Expr::string(&node.value)),
    ])
}

pub fn normalized_literal(attributes: &Attributes<NormalizedAttribute>) -> Expr {
    Expr::Object(
        attributes
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    NormalizedAttribute::True => Expr::bool(true),
                    NormalizedAttribute::String(s) => Expr::string(s),
                };
                Property::KeyValue(Rc::clone(key), value)
            })
            .collect(),
    )
}

pub fn object(fields: Vec<(&str, Expr)>) -> Expr {
    Expr::Object(
        fields
            .into_iter()
            .map(|(key, value)| Property::KeyValue(Rc::from(key), value))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{evaluate, Scope};
    use crate::runtime::convert::value_to_node;
    use crate::dom::AnyNode;

    fn attributes(pairs: &[(&str, AttributeValue)]) -> Attributes<AttributeValue> {
        pairs
            .iter()
            .map(|(key, value)| (Rc::from(*key), value.clone()))
            .collect()
    }

    #[test]
    fn test_structured_literal_evaluates_to_node() {
        let children = vec![Compiled::text("a"), Compiled::text("b")];
        let reified = reify_element(
            Representation::Structured,
            "p",
            &attributes(&[("class", "y".into()), ("hidden", AttributeValue::Null)]),
            &children,
        )
        .unwrap()
        .unwrap();
        let node = match &reified {
            Reified::Structured(node) => node.clone(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(node.to_html().unwrap(), "<p class=\"y\">ab</p>");

        let value = evaluate(&literal(&reified), &Scope::global()).unwrap();
        match value_to_node(&value) {
            Some(AnyNode::Structured(back)) => assert_eq!(back, node),
            other => panic!("not a structured node: {:?}", other),
        }
    }

    #[test]
    fn test_raw_reification() {
        let inner = reify_element(Representation::Raw, "b", &Attributes::new(), &[Compiled::text("<")])
            .unwrap()
            .unwrap();
        let outer = reify_element(
            Representation::Raw,
            "div",
            &Attributes::new(),
            &[Compiled {
                expr: literal(&inner),
                shape: Shape::Reified(inner.clone()),
            }],
        )
        .unwrap();
        assert_eq!(
            outer,
            Some(Reified::Raw(RawNode::new("<div><b>&lt;</b></div>")))
        );
    }

    #[test]
    fn test_dynamic_children_are_not_reified() {
        let children = vec![Compiled::dynamic(Expr::ident("x"))];
        assert_eq!(
            reify_element(Representation::Raw, "div", &Attributes::new(), &children),
            Ok(None)
        );
        assert_eq!(
            reify_element(Representation::Stream, "div", &Attributes::new(), &[]),
            Ok(None)
        );
    }
}
