//! Static and dynamic classification of tags, attributes, children and text.

use std::collections::HashSet;
use std::rc::Rc;

use crate::dom::{AttributeValue, Attributes, Node, RawNode};
use crate::syntax::{Expr, Literal, Property};

/// An element tag after classification. Macro tags never get here.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Static(Rc<str>),
    Dynamic(Expr),
}

/// A subtree built at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum Reified {
    Structured(Node),
    Raw(RawNode),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Only known at run time.
    Dynamic,
    /// A text child, before escaping.
    Text(Rc<str>),
    /// A constant subtree.
    Reified(Reified),
}

/// The expression a markup node compiled to, tagged with what is known about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub expr: Expr,
    pub shape: Shape,
}

impl Compiled {
    pub fn dynamic(expr: Expr) -> Compiled {
        Compiled {
            expr,
            shape: Shape::Dynamic,
        }
    }

    pub fn text(value: &str) -> Compiled {
        Compiled {
            expr: Expr::string(value),
            shape: Shape::Text(Rc::from(value)),
        }
    }

    pub fn is_static(&self) -> bool {
        !matches!(self.shape, Shape::Dynamic)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// A value known at compile time.
    Static(Rc<str>, AttributeValue),
    Dynamic(Rc<str>, Expr),
    Spread(Expr),
}

/// The attributes of one element, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    pub attributes: Vec<Attribute>,
}

impl AttributeSet {
    pub fn is_static(&self) -> bool {
        self.attributes
            .iter()
            .all(|attribute| matches!(attribute, Attribute::Static(..)))
    }

    /// Whether attributes must be merged at run time rather than rendered one by one:
    /// a spread or a repeated name lets a later attribute replace an earlier one.
    pub fn needs_merge(&self) -> bool {
        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            match attribute {
                Attribute::Spread(_) => return true,
                Attribute::Static(name, _) | Attribute::Dynamic(name, _) => {
                    if !seen.insert(Rc::clone(name)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// The compile-time values, later names replacing earlier ones. `None` when any
    /// attribute is dynamic.
    pub fn static_values(&self) -> Option<Attributes<AttributeValue>> {
        let mut values = Attributes::new();
        for attribute in &self.attributes {
            match attribute {
                Attribute::Static(name, value) => {
                    values.insert(Rc::clone(name), value.clone());
                }
                _ => return None,
            }
        }
        Some(values)
    }

    /// The attributes as an object literal of their unnormalized values.
    pub fn to_object(&self) -> Expr {
        Expr::Object(
            self.attributes
                .iter()
                .map(|attribute| match attribute {
                    Attribute::Static(name, value) => {
                        Property::KeyValue(Rc::clone(name), attribute_literal(value))
                    }
                    Attribute::Dynamic(name, expr) => {
                        Property::KeyValue(Rc::clone(name), expr.clone())
                    }
                    Attribute::Spread(expr) => Property::Spread(expr.clone()),
                })
                .collect(),
        )
    }
}

/// The value of an attribute expression, when it is a literal.
pub fn static_value(expr: &Expr) -> Option<AttributeValue> {
    match expr {
        Expr::Literal(Literal::String { value, .. }) => Some(AttributeValue::String(Rc::clone(value))),
        Expr::Literal(Literal::Number(n)) => Some(AttributeValue::Number(*n)),
        Expr::Literal(Literal::Bool(b)) => Some(AttributeValue::Bool(*b)),
        Expr::Literal(Literal::Null) => Some(AttributeValue::Null),
        Expr::Literal(Literal::Undefined) => Some(AttributeValue::Undefined),
        _ => None,
    }
}

pub fn attribute_literal(value: &AttributeValue) -> Expr {
    match value {
        AttributeValue::String(s) => Expr::string(s),
        AttributeValue::Number(n) => Expr::number(*n),
        AttributeValue::Bool(b) => Expr::bool(*b),
        AttributeValue::Null => Expr::null(),
        AttributeValue::Undefined => Expr::undefined(),
    }
}

/// Collapses the whitespace of a text child: lines are trimmed where they meet a
/// line break, blank lines are dropped and the rest are joined with single spaces.
pub fn normalize_text(text: &str) -> String {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let last = lines.len() - 1;
    let mut result = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut line = *line;
        if i > 0 {
            line = line.trim_start_matches(is_blank);
        }
        if i < last {
            line = line.trim_end_matches(is_blank);
        }
        if line.is_empty() {
            continue;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(line);
    }
    result
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}
