//! Attribute and child normalization, escaping and the void element table.

use lazy_static::lazy_static;
use std::collections::HashSet;
use std::rc::Rc;

use crate::dom::{AttributeValue, Attributes, Builder, NormalizedAttribute};
use crate::error::RuntimeError;

lazy_static! {
    static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
        "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect();
}

/// Whether `tag` may never have children.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(tag)
}

/// Whether `name` names a macro rather than an element.
pub fn is_macro_name(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}

/// Replaces `& < > " '` with their entities.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Formats a number the way string concatenation in generated code does: integral
/// values print without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{:.0}", n);
    }
    format!("{}", n)
}

/// `true` survives, `false`, `null` and `undefined` drop, strings are kept and
/// numbers are stringified.
pub fn normalize_attribute(value: &AttributeValue) -> Option<NormalizedAttribute> {
    match value {
        AttributeValue::Bool(true) => Some(NormalizedAttribute::True),
        AttributeValue::Bool(false) | AttributeValue::Null | AttributeValue::Undefined => None,
        AttributeValue::String(s) => Some(NormalizedAttribute::String(Rc::clone(s))),
        AttributeValue::Number(n) => Some(NormalizedAttribute::String(Rc::from(format_number(*n)))),
    }
}

pub fn normalize_attributes(attributes: &Attributes<AttributeValue>) -> Attributes<NormalizedAttribute> {
    attributes
        .iter()
        .filter_map(|(key, value)| normalize_attribute(value).map(|v| (Rc::clone(key), v)))
        .collect()
}

/// Renders one normalized attribute with its leading space.
pub fn render_attribute(key: &str, value: &NormalizedAttribute) -> String {
    match value {
        NormalizedAttribute::True => format!(" {}", key),
        NormalizedAttribute::String(s) => format!(" {}=\"{}\"", key, escape_html(s)),
    }
}

pub fn render_normalized_attributes(attributes: &Attributes<NormalizedAttribute>) -> String {
    attributes
        .iter()
        .map(|(key, value)| render_attribute(key, value))
        .collect()
}

pub fn render_attributes(attributes: &Attributes<AttributeValue>) -> String {
    render_normalized_attributes(&normalize_attributes(attributes))
}

/// Merges `extra` over `base`. Keys of `extra` replace those of `base` in place, so a
/// `false` in `extra` removes the attribute once the result is normalized.
pub fn merge_attributes(
    base: &Attributes<NormalizedAttribute>,
    extra: &Attributes<AttributeValue>,
) -> Attributes<AttributeValue> {
    let mut merged: Attributes<AttributeValue> = base
        .iter()
        .map(|(key, value)| (Rc::clone(key), AttributeValue::from(value.clone())))
        .collect();
    for (key, value) in extra {
        merged.insert(Rc::clone(key), value.clone());
    }
    merged
}

/// A string that is already HTML and is written out without escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeString(Rc<str>);

impl SafeString {
    pub fn new(html: impl Into<Rc<str>>) -> SafeString {
        SafeString(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A child value handed to an element before normalization.
#[derive(Debug, Clone)]
pub enum Child<A> {
    /// `undefined`, `null` or `false`. Dropped.
    Absent,
    /// A string, escaped on output.
    Text(Rc<str>),
    /// A number, stringified and escaped on output.
    Number(f64),
    /// Pre-escaped content.
    Safe(SafeString),
    /// A nested list, flattened in place.
    List(Vec<Child<A>>),
    /// An already built node.
    Node(A),
    /// Anything else. Holds the type name used in the error.
    Invalid(&'static str),
}

impl<A> Child<A> {
    /// Converts the nodes of this child, keeping its shape.
    pub fn try_map<B, F>(self, f: &F) -> Result<Child<B>, RuntimeError>
    where
        F: Fn(A) -> Result<B, RuntimeError>,
    {
        Ok(match self {
            Child::Absent => Child::Absent,
            Child::Text(s) => Child::Text(s),
            Child::Number(n) => Child::Number(n),
            Child::Safe(s) => Child::Safe(s),
            Child::List(items) => Child::List(
                items
                    .into_iter()
                    .map(|item| item.try_map(f))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Child::Node(node) => Child::Node(f(node)?),
            Child::Invalid(found) => Child::Invalid(found),
        })
    }
}

impl<A> From<&str> for Child<A> {
    fn from(value: &str) -> Self {
        Child::Text(Rc::from(value))
    }
}

/// Flattens `children` into a list of nodes built with `builder`.
pub fn normalize_children<B: Builder>(
    builder: &B,
    children: Vec<Child<B::Ast>>,
) -> Result<Vec<B::Ast>, RuntimeError> {
    let mut nodes = Vec::with_capacity(children.len());
    push_children(builder, children, &mut nodes)?;
    Ok(nodes)
}

fn push_children<B: Builder>(
    builder: &B,
    children: Vec<Child<B::Ast>>,
    nodes: &mut Vec<B::Ast>,
) -> Result<(), RuntimeError> {
    for child in children {
        match child {
            Child::Absent => {}
            Child::Text(value) => nodes.push(builder.content(&value, true)),
            Child::Number(n) => nodes.push(builder.content(&format_number(n), true)),
            Child::Safe(html) => nodes.push(builder.content(html.as_str(), false)),
            Child::List(items) => push_children(builder, items, nodes)?,
            Child::Node(node) => nodes.push(node),
            Child::Invalid(found) => return Err(RuntimeError::InvalidChild(found)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Node, RawBuilder, StructuredBuilder};

    macro_rules! attrs {
        ($($key:expr => $value:expr),* $(,)?) => {
            {
                let mut attributes: Attributes<AttributeValue> = Attributes::new();
                $(attributes.insert(Rc::from($key), $value);)*
                attributes
            }
        };
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">'&amp;'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(-42.0), "-42");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(-1e20), "-100000000000000000000");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_void_elements() {
        for tag in ["br", "img", "keygen", "wbr"] {
            assert!(is_void_element(tag), "{} should be void", tag);
        }
        assert!(!is_void_element("div"));
        assert!(!is_void_element("BR"));
    }

    #[test]
    fn test_normalize_attribute() {
        assert_eq!(
            normalize_attribute(&AttributeValue::Bool(true)),
            Some(NormalizedAttribute::True)
        );
        assert_eq!(normalize_attribute(&AttributeValue::Bool(false)), None);
        assert_eq!(normalize_attribute(&AttributeValue::Null), None);
        assert_eq!(normalize_attribute(&AttributeValue::Undefined), None);
        assert_eq!(
            normalize_attribute(&AttributeValue::Number(3.0)),
            Some(NormalizedAttribute::String(Rc::from("3")))
        );
        assert_eq!(
            normalize_attribute(&AttributeValue::Number(1.5)),
            Some(NormalizedAttribute::String(Rc::from("1.5")))
        );
    }

    #[test]
    fn test_normalize_attribute_is_idempotent() {
        let values = vec![
            AttributeValue::Bool(true),
            AttributeValue::Bool(false),
            AttributeValue::Null,
            AttributeValue::Undefined,
            AttributeValue::Number(-2.0),
            AttributeValue::from("x"),
            AttributeValue::from(""),
        ];
        for value in values {
            let once = normalize_attribute(&value);
            let twice = once
                .clone()
                .and_then(|n| normalize_attribute(&AttributeValue::from(n)));
            assert_eq!(once, twice, "normalizing {:?} twice", value);
        }
    }

    #[test]
    fn test_render_attributes() {
        let attributes = attrs! {
            "disabled" => AttributeValue::Bool(true),
            "class" => AttributeValue::Null,
            "id" => AttributeValue::Undefined,
            "data-foo" => AttributeValue::Bool(false),
            "data-bar" => AttributeValue::from("<>\""),
            "data-test" => AttributeValue::from("test"),
        };
        assert_eq!(
            render_attributes(&attributes),
            " disabled data-bar=\"&lt;&gt;&quot;\" data-test=\"test\""
        );
    }

    #[test]
    fn test_merge_attributes_overrides_in_place() {
        let base = normalize_attributes(&attrs! {
            "id" => AttributeValue::from("a"),
            "hidden" => AttributeValue::Bool(true),
            "class" => AttributeValue::from("x"),
        });
        let merged = merge_attributes(
            &base,
            &attrs! {
                "id" => AttributeValue::from("b"),
                "hidden" => AttributeValue::Bool(false),
                "title" => AttributeValue::from("t"),
            },
        );
        assert_eq!(
            render_attributes(&merged),
            " id=\"b\" class=\"x\" title=\"t\""
        );
    }

    #[test]
    fn test_normalize_children_flattens() {
        let children: Vec<Child<Node>> = vec![
            Child::Absent,
            Child::from("a<"),
            Child::List(vec![
                Child::Number(1.0),
                Child::List(vec![Child::Safe(SafeString::new("<b>"))]),
            ]),
            Child::Node(Node::Text(Rc::from("z"))),
        ];
        let nodes = normalize_children(&StructuredBuilder, children).unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text(Rc::from("a<")),
                Node::Text(Rc::from("1")),
                Node::Prerendered(Rc::from("<b>")),
                Node::Text(Rc::from("z")),
            ]
        );
    }

    #[test]
    fn test_normalize_children_escapes_for_raw() {
        let nodes = normalize_children(
            &RawBuilder,
            vec![Child::from("<i>"), Child::Safe(SafeString::new("<i>"))],
        )
        .unwrap();
        let values: Vec<&str> = nodes.iter().map(|n| n.value.as_ref()).collect();
        assert_eq!(values, vec!["&lt;i&gt;", "<i>"]);
    }

    #[test]
    fn test_normalize_children_rejects_invalid() {
        let result = normalize_children::<StructuredBuilder>(
            &StructuredBuilder,
            vec![Child::List(vec![Child::Invalid("boolean")])],
        );
        assert_eq!(result, Err(RuntimeError::InvalidChild("boolean")));
    }
}
