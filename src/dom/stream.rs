//! The stream representation.
//!
//! A [StreamNode] is a render function that writes into a [Sink]. Nodes cannot be
//! edited once built, so adding items wraps a node in [StreamNode::Patched], which
//! holds a deferred patch of the extension attributes and children. Patches are
//! resolved innermost first every time the node renders.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::builder::{check_element, Builder};
use super::{AttributeValue, Attributes, NormalizedAttribute};
use crate::error::RuntimeError;
use crate::normalize::{
    escape_html, is_void_element, merge_attributes, normalize_attribute, render_attributes,
    render_normalized_attributes,
};

/// Receives rendered output.
pub trait Sink {
    fn write(&mut self, chunk: &str);

    /// The buffer behind a sink that generated code writes into, if this is one.
    fn shared_buffer(&self) -> Option<Rc<RefCell<String>>> {
        None
    }
}

impl Sink for String {
    fn write(&mut self, chunk: &str) {
        self.push_str(chunk);
    }
}

impl Sink for Vec<u8> {
    fn write(&mut self, chunk: &str) {
        self.extend_from_slice(chunk.as_bytes());
    }
}

/// Attributes and children attached to an element after it was built.
#[derive(Debug, Clone, Default)]
pub struct Extension {
    pub attributes: Option<Attributes<AttributeValue>>,
    pub children: Option<Vec<StreamNode>>,
}

pub type RenderFn = Rc<dyn Fn(&mut dyn Sink, &Extension) -> Result<(), RuntimeError>>;
pub type AttributesPatch = Rc<dyn Fn(Attributes<AttributeValue>) -> Attributes<AttributeValue>>;
pub type ChildrenPatch = Rc<dyn Fn(Vec<StreamNode>) -> Vec<StreamNode>>;
pub type PayloadRenderer = Rc<dyn Fn(&str, &mut dyn Sink) -> Result<(), RuntimeError>>;

pub fn attributes_patch(
    f: impl Fn(Attributes<AttributeValue>) -> Attributes<AttributeValue> + 'static,
) -> AttributesPatch {
    Rc::new(f)
}

pub fn children_patch(f: impl Fn(Vec<StreamNode>) -> Vec<StreamNode> + 'static) -> ChildrenPatch {
    Rc::new(f)
}

/// What a leaf's render function writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafKind {
    Text,
    Prerendered,
    Element(Rc<str>),
}

#[derive(Clone)]
pub enum StreamNode {
    Leaf { render: RenderFn, kind: LeafKind },
    /// `base` with patched extension attributes and children.
    Patched {
        base: Rc<StreamNode>,
        attributes: AttributesPatch,
        children: ChildrenPatch,
    },
}

struct Resolved {
    render: RenderFn,
    kind: LeafKind,
    extension: Extension,
}

impl StreamNode {
    pub fn leaf(render: RenderFn, kind: LeafKind) -> StreamNode {
        StreamNode::Leaf { render, kind }
    }

    /// The kind of the leaf under any patches.
    pub fn kind(&self) -> &LeafKind {
        match self {
            StreamNode::Leaf { kind, .. } => kind,
            StreamNode::Patched { base, .. } => base.kind(),
        }
    }

    /// Wraps this node with patches for its extension attributes and children. Never
    /// fails: a patch that cannot apply is reported when the node renders.
    pub fn clone_with(&self, attributes: AttributesPatch, children: ChildrenPatch) -> StreamNode {
        StreamNode::Patched {
            base: Rc::new(self.clone()),
            attributes,
            children,
        }
    }

    pub fn render(&self, sink: &mut dyn Sink) -> Result<(), RuntimeError> {
        let resolved = self.resolve()?;
        (resolved.render)(sink, &resolved.extension)
    }

    /// Renders into a fresh string.
    pub fn materialize(&self) -> Result<String, RuntimeError> {
        let mut out = String::new();
        self.render(&mut out)?;
        Ok(out)
    }

    fn resolve(&self) -> Result<Resolved, RuntimeError> {
        match self {
            StreamNode::Leaf { render, kind } => Ok(Resolved {
                render: Rc::clone(render),
                kind: kind.clone(),
                extension: Extension::default(),
            }),
            StreamNode::Patched {
                base,
                attributes,
                children,
            } => {
                let mut resolved = base.resolve()?;
                let extra_attributes =
                    attributes(resolved.extension.attributes.take().unwrap_or_default());
                let extra_children =
                    children(resolved.extension.children.take().unwrap_or_default());
                match &resolved.kind {
                    LeafKind::Prerendered => return Err(RuntimeError::Prerendered),
                    LeafKind::Text
                        if !extra_attributes.is_empty() || !extra_children.is_empty() =>
                    {
                        return Err(RuntimeError::NotAnElement);
                    }
                    LeafKind::Element(tag) if is_void_element(tag) => {
                        return Err(RuntimeError::VoidElement(Rc::clone(tag)));
                    }
                    _ => {}
                }
                resolved.extension = Extension {
                    attributes: Some(extra_attributes),
                    children: Some(extra_children),
                };
                Ok(resolved)
            }
        }
    }
}

impl fmt::Debug for StreamNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StreamNode::Leaf { kind, .. } => f.debug_struct("Leaf").field("kind", kind).finish(),
            StreamNode::Patched { base, .. } => {
                f.debug_struct("Patched").field("base", base).finish()
            }
        }
    }
}

/// Builds [StreamNode]s.
#[derive(Clone)]
pub struct StreamBuilder {
    render_prerendered: PayloadRenderer,
}

impl Default for StreamBuilder {
    fn default() -> Self {
        StreamBuilder {
            render_prerendered: Rc::new(
                |payload: &str, sink: &mut dyn Sink| -> Result<(), RuntimeError> {
                    sink.write(payload);
                    Ok(())
                },
            ),
        }
    }
}

impl StreamBuilder {
    /// A builder that renders prerendered payloads with `render`.
    pub fn with_prerendered(render: PayloadRenderer) -> StreamBuilder {
        StreamBuilder {
            render_prerendered: render,
        }
    }
}

impl Builder for StreamBuilder {
    type Ast = StreamNode;
    type Payload = Rc<str>;
    type Attr = NormalizedAttribute;

    fn text(&self, value: &str) -> StreamNode {
        let escaped = escape_html(value);
        StreamNode::leaf(
            Rc::new(
                move |sink: &mut dyn Sink, _: &Extension| -> Result<(), RuntimeError> {
                    sink.write(&escaped);
                    Ok(())
                },
            ),
            LeafKind::Text,
        )
    }

    fn element(
        &self,
        tag: &str,
        attributes: &Attributes<AttributeValue>,
        children: Vec<StreamNode>,
    ) -> Result<StreamNode, RuntimeError> {
        check_element(tag, !children.is_empty())?;
        let tag: Rc<str> = Rc::from(tag);
        let attributes = self.attributes(attributes);
        let void = is_void_element(&tag);
        let name = Rc::clone(&tag);
        let render: RenderFn = Rc::new(
            move |sink: &mut dyn Sink, extension: &Extension| -> Result<(), RuntimeError> {
                sink.write("<");
                sink.write(&name);
                match &extension.attributes {
                    None => sink.write(&render_normalized_attributes(&attributes)),
                    Some(extra) => {
                        sink.write(&render_attributes(&merge_attributes(&attributes, extra)))
                    }
                }
                sink.write(">");
                for child in children.iter().chain(extension.children.iter().flatten()) {
                    child.render(sink)?;
                }
                if !void {
                    sink.write("</");
                    sink.write(&name);
                    sink.write(">");
                }
                Ok(())
            },
        );
        Ok(StreamNode::leaf(render, LeafKind::Element(tag)))
    }

    fn prerendered(&self, payload: Rc<str>) -> StreamNode {
        let render_prerendered = Rc::clone(&self.render_prerendered);
        StreamNode::leaf(
            Rc::new(
                move |sink: &mut dyn Sink, _: &Extension| -> Result<(), RuntimeError> {
                    render_prerendered(&*payload, sink)
                },
            ),
            LeafKind::Prerendered,
        )
    }

    fn attribute_value(&self, raw: &AttributeValue) -> Option<NormalizedAttribute> {
        normalize_attribute(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{rebuild, Node, RawBuilder, StructuredBuilder};

    fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes<AttributeValue> {
        pairs
            .iter()
            .map(|(key, value)| (Rc::from(*key), value.clone()))
            .collect()
    }

    #[test]
    fn test_render_element() {
        let b = StreamBuilder::default();
        let node = b
            .element(
                "a",
                &attrs(&[("href", AttributeValue::from("/?a&b")), ("hidden", true.into())]),
                vec![b.text("<go>"), b.prerendered(Rc::from("<i>!</i>"))],
            )
            .unwrap();
        assert_eq!(node.kind(), &LeafKind::Element(Rc::from("a")));
        assert_eq!(
            node.materialize().unwrap(),
            "<a href=\"/?a&amp;b\" hidden>&lt;go&gt;<i>!</i></a>"
        );
    }

    #[test]
    fn test_render_into_bytes() {
        let b = StreamBuilder::default();
        let node = b.element("hr", &Attributes::new(), vec![]).unwrap();
        let mut bytes: Vec<u8> = vec![];
        node.render(&mut bytes).unwrap();
        assert_eq!(bytes, b"<hr>".to_vec());
    }

    #[test]
    fn test_injected_prerendered_renderer() {
        let b = StreamBuilder::with_prerendered(Rc::new(
            |payload: &str, sink: &mut dyn Sink| -> Result<(), RuntimeError> {
                sink.write("[");
                sink.write(payload);
                sink.write("]");
                Ok(())
            },
        ));
        let node = b.prerendered(Rc::from("x"));
        assert_eq!(node.materialize().unwrap(), "[x]");
    }

    #[test]
    fn test_matches_raw() {
        let s = StructuredBuilder;
        let tree = s
            .element(
                "ul",
                &attrs(&[("class", AttributeValue::from("list"))]),
                vec![
                    s.element("li", &Attributes::new(), vec![s.text("a & b")]).unwrap(),
                    s.element("li", &Attributes::new(), vec![Node::Prerendered(Rc::from("<br>"))])
                        .unwrap(),
                ],
            )
            .unwrap();
        let raw = rebuild(&tree, &RawBuilder).unwrap();
        let stream = rebuild(&tree, &StreamBuilder::default()).unwrap();
        assert_eq!(stream.materialize().unwrap(), raw.value.as_ref());
    }

    #[test]
    fn test_clone_of_text_fails_lazily() {
        let b = StreamBuilder::default();
        let text = b.text("hi");
        let extra = b.text("there");
        let patched = text.clone_with(
            attributes_patch(|attributes| attributes),
            children_patch(move |mut children| {
                children.push(extra.clone());
                children
            }),
        );
        assert_eq!(patched.materialize(), Err(RuntimeError::NotAnElement));

        let identity = text.clone_with(attributes_patch(|a| a), children_patch(|c| c));
        assert_eq!(identity.materialize().unwrap(), "hi");
    }

    #[test]
    fn test_clone_overrides_attributes() {
        let b = StreamBuilder::default();
        let node = b
            .element(
                "div",
                &attrs(&[("id", "a".into()), ("class", "x".into())]),
                vec![b.text("1")],
            )
            .unwrap();
        let first = b.text("2");
        let patched = node.clone_with(
            attributes_patch(|mut attributes| {
                attributes.insert(Rc::from("id"), AttributeValue::from("b"));
                attributes
            }),
            children_patch(move |mut children| {
                children.push(first.clone());
                children
            }),
        );
        let second = b.text("3");
        let twice = patched.clone_with(
            attributes_patch(|mut attributes| {
                attributes.insert(Rc::from("class"), AttributeValue::Bool(false));
                attributes
            }),
            children_patch(move |mut children| {
                children.push(second.clone());
                children
            }),
        );
        assert_eq!(patched.materialize().unwrap(), "<div id=\"b\" class=\"x\">12</div>");
        assert_eq!(twice.materialize().unwrap(), "<div id=\"b\">123</div>");
        assert_eq!(node.materialize().unwrap(), "<div id=\"a\" class=\"x\">1</div>");
    }
}
