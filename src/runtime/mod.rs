//! The runtime support module called by compiled programs.
//!
//! [module] returns the object generated code imports; [call_method] implements
//! the methods of builders, stream nodes and sinks.

pub mod convert;

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::stream::{Extension, RenderFn};
use crate::dom::structured::compact_children;
use crate::dom::{
    check_element, AnyNode, Builder, LeafKind, NormalizedAttribute, RawBuilder, Representation, Sink,
    StreamBuilder, StreamNode, StructuredBuilder,
};
use crate::error::RuntimeError;
use crate::eval::{call_function, Value};
use crate::introspect;
use crate::normalize::{
    escape_html, format_number, is_void_element, normalize_attribute, normalize_attributes,
    normalize_children, render_attributes, Child, SafeString,
};
use convert::{
    any_to_value, extension_to_value, node_to_value, normalized_to_value, raw_to_value,
    value_to_attribute, value_to_attributes, value_to_child, value_to_node,
};

/// The path compiled programs import the runtime support module from.
pub const MODULE_PATH: &str = "marklit/runtime";

/// The runtime support module object.
pub fn module() -> Value {
    Value::object([
        ("structured", Value::native("structured", structured)),
        ("stream", Value::native("stream", stream)),
        ("raw", Value::native("raw", raw)),
        (
            "normalizeChildren",
            Value::native("normalizeChildren", normalize_children_native),
        ),
        ("flattenCompact", Value::native("flattenCompact", flatten_compact)),
        ("escapeHTML", Value::native("escapeHTML", escape_html_native)),
        ("isVoidElement", Value::native("isVoidElement", is_void_element_native)),
        (
            "normalizeAttribute",
            Value::native("normalizeAttribute", normalize_attribute_native),
        ),
        (
            "normalizeAttributes",
            Value::native("normalizeAttributes", normalize_attributes_native),
        ),
        (
            "renderAttributes",
            Value::native("renderAttributes", render_attributes_native),
        ),
        ("addItems", Value::native("addItems", add_items)),
        ("safe", Value::native("safe", safe)),
        ("Fragment", Value::native("Fragment", fragment)),
        ("checkVoid", Value::native("checkVoid", check_void)),
    ])
}

fn structured(_: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Builder(Representation::Structured))
}

fn stream(_: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Builder(Representation::Stream))
}

fn raw(_: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Builder(Representation::Raw))
}

fn first(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Undefined)
}

/// `normalizeChildren(builder, ...children)`: the children as a flat list of nodes
/// of the builder's representation.
fn normalize_children_native(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut args = args.into_iter();
    let representation = match args.next() {
        Some(Value::Builder(representation)) => representation,
        other => {
            return Err(RuntimeError::type_error(format!(
                "normalizeChildren expects a builder, received {}",
                other.map_or("nothing", |v| v.type_name())
            )))
        }
    };
    Ok(Value::array(normalize_values(representation, args.collect())?))
}

/// `flattenCompact(...children)`: structured children, flattened with adjacent text
/// merged.
fn flatten_compact(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let children = narrow_values(&args, AnyNode::into_structured)?;
    let nodes = compact_children(normalize_children(&StructuredBuilder, children)?);
    Ok(Value::array(nodes.iter().map(node_to_value).collect()))
}

fn escape_html_native(args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::string(escape_html(&first(&args).to_string())))
}

fn is_void_element_native(args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(is_void_element(&first(&args).to_string())))
}

/// `normalizeAttribute(value)`: a string, `true`, or `null` when the attribute is
/// dropped.
fn normalize_attribute_native(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let normalized = normalize_attribute(&value_to_attribute(&first(&args)));
    Ok(match normalized {
        Some(NormalizedAttribute::True) => Value::Bool(true),
        Some(NormalizedAttribute::String(s)) => Value::String(s),
        None => Value::Null,
    })
}

fn normalize_attributes_native(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let attributes = value_to_attributes(&first(&args))?;
    Ok(normalized_to_value(&normalize_attributes(&attributes)))
}

fn render_attributes_native(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let attributes = value_to_attributes(&first(&args))?;
    Ok(Value::string(render_attributes(&attributes)))
}

/// `addItems(node, attributes, ...children)`.
fn add_items(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut args = args.into_iter();
    let target = args.next().unwrap_or(Value::Undefined);
    let node = value_to_node(&target).ok_or_else(|| {
        RuntimeError::type_error(format!(
            "addItems expects a node, received {}",
            target.type_name()
        ))
    })?;
    let attributes = value_to_attributes(&args.next().unwrap_or(Value::Undefined))?;
    let children = args.map(|child| value_to_child(&child)).collect();
    Ok(any_to_value(introspect::add_items(
        &node,
        &attributes,
        children,
    )?))
}

fn safe(args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Safe(SafeString::new(first(&args).to_string())))
}

/// `Fragment(props, ...children)`: the children, left for the parent to flatten.
fn fragment(args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::array(args.into_iter().skip(1).collect()))
}

/// `checkVoid(tag, children)`: whether a computed tag is void. Fails when the tag is
/// a macro name, or void with children.
fn check_void(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let tag = first(&args).to_string();
    let has_children = match args.get(1) {
        Some(Value::Array(children)) => !children.is_empty(),
        Some(Value::Undefined) | None => false,
        Some(_) => true,
    };
    check_element(&tag, has_children)?;
    Ok(Value::Bool(is_void_element(&tag)))
}

fn narrow_values<A, F>(values: &[Value], narrow: F) -> Result<Vec<Child<A>>, RuntimeError>
where
    F: Fn(AnyNode) -> Result<A, RuntimeError>,
{
    values
        .iter()
        .map(|value| value_to_child(value).try_map(&narrow))
        .collect()
}

fn normalize_values(
    representation: Representation,
    values: Vec<Value>,
) -> Result<Vec<Value>, RuntimeError> {
    Ok(match representation {
        Representation::Structured => {
            let children = narrow_values(&values, AnyNode::into_structured)?;
            normalize_children(&StructuredBuilder, children)?
                .iter()
                .map(node_to_value)
                .collect()
        }
        Representation::Stream => {
            let children = narrow_values(&values, AnyNode::into_stream)?;
            normalize_children(&StreamBuilder::default(), children)?
                .into_iter()
                .map(Value::Stream)
                .collect()
        }
        Representation::Raw => {
            let children = narrow_values(&values, AnyNode::into_raw)?;
            normalize_children(&RawBuilder, children)?
                .iter()
                .map(raw_to_value)
                .collect()
        }
    })
}

/// Writes into a sink value shared with generated code.
struct SharedSink(Rc<RefCell<String>>);

impl Sink for SharedSink {
    fn write(&mut self, chunk: &str) {
        self.0.borrow_mut().push_str(chunk);
    }

    fn shared_buffer(&self) -> Option<Rc<RefCell<String>>> {
        Some(Rc::clone(&self.0))
    }
}

/// Calls a method of a builder, stream node or sink value.
pub fn call_method(receiver: Value, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match (&receiver, name) {
        (Value::Builder(representation), _) => call_builder(*representation, name, args),
        (Value::Stream(node), "render") => match args.first() {
            Some(Value::Sink(buffer)) => {
                node.render(&mut SharedSink(Rc::clone(buffer)))?;
                Ok(Value::Undefined)
            }
            _ => Err(RuntimeError::type_error("render expects a sink")),
        },
        (Value::Sink(buffer), "write") => {
            buffer.borrow_mut().push_str(&first(&args).to_string());
            Ok(Value::Undefined)
        }
        _ => Err(RuntimeError::type_error(format!(
            "{} has no method {}",
            receiver.type_name(),
            name
        ))),
    }
}

fn call_builder(
    representation: Representation,
    name: &str,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match name {
        "text" => {
            let value = first(&args).to_string();
            Ok(match representation {
                Representation::Structured => node_to_value(&StructuredBuilder.text(&value)),
                Representation::Stream => Value::Stream(StreamBuilder::default().text(&value)),
                Representation::Raw => raw_to_value(&RawBuilder.text(&value)),
            })
        }
        "prerendered" => {
            let payload: Rc<str> = Rc::from(first(&args).to_string());
            Ok(match representation {
                Representation::Structured => {
                    node_to_value(&StructuredBuilder.prerendered(payload))
                }
                Representation::Stream => {
                    Value::Stream(StreamBuilder::default().prerendered(payload))
                }
                Representation::Raw => raw_to_value(&RawBuilder.prerendered(payload)),
            })
        }
        "element" => {
            let mut args = args.into_iter();
            let tag = match args.next() {
                Some(Value::String(tag)) => tag,
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "element expects a tag name, received {}",
                        other.map_or("nothing", |v| v.type_name())
                    )))
                }
            };
            let attributes = value_to_attributes(&args.next().unwrap_or(Value::Undefined))?;
            let children: Vec<Value> = args.collect();
            Ok(match representation {
                Representation::Structured => {
                    let children = narrow_values(&children, AnyNode::into_structured)?;
                    let children = normalize_children(&StructuredBuilder, children)?;
                    node_to_value(&StructuredBuilder.element(&tag, &attributes, children)?)
                }
                Representation::Stream => {
                    let builder = StreamBuilder::default();
                    let children = narrow_values(&children, AnyNode::into_stream)?;
                    let children = normalize_children(&builder, children)?;
                    Value::Stream(builder.element(&tag, &attributes, children)?)
                }
                Representation::Raw => {
                    let children = narrow_values(&children, AnyNode::into_raw)?;
                    let children = normalize_children(&RawBuilder, children)?;
                    raw_to_value(&RawBuilder.element(&tag, &attributes, children)?)
                }
            })
        }
        "leaf" if representation == Representation::Stream => {
            let mut args = args.into_iter();
            let render = args.next().unwrap_or(Value::Undefined);
            let kind = match args.next() {
                Some(Value::String(tag)) => LeafKind::Element(tag),
                _ => LeafKind::Text,
            };
            Ok(Value::Stream(StreamNode::leaf(leaf_render(render), kind)))
        }
        _ => Err(RuntimeError::type_error(format!(
            "the {} builder has no method {}",
            representation, name
        ))),
    }
}

/// Wraps a generated `(sink, ext) => {...}` function as a render function. Nested
/// leaves write straight into the buffer of the outermost one.
fn leaf_render(render: Value) -> RenderFn {
    Rc::new(
        move |sink: &mut dyn Sink, extension: &Extension| -> Result<(), RuntimeError> {
            if let Some(buffer) = sink.shared_buffer() {
                call_function(
                    &render,
                    vec![Value::Sink(buffer), extension_to_value(extension)],
                )?;
                return Ok(());
            }
            let buffer = Rc::new(RefCell::new(String::new()));
            call_function(
                &render,
                vec![
                    Value::Sink(Rc::clone(&buffer)),
                    extension_to_value(extension),
                ],
            )?;
            sink.write(&buffer.borrow());
            Ok(())
        },
    )
}

/// Renders a value the way a parent element would render it as a child.
pub fn render_value(value: &Value) -> Result<String, RuntimeError> {
    let mut html = String::new();
    push_rendered(value_to_child(value), &mut html)?;
    Ok(html)
}

fn push_rendered(child: Child<AnyNode>, html: &mut String) -> Result<(), RuntimeError> {
    match child {
        Child::Absent => {}
        Child::Text(value) => html.push_str(&escape_html(&value)),
        Child::Number(n) => html.push_str(&escape_html(&format_number(n))),
        Child::Safe(safe) => html.push_str(safe.as_str()),
        Child::List(items) => {
            for item in items {
                push_rendered(item, html)?;
            }
        }
        Child::Node(node) => html.push_str(&node.to_html()?),
        Child::Invalid(found) => return Err(RuntimeError::InvalidChild(found)),
    }
    Ok(())
}
