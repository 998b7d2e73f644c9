use log::trace;

use super::{spread_children, Emitter};
use crate::compiler::classify::{AttributeSet, Compiled, Reified, Shape, Tag};
use crate::compiler::reify::{normalized_literal, object, structured_literal};
use crate::compiler::Context;
use crate::dom::structured::compact_children;
use crate::dom::{Builder, Representation, StructuredBuilder};
use crate::normalize::normalize_attributes;
use crate::syntax::{Expr, Item};

/// Static tags become an element object literal with whatever parts are constant
/// written out. Computed tags go through the structured builder.
#[derive(Debug, Default)]
pub struct StructuredEmitter {
    tag: Option<Tag>,
    attributes: Option<Expr>,
    children: Vec<Item>,
    /// Dynamic children of a static tag, flattened at run time.
    flattened: Option<Expr>,
}

impl Emitter for StructuredEmitter {
    fn open(&mut self, _ctx: &mut Context, tag: Tag) {
        self.tag = Some(tag);
    }

    fn attributes(&mut self, ctx: &mut Context, attributes: AttributeSet) {
        let expr = match (&self.tag, attributes.static_values()) {
            (Some(Tag::Static(_)), Some(values)) => {
                normalized_literal(&normalize_attributes(&values))
            }
            (Some(Tag::Static(_)), None) => {
                ctx.runtime_call("normalizeAttributes", vec![Item::Expr(attributes.to_object())])
            }
            _ => attributes.to_object(),
        };
        self.attributes = Some(expr);
    }

    fn children(&mut self, ctx: &mut Context, children: Vec<Compiled>) {
        if let Some(Tag::Dynamic(_)) = self.tag {
            self.children = spread_children(ctx, Representation::Structured, children);
            return;
        }
        if children.iter().all(Compiled::is_static) {
            trace!("constant children");
            let mut nodes = Vec::with_capacity(children.len());
            for child in &children {
                match &child.shape {
                    Shape::Text(value) => nodes.push(StructuredBuilder.text(value)),
                    Shape::Reified(Reified::Structured(node)) => nodes.push(node.clone()),
                    _ => {}
                }
            }
            self.children = compact_children(nodes)
                .iter()
                .map(|node| Item::Expr(structured_literal(node)))
                .collect();
        } else {
            let args = children.into_iter().map(|child| Item::Expr(child.expr)).collect();
            self.flattened = Some(ctx.runtime_call("flattenCompact", args));
        }
    }

    fn close(&mut self, _ctx: &mut Context) {}

    fn finish(self, ctx: &mut Context) -> Expr {
        let attributes = self.attributes.unwrap_or_else(|| Expr::Object(vec![]));
        match self.tag {
            Some(Tag::Dynamic(tag)) => {
                let mut args = vec![Item::Expr(tag), Item::Expr(attributes)];
                args.extend(self.children);
                Expr::call(
                    Expr::member(ctx.builder(Representation::Structured), "element"),
                    args,
                )
            }
            Some(Tag::Static(tag)) => object(vec![
                ("type", Expr::string("element")),
                ("tag", Expr::string(&tag)),
                ("attributes", attributes),
                (
                    "children",
                    self.flattened.unwrap_or(Expr::Array(self.children)),
                ),
            ]),
            None => Expr::undefined(),
        }
    }
}
