//! Code generation for elements that cannot be built at compile time.
//!
//! Every representation walks the same skeleton: open tag, attributes, children,
//! close tag. An [Emitter] decides what each step produces.

mod raw;
mod stream;
mod structured;

use std::rc::Rc;

use super::classify::{AttributeSet, Compiled, Tag};
use super::Context;
use crate::dom::Representation;
use crate::syntax::{BinaryOp, Expr, FunctionBody, Item};

pub trait Emitter {
    fn open(&mut self, ctx: &mut Context, tag: Tag);
    fn attributes(&mut self, ctx: &mut Context, attributes: AttributeSet);
    fn children(&mut self, ctx: &mut Context, children: Vec<Compiled>);
    fn close(&mut self, ctx: &mut Context);
    /// The expression that builds the element.
    fn finish(self, ctx: &mut Context) -> Expr;
}

fn walk<E: Emitter>(
    mut emitter: E,
    ctx: &mut Context,
    tag: Tag,
    attributes: AttributeSet,
    children: Vec<Compiled>,
) -> Expr {
    emitter.open(ctx, tag);
    emitter.attributes(ctx, attributes);
    emitter.children(ctx, children);
    emitter.close(ctx);
    emitter.finish(ctx)
}

/// Emits an element for the configured target.
pub fn emit_element(
    ctx: &mut Context,
    tag: Tag,
    attributes: AttributeSet,
    children: Vec<Compiled>,
) -> Expr {
    match ctx.config.target {
        Representation::Structured => walk(
            structured::StructuredEmitter::default(),
            ctx,
            tag,
            attributes,
            children,
        ),
        Representation::Stream => walk(
            stream::StreamEmitter::default(),
            ctx,
            tag,
            attributes,
            children,
        ),
        Representation::Raw => walk(raw::RawEmitter::default(), ctx, tag, attributes, children),
    }
}

/// `P.normalizeChildren(P.<representation>(), ...children)`.
pub fn normalize_children_call(
    ctx: &Context,
    representation: Representation,
    children: Vec<Compiled>,
) -> Expr {
    let mut args = vec![Item::Expr(ctx.builder(representation))];
    args.extend(children.into_iter().map(|child| Item::Expr(child.expr)));
    ctx.runtime_call("normalizeChildren", args)
}

/// Children as trailing call arguments: nothing, or a spread of the normalized list.
pub fn spread_children(
    ctx: &Context,
    representation: Representation,
    children: Vec<Compiled>,
) -> Vec<Item> {
    if children.is_empty() {
        return vec![];
    }
    vec![Item::Spread(normalize_children_call(
        ctx,
        representation,
        children,
    ))]
}

/// `((params) => body)(args)`: binds values once where generated code needs them
/// more than once.
pub fn bind(bindings: Vec<(Rc<str>, Expr)>, body: FunctionBody) -> Expr {
    let (params, args): (Vec<Rc<str>>, Vec<Expr>) = bindings.into_iter().unzip();
    let params: Vec<&str> = params.iter().map(|p| p.as_ref()).collect();
    Expr::call_with(Expr::arrow(&params, body), args)
}

/// `items.map((n) => n.value).join("")`.
pub fn join_values(ctx: &mut Context, items: Expr) -> Expr {
    let item = ctx.temp("n");
    let mapped = Expr::call_with(
        Expr::member(items, "map"),
        vec![Expr::arrow(
            &[item.as_ref()],
            FunctionBody::Expr(Expr::member(Expr::Identifier(Rc::clone(&item)), "value")),
        )],
    );
    Expr::call_with(Expr::member(mapped, "join"), vec![Expr::string("")])
}

/// `((_a) => _a === true ? " name" : _a === null ? "" : " name=\"" + P.escapeHTML(_a) + "\"")(P.normalizeAttribute(expr))`
pub fn render_dynamic_attribute(ctx: &mut Context, name: &str, expr: Expr) -> Expr {
    let value = ctx.temp("a");
    let reference = || Expr::Identifier(Rc::clone(&value));
    let escaped = ctx.runtime_call("escapeHTML", vec![Item::Expr(reference())]);
    let body = Expr::conditional(
        Expr::binary(BinaryOp::StrictEq, reference(), Expr::bool(true)),
        Expr::string(&format!(" {}", name)),
        Expr::conditional(
            Expr::binary(BinaryOp::StrictEq, reference(), Expr::null()),
            Expr::string(""),
            Expr::concat(vec![
                Expr::string(&format!(" {}=\"", name)),
                escaped,
                Expr::string("\""),
            ]),
        ),
    );
    let normalized = ctx.runtime_call("normalizeAttribute", vec![Item::Expr(expr)]);
    bind(vec![(Rc::clone(&value), normalized)], FunctionBody::Expr(body))
}

/// Adjacent constant strings of a concatenation, merged.
#[derive(Debug, Default)]
pub struct Segments {
    parts: Vec<Expr>,
    pending: String,
}

impl Segments {
    pub fn push_str(&mut self, s: &str) {
        self.pending.push_str(s);
    }

    pub fn push_expr(&mut self, expr: Expr) {
        self.flush();
        self.parts.push(expr);
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.parts.push(Expr::string(&pending));
        }
    }

    pub fn into_expr(mut self) -> Expr {
        self.flush();
        Expr::concat(self.parts)
    }
}
