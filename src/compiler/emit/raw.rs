use std::rc::Rc;

use super::{bind, join_values, normalize_children_call, render_dynamic_attribute, Emitter, Segments};
use crate::compiler::classify::{Attribute, AttributeSet, Compiled, Reified, Shape, Tag};
use crate::compiler::reify::object;
use crate::compiler::Context;
use crate::dom::Representation;
use crate::normalize::{escape_html, is_void_element, normalize_attribute, render_attribute};
use crate::syntax::{Expr, FunctionBody, Item};

/// Builds the element's HTML as one string concatenation, with every constant part
/// rendered ahead of time.
#[derive(Debug, Default)]
pub struct RawEmitter {
    segments: Segments,
    tag: Option<Tag>,
    /// For computed tags: the names the tag and the children are bound to.
    bindings: Vec<(Rc<str>, Expr)>,
    children: Option<Expr>,
}

impl RawEmitter {
    fn tag_name(&self) -> Option<Expr> {
        match self.bindings.first() {
            Some((name, _)) => Some(Expr::Identifier(Rc::clone(name))),
            None => None,
        }
    }
}

impl Emitter for RawEmitter {
    fn open(&mut self, ctx: &mut Context, tag: Tag) {
        match &tag {
            Tag::Static(name) => {
                self.segments.push_str("<");
                self.segments.push_str(name);
            }
            Tag::Dynamic(expr) => {
                let name = ctx.temp("t");
                self.segments.push_str("<");
                self.segments.push_expr(Expr::Identifier(Rc::clone(&name)));
                self.bindings.push((name, expr.clone()));
            }
        }
        self.tag = Some(tag);
    }

    fn attributes(&mut self, ctx: &mut Context, attributes: AttributeSet) {
        if attributes.needs_merge() {
            self.segments.push_expr(
                ctx.runtime_call("renderAttributes", vec![Item::Expr(attributes.to_object())]),
            );
        } else {
            for attribute in attributes.attributes {
                match attribute {
                    Attribute::Static(name, value) => {
                        if let Some(value) = normalize_attribute(&value) {
                            self.segments.push_str(&render_attribute(&name, &value));
                        }
                    }
                    Attribute::Dynamic(name, expr) => {
                        let rendered = render_dynamic_attribute(ctx, &name, expr);
                        self.segments.push_expr(rendered);
                    }
                    Attribute::Spread(_) => {}
                }
            }
        }
        self.segments.push_str(">");
    }

    fn children(&mut self, ctx: &mut Context, children: Vec<Compiled>) {
        if let Some(Tag::Dynamic(_)) = self.tag {
            let name = ctx.temp("c");
            self.bindings.push((
                Rc::clone(&name),
                normalize_children_call(ctx, Representation::Raw, children),
            ));
            self.children = Some(Expr::Identifier(name));
            return;
        }
        for child in children {
            match child.shape {
                Shape::Text(value) => self.segments.push_str(&escape_html(&value)),
                Shape::Reified(Reified::Raw(node)) => self.segments.push_str(&node.value),
                _ => {
                    let normalized =
                        normalize_children_call(ctx, Representation::Raw, vec![child]);
                    let joined = join_values(ctx, normalized);
                    self.segments.push_expr(joined);
                }
            }
        }
    }

    fn close(&mut self, ctx: &mut Context) {
        match &self.tag {
            Some(Tag::Static(name)) => {
                if !is_void_element(name) {
                    self.segments.push_str(&format!("</{}>", name));
                }
            }
            Some(Tag::Dynamic(_)) => {
                let (tag, children) = match (self.tag_name(), self.children.clone()) {
                    (Some(tag), Some(children)) => (tag, children),
                    _ => return,
                };
                let check = ctx.runtime_call(
                    "checkVoid",
                    vec![Item::Expr(tag.clone()), Item::Expr(children.clone())],
                );
                let contents = Expr::concat(vec![
                    join_values(ctx, children),
                    Expr::string("</"),
                    tag,
                    Expr::string(">"),
                ]);
                self.segments
                    .push_expr(Expr::conditional(check, Expr::string(""), contents));
            }
            None => {}
        }
    }

    fn finish(self, _ctx: &mut Context) -> Expr {
        let node = object(vec![
            ("type", Expr::string("raw")),
            ("value", self.segments.into_expr()),
        ]);
        if self.bindings.is_empty() {
            return node;
        }
        bind(self.bindings, FunctionBody::Expr(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Config;

    #[test]
    fn test_constant_parts_are_merged() {
        let mut ctx = Context::new(Config::default());
        let mut emitter = RawEmitter::default();
        emitter.open(&mut ctx, Tag::Static(Rc::from("p")));
        emitter.attributes(
            &mut ctx,
            AttributeSet {
                attributes: vec![
                    Attribute::Static(Rc::from("class"), "a&b".into()),
                    Attribute::Static(Rc::from("hidden"), false.into()),
                ],
            },
        );
        emitter.children(&mut ctx, vec![Compiled::text("<hi>")]);
        emitter.close(&mut ctx);
        assert_eq!(
            emitter.finish(&mut ctx),
            object(vec![
                ("type", Expr::string("raw")),
                ("value", Expr::string("<p class=\"a&amp;b\">&lt;hi&gt;</p>")),
            ])
        );
    }
}
