use log::trace;
use std::rc::Rc;

use super::{bind, normalize_children_call, render_dynamic_attribute, Emitter};
use crate::compiler::classify::{Attribute, AttributeSet, Compiled, Tag};
use crate::compiler::Context;
use crate::dom::Representation;
use crate::normalize::{is_void_element, normalize_attribute, render_attribute, render_attributes};
use crate::syntax::{BinaryOp, Expr, FunctionBody, Item, Property, Stmt, VarKind};

/// Builds a stream leaf whose render function writes the element directly into the
/// sink. The leaf honors attribute and child extensions added by `addItems`.
#[derive(Debug, Default)]
pub struct StreamEmitter {
    tag: Option<Tag>,
    /// Values bound once, outside the render function.
    bindings: Vec<(Rc<str>, Expr)>,
    /// Statements of the render function.
    body: Vec<Stmt>,
    sink: Option<Rc<str>>,
    extension: Option<Rc<str>>,
    children: Option<Rc<str>>,
    void_flag: Option<Rc<str>>,
}

fn reference(name: &Rc<str>) -> Expr {
    Expr::Identifier(Rc::clone(name))
}

impl StreamEmitter {
    fn write(&mut self, chunk: Expr) {
        let sink = match &self.sink {
            Some(sink) => reference(sink),
            None => return,
        };
        self.body.push(Stmt::Expr(Expr::call_with(
            Expr::member(sink, "write"),
            vec![chunk],
        )));
    }

    fn sink(&self) -> Expr {
        self.sink.as_ref().map_or_else(Expr::undefined, reference)
    }

    fn extension_field(&self, field: &str) -> Expr {
        let extension = self
            .extension
            .as_ref()
            .map_or_else(Expr::undefined, reference);
        Expr::member(extension, field)
    }

    /// `for (const _n of items) _n.render(_s);`
    fn render_each(&self, ctx: &mut Context, items: Expr) -> Stmt {
        let item = ctx.temp("n");
        Stmt::ForOf {
            binding: Rc::clone(&item),
            iterable: items,
            body: Box::new(Stmt::Expr(Expr::call_with(
                Expr::member(reference(&item), "render"),
                vec![self.sink()],
            ))),
        }
    }
}

impl Emitter for StreamEmitter {
    fn open(&mut self, ctx: &mut Context, tag: Tag) {
        self.sink = Some(ctx.temp("s"));
        self.extension = Some(ctx.temp("e"));
        match &tag {
            Tag::Static(name) => self.write(Expr::string(&format!("<{}", name))),
            Tag::Dynamic(expr) => {
                let name = ctx.temp("t");
                self.write(Expr::concat(vec![Expr::string("<"), reference(&name)]));
                self.bindings.push((name, expr.clone()));
            }
        }
        self.tag = Some(tag);
    }

    fn attributes(&mut self, ctx: &mut Context, attributes: AttributeSet) {
        let name = ctx.temp("a");
        let base = reference(&name);

        let mut plain = vec![];
        match attributes.static_values() {
            Some(values) => {
                let rendered = render_attributes(&values);
                trace!("constant attributes {:?}", rendered);
                if !rendered.is_empty() {
                    plain.push(Expr::string(&rendered));
                }
            }
            None if attributes.needs_merge() => {
                plain.push(ctx.runtime_call("renderAttributes", vec![Item::Expr(base.clone())]))
            }
            None => {
                let mut constant = String::new();
                for attribute in &attributes.attributes {
                    match attribute {
                        Attribute::Static(key, value) => {
                            if let Some(value) = normalize_attribute(value) {
                                constant.push_str(&render_attribute(key, &value));
                            }
                        }
                        Attribute::Dynamic(key, _) => {
                            if !constant.is_empty() {
                                plain.push(Expr::string(&std::mem::take(&mut constant)));
                            }
                            let value =
                                Expr::Index(Box::new(base.clone()), Box::new(Expr::string(key)));
                            plain.push(render_dynamic_attribute(ctx, key, value));
                        }
                        Attribute::Spread(_) => {}
                    }
                }
                if !constant.is_empty() {
                    plain.push(Expr::string(&constant));
                }
            }
        }
        let merged = Expr::Object(vec![
            Property::Spread(ctx.runtime_call("normalizeAttributes", vec![Item::Expr(base)])),
            Property::Spread(self.extension_field("attributes")),
        ]);
        let extended = ctx.runtime_call("renderAttributes", vec![Item::Expr(merged)]);

        let sink = self.sink();
        let write = |chunk: Expr| {
            Stmt::Expr(Expr::call_with(
                Expr::member(sink.clone(), "write"),
                vec![chunk],
            ))
        };
        self.body.push(Stmt::If {
            test: Expr::binary(
                BinaryOp::StrictEq,
                self.extension_field("attributes"),
                Expr::undefined(),
            ),
            consequent: Box::new(Stmt::Block(plain.into_iter().map(&write).collect())),
            alternate: Some(Box::new(Stmt::Block(vec![write(extended)]))),
        });
        self.write(Expr::string(">"));
        self.bindings.push((name, attributes.to_object()));
    }

    fn children(&mut self, ctx: &mut Context, children: Vec<Compiled>) {
        if !children.is_empty() {
            let name = ctx.temp("c");
            let normalized = normalize_children_call(ctx, Representation::Stream, children);
            let each = self.render_each(ctx, reference(&name));
            self.body.push(each);
            self.bindings.push((Rc::clone(&name), normalized));
            self.children = Some(name);
        }
        let extra = self.render_each(ctx, self.extension_field("children"));
        self.body.push(Stmt::If {
            test: Expr::binary(
                BinaryOp::StrictNe,
                self.extension_field("children"),
                Expr::undefined(),
            ),
            consequent: Box::new(extra),
            alternate: None,
        });
    }

    fn close(&mut self, ctx: &mut Context) {
        match self.tag.clone() {
            Some(Tag::Static(name)) => {
                if !is_void_element(&name) {
                    self.write(Expr::string(&format!("</{}>", name)));
                }
            }
            Some(Tag::Dynamic(_)) => {
                let tag = match self.bindings.first() {
                    Some((tag, _)) => Rc::clone(tag),
                    None => return,
                };
                let flag = ctx.temp("v");
                let sink = self.sink();
                self.body.push(Stmt::If {
                    test: Expr::Not(Box::new(reference(&flag))),
                    consequent: Box::new(Stmt::Expr(Expr::call_with(
                        Expr::member(sink, "write"),
                        vec![Expr::concat(vec![
                            Expr::string("</"),
                            reference(&tag),
                            Expr::string(">"),
                        ])],
                    ))),
                    alternate: None,
                });
                self.void_flag = Some(flag);
            }
            None => {}
        }
    }

    fn finish(self, ctx: &mut Context) -> Expr {
        let params = [
            self.sink.as_deref().unwrap_or("_s"),
            self.extension.as_deref().unwrap_or("_e"),
        ];
        let render = Expr::arrow(&params, FunctionBody::Block(self.body));
        let tag = match &self.tag {
            Some(Tag::Static(name)) => Expr::string(name),
            _ => match self.bindings.first() {
                Some((tag, _)) => reference(tag),
                None => Expr::null(),
            },
        };
        let leaf = Expr::call_with(
            Expr::member(ctx.builder(Representation::Stream), "leaf"),
            vec![render, tag.clone()],
        );
        let body = match self.void_flag {
            Some(flag) => {
                let children = self
                    .children
                    .as_ref()
                    .map_or_else(|| Expr::Array(vec![]), reference);
                let check = ctx.runtime_call(
                    "checkVoid",
                    vec![Item::Expr(tag), Item::Expr(children)],
                );
                FunctionBody::Block(vec![
                    Stmt::Let {
                        kind: VarKind::Const,
                        name: flag,
                        init: check,
                    },
                    Stmt::Return(Some(leaf)),
                ])
            }
            None => FunctionBody::Expr(leaf),
        };
        bind(self.bindings, body)
    }
}
