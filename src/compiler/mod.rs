//! Compiles markup literals into plain expressions that build one of the three
//! representations.
//!
//! The walk is bottom-up: children are compiled before their parent so a parent
//! made only of constant parts can be built at compile time. Everything that can
//! only go wrong at run time is left to the runtime support module.

pub mod classify;
mod emit;
pub mod reify;

use log::debug;
use std::rc::Rc;
use strum_macros::{Display, EnumIter, EnumString};

use crate::dom::Representation;
use crate::error::CompileError;
use crate::normalize::{is_macro_name, is_void_element};
use crate::syntax::{
    Expr, Function, FunctionBody, Item, Literal, Markup, MarkupAttribute, MarkupElement,
    Program, Property, Stmt, TagName,
};
use classify::{normalize_text, static_value, Attribute, AttributeSet, Compiled, Shape, Tag};
use emit::{emit_element, spread_children};

/// How elements are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum EmitMode {
    /// Every element is a call to the target builder.
    Direct,
    /// Constant subtrees are built at compile time and the rest is specialized to
    /// the target.
    Optimizing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub target: Representation,
    pub mode: EmitMode,
    /// The name generated code refers to the runtime support module by.
    pub prefix: Rc<str>,
    /// When set, an import of this module path under `prefix` is prepended.
    pub import: Option<Rc<str>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target: Representation::Raw,
            mode: EmitMode::Optimizing,
            prefix: Rc::from("_h"),
            import: None,
        }
    }
}

/// State of one compilation unit.
pub struct Context {
    pub config: Config,
    counter: usize,
}

impl Context {
    pub fn new(config: Config) -> Context {
        Context { config, counter: 0 }
    }

    /// A fresh temporary name, unique within the compilation unit.
    pub fn temp(&mut self, kind: &str) -> Rc<str> {
        self.counter += 1;
        Rc::from(format!("_{}{}", kind, self.counter))
    }

    /// A member of the runtime support module.
    pub fn runtime(&self, name: &str) -> Expr {
        Expr::member(Expr::Identifier(Rc::clone(&self.config.prefix)), name)
    }

    pub fn runtime_call(&self, name: &str, args: Vec<Item>) -> Expr {
        Expr::call(self.runtime(name), args)
    }

    /// `P.<representation>()`.
    pub fn builder(&self, representation: Representation) -> Expr {
        self.runtime_call(&representation.to_string(), vec![])
    }
}

/// Compiles every markup literal of `program`.
pub fn compile_program(program: &Program, config: &Config) -> Result<Program, CompileError> {
    let mut ctx = Context::new(config.clone());
    let mut body = Vec::with_capacity(program.body.len() + 1);
    if let Some(path) = &config.import {
        body.push(Stmt::Import {
            alias: Rc::clone(&config.prefix),
            path: Rc::clone(path),
        });
    }
    for statement in &program.body {
        body.push(walk_stmt(&mut ctx, statement)?);
    }
    debug!(
        "compiled {} statements for {} ({})",
        program.body.len(),
        config.target,
        config.mode
    );
    Ok(Program { body })
}

/// Compiles the markup literals of a single expression.
pub fn compile_expression(expr: &Expr, ctx: &mut Context) -> Result<Expr, CompileError> {
    walk_expr(ctx, expr)
}

fn walk_stmt(ctx: &mut Context, statement: &Stmt) -> Result<Stmt, CompileError> {
    Ok(match statement {
        Stmt::Import { .. } => statement.clone(),
        Stmt::Let { kind, name, init } => Stmt::Let {
            kind: *kind,
            name: Rc::clone(name),
            init: walk_expr(ctx, init)?,
        },
        Stmt::Expr(expr) => Stmt::Expr(walk_expr(ctx, expr)?),
        Stmt::If {
            test,
            consequent,
            alternate,
        } => Stmt::If {
            test: walk_expr(ctx, test)?,
            consequent: Box::new(walk_stmt(ctx, consequent)?),
            alternate: match alternate {
                Some(alternate) => Some(Box::new(walk_stmt(ctx, alternate)?)),
                None => None,
            },
        },
        Stmt::Block(statements) => Stmt::Block(walk_stmts(ctx, statements)?),
        Stmt::ForOf {
            binding,
            iterable,
            body,
        } => Stmt::ForOf {
            binding: Rc::clone(binding),
            iterable: walk_expr(ctx, iterable)?,
            body: Box::new(walk_stmt(ctx, body)?),
        },
        Stmt::Return(value) => Stmt::Return(match value {
            Some(value) => Some(walk_expr(ctx, value)?),
            None => None,
        }),
    })
}

fn walk_stmts(ctx: &mut Context, statements: &[Stmt]) -> Result<Vec<Stmt>, CompileError> {
    statements
        .iter()
        .map(|statement| walk_stmt(ctx, statement))
        .collect()
}

fn walk_expr(ctx: &mut Context, expr: &Expr) -> Result<Expr, CompileError> {
    Ok(match expr {
        Expr::Identifier(_) => expr.clone(),
        Expr::Literal(Literal::String { value, .. }) => Expr::Literal(Literal::String {
            value: Rc::clone(value),
            raw: None,
        }),
        Expr::Literal(_) => expr.clone(),
        Expr::Array(items) => Expr::Array(walk_items(ctx, items)?),
        Expr::Object(properties) => {
            let mut walked = Vec::with_capacity(properties.len());
            for property in properties {
                walked.push(match property {
                    Property::KeyValue(key, value) => {
                        Property::KeyValue(Rc::clone(key), walk_expr(ctx, value)?)
                    }
                    Property::Spread(source) => Property::Spread(walk_expr(ctx, source)?),
                });
            }
            Expr::Object(walked)
        }
        Expr::Member(object, name) => Expr::Member(Box::new(walk_expr(ctx, object)?), Rc::clone(name)),
        Expr::Index(object, index) => Expr::Index(
            Box::new(walk_expr(ctx, object)?),
            Box::new(walk_expr(ctx, index)?),
        ),
        Expr::Call(callee, args) => Expr::Call(
            Box::new(walk_expr(ctx, callee)?),
            walk_items(ctx, args)?,
        ),
        Expr::Not(operand) => Expr::Not(Box::new(walk_expr(ctx, operand)?)),
        Expr::Binary(op, left, right) => Expr::Binary(
            *op,
            Box::new(walk_expr(ctx, left)?),
            Box::new(walk_expr(ctx, right)?),
        ),
        Expr::Conditional(test, consequent, alternate) => Expr::Conditional(
            Box::new(walk_expr(ctx, test)?),
            Box::new(walk_expr(ctx, consequent)?),
            Box::new(walk_expr(ctx, alternate)?),
        ),
        Expr::Arrow(function) => {
            let body = match &function.body {
                FunctionBody::Expr(body) => FunctionBody::Expr(walk_expr(ctx, body)?),
                FunctionBody::Block(statements) => FunctionBody::Block(walk_stmts(ctx, statements)?),
            };
            Expr::Arrow(Rc::new(Function {
                params: function.params.clone(),
                body,
            }))
        }
        Expr::Markup(markup) => compile_markup(ctx, markup)?.expr,
    })
}

fn walk_items(ctx: &mut Context, items: &[Item]) -> Result<Vec<Item>, CompileError> {
    let mut walked = Vec::with_capacity(items.len());
    for item in items {
        walked.push(match item {
            Item::Expr(expr) => Item::Expr(walk_expr(ctx, expr)?),
            Item::Spread(expr) => Item::Spread(walk_expr(ctx, expr)?),
        });
    }
    Ok(walked)
}

/// Compiles one markup node.
pub fn compile_markup(ctx: &mut Context, markup: &Markup) -> Result<Compiled, CompileError> {
    match markup {
        Markup::Element(element) => compile_element(ctx, element),
        Markup::Fragment(children) => {
            let children = compile_children(ctx, children)?;
            let fragment = ctx.runtime("Fragment");
            Ok(Compiled::dynamic(emit_macro(
                ctx,
                fragment,
                &AttributeSet::default(),
                children,
            )))
        }
        Markup::Text(text) => Ok(Compiled::text(&normalize_text(text))),
        Markup::Expression(Some(expr)) => compile_child_expression(ctx, expr),
        Markup::Expression(None) => Ok(Compiled::dynamic(Expr::undefined())),
    }
}

fn compile_child_expression(ctx: &mut Context, expr: &Expr) -> Result<Compiled, CompileError> {
    if let Expr::Markup(markup) = expr {
        return compile_markup(ctx, markup);
    }
    let walked = walk_expr(ctx, expr)?;
    if let Some(value) = walked.as_str() {
        return Ok(Compiled::text(value));
    }
    Ok(Compiled::dynamic(walked))
}

/// Compiles the children of an element or fragment, dropping empty text and empty
/// containers.
fn compile_children(ctx: &mut Context, children: &[Markup]) -> Result<Vec<Compiled>, CompileError> {
    let mut compiled = Vec::with_capacity(children.len());
    for child in children {
        if let Markup::Expression(None) = child {
            continue;
        }
        let child = compile_markup(ctx, child)?;
        if let Shape::Text(value) = &child.shape {
            if value.is_empty() {
                continue;
            }
        }
        compiled.push(child);
    }
    Ok(compiled)
}

fn compile_attributes(
    ctx: &mut Context,
    attributes: &[MarkupAttribute],
) -> Result<AttributeSet, CompileError> {
    let mut set = AttributeSet::default();
    for attribute in attributes {
        let classified = match attribute {
            MarkupAttribute::Named { name, value: None } => {
                Attribute::Static(Rc::clone(name), true.into())
            }
            MarkupAttribute::Named {
                name,
                value: Some(value),
            } => {
                let value = walk_expr(ctx, value)?;
                match static_value(&value) {
                    Some(value) => Attribute::Static(Rc::clone(name), value),
                    None => Attribute::Dynamic(Rc::clone(name), value),
                }
            }
            MarkupAttribute::Spread(source) => Attribute::Spread(walk_expr(ctx, source)?),
        };
        set.attributes.push(classified);
    }
    Ok(set)
}

fn compile_element(ctx: &mut Context, element: &MarkupElement) -> Result<Compiled, CompileError> {
    let tag = match &element.name {
        TagName::Static(name) => {
            if is_macro_name(name) {
                return Err(CompileError::MacroTag(Rc::clone(name)));
            }
            Tag::Static(Rc::clone(name))
        }
        TagName::Dynamic(expr) => Tag::Dynamic(walk_expr(ctx, expr)?),
        TagName::Macro(callee) => {
            let callee = walk_expr(ctx, callee)?;
            let attributes = compile_attributes(ctx, &element.attributes)?;
            let children = compile_children(ctx, &element.children)?;
            return Ok(Compiled::dynamic(emit_macro(
                ctx,
                callee,
                &attributes,
                children,
            )));
        }
    };
    let attributes = compile_attributes(ctx, &element.attributes)?;
    let children = compile_children(ctx, &element.children)?;
    if let Tag::Static(name) = &tag {
        if is_void_element(name) && !children.is_empty() {
            return Err(CompileError::VoidElementChildren(Rc::clone(name)));
        }
    }

    let target = ctx.config.target;
    if ctx.config.mode == EmitMode::Direct {
        return Ok(Compiled::dynamic(emit_direct(ctx, tag, &attributes, children)));
    }
    if let (Tag::Static(name), true) = (&tag, target.supports_literals()) {
        if let Some(values) = attributes.static_values() {
            if children.iter().all(Compiled::is_static) {
                if let Some(reified) = reify::reify_element(target, name, &values, &children)? {
                    debug!("<{}> is constant, building it for {}", name, target);
                    return Ok(Compiled {
                        expr: reify::literal(&reified),
                        shape: Shape::Reified(reified),
                    });
                }
            }
        }
    }
    Ok(Compiled::dynamic(emit_element(ctx, tag, attributes, children)))
}

/// `P.<target>().element(tag, attributes, ...P.normalizeChildren(P.<target>(), children))`.
fn emit_direct(
    ctx: &mut Context,
    tag: Tag,
    attributes: &AttributeSet,
    children: Vec<Compiled>,
) -> Expr {
    let target = ctx.config.target;
    let tag = match tag {
        Tag::Static(name) => Expr::string(&name),
        Tag::Dynamic(expr) => expr,
    };
    let mut args = vec![Item::Expr(tag), Item::Expr(attributes.to_object())];
    args.extend(spread_children(ctx, target, children));
    Expr::call(Expr::member(ctx.builder(target), "element"), args)
}

/// `callee(props, ...P.normalizeChildren(P.<target>(), children))`. Macros are never
/// built at compile time.
fn emit_macro(
    ctx: &mut Context,
    callee: Expr,
    attributes: &AttributeSet,
    children: Vec<Compiled>,
) -> Expr {
    let target = ctx.config.target;
    let mut args = vec![Item::Expr(attributes.to_object())];
    args.extend(spread_children(ctx, target, children));
    Expr::call(callee, args)
}
