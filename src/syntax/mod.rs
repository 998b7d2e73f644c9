//! The generic syntax tree shared by the parser, the compiler, the printer and the
//! evaluator.

mod markup;

use std::rc::Rc;
use strum_macros::{Display, EnumString};

pub use markup::{Markup, MarkupAttribute, MarkupElement, TagName};

/// A whole compilation unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum VarKind {
    Const,
    Let,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `import * as alias from "path"`.
    Import { alias: Rc<str>, path: Rc<str> },
    Let {
        kind: VarKind,
        name: Rc<str>,
        init: Expr,
    },
    Expr(Expr),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    /// `for (const binding of iterable) body`.
    ForOf {
        binding: Rc<str>,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A string, with the source text it was written as, if any.
    String { value: Rc<str>, raw: Option<Rc<str>> },
    Number(f64),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "===")]
    StrictEq,
    #[strum(serialize = "!==")]
    StrictNe,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

impl BinaryOp {
    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 4,
            BinaryOp::And => 5,
            BinaryOp::StrictEq | BinaryOp::StrictNe => 10,
            BinaryOp::Add => 13,
        }
    }
}

/// An element of an array literal or an argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Expr(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    KeyValue(Rc<str>, Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expr(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub params: Vec<Rc<str>>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Rc<str>),
    Literal(Literal),
    Array(Vec<Item>),
    Object(Vec<Property>),
    Member(Box<Expr>, Rc<str>),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Item>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Arrow(Rc<Function>),
    Markup(Box<Markup>),
}

impl Expr {
    pub fn ident(name: &str) -> Expr {
        Expr::Identifier(Rc::from(name))
    }

    pub fn string(value: &str) -> Expr {
        Expr::Literal(Literal::String {
            value: Rc::from(value),
            raw: None,
        })
    }

    pub fn number(value: f64) -> Expr {
        Expr::Literal(Literal::Number(value))
    }

    pub fn bool(value: bool) -> Expr {
        Expr::Literal(Literal::Bool(value))
    }

    pub fn null() -> Expr {
        Expr::Literal(Literal::Null)
    }

    pub fn undefined() -> Expr {
        Expr::Literal(Literal::Undefined)
    }

    pub fn member(object: Expr, property: &str) -> Expr {
        Expr::Member(Box::new(object), Rc::from(property))
    }

    pub fn call(callee: Expr, args: Vec<Item>) -> Expr {
        Expr::Call(Box::new(callee), args)
    }

    /// A call without spread arguments.
    pub fn call_with(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call(Box::new(callee), args.into_iter().map(Item::Expr).collect())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn conditional(test: Expr, consequent: Expr, alternate: Expr) -> Expr {
        Expr::Conditional(Box::new(test), Box::new(consequent), Box::new(alternate))
    }

    pub fn arrow(params: &[&str], body: FunctionBody) -> Expr {
        Expr::Arrow(Rc::new(Function {
            params: params.iter().map(|p| Rc::from(*p)).collect(),
            body,
        }))
    }

    /// Joins `parts` with `+`. An empty list is the empty string.
    pub fn concat(parts: Vec<Expr>) -> Expr {
        parts
            .into_iter()
            .reduce(|left, right| Expr::binary(BinaryOp::Add, left, right))
            .unwrap_or_else(|| Expr::string(""))
    }

    /// The string value of a string literal.
    pub fn as_str(&self) -> Option<&Rc<str>> {
        match self {
            Expr::Literal(Literal::String { value, .. }) => Some(value),
            _ => None,
        }
    }
}
