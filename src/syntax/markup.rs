use std::rc::Rc;

use super::Expr;

/// What an element's tag refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum TagName {
    /// A literal tag name, such as `div`.
    Static(Rc<str>),
    /// A tag name computed at run time.
    Dynamic(Expr),
    /// A function called with the attributes and children instead of an element.
    Macro(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupAttribute {
    /// `name`, `name="value"` or `name={expr}`. A missing value means `true`.
    Named { name: Rc<str>, value: Option<Expr> },
    /// `{...expr}`.
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupElement {
    pub name: TagName,
    pub attributes: Vec<MarkupAttribute>,
    pub children: Vec<Markup>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element(MarkupElement),
    /// Text exactly as written, before whitespace normalization.
    Text(Rc<str>),
    /// `{expr}`. Empty containers hold `None`.
    Expression(Option<Expr>),
    Fragment(Vec<Markup>),
}
