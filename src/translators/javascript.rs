use std::collections::LinkedList;

use itertools::Itertools;

use crate::normalize::format_number;
use crate::syntax::{
    Expr, FunctionBody, Item, Literal, Markup, MarkupAttribute, Program, Property, Stmt,
    TagName,
};
use crate::translation::{quote_string, Translator};

/// Prints programs as JavaScript source.
pub struct JavaScript;

impl Translator for JavaScript {
    fn translate(program: &Program) -> String {
        let mut context = Context::new(0);
        for statement in &program.body {
            append_statement(statement, &mut context);
        }
        let mut source = context.into_string();
        source.push('\n');
        return source;
    }

    fn translate_expression(expr: &Expr) -> String {
        return expression(expr, 0, 0);
    }
}

struct Context {
    tab_size: usize,
    lines: LinkedList<String>,
}

impl Context {
    fn new(tab_size: usize) -> Self {
        Context {
            tab_size,
            lines: LinkedList::new(),
        }
    }

    fn add_line(&mut self, line: &str) {
        self.lines.push_back(with_tabs(self.tab_size, line));
    }

    fn into_string(self) -> String {
        self.lines.into_iter().join("\n")
    }
}

static TAB_SPACES: &str = "  ";

fn with_tabs(num_tabs: usize, s: &str) -> String {
    str::repeat(TAB_SPACES, num_tabs) + s
}

// Binding strengths, loosest first.
const ARROW: u8 = 2;
const CONDITIONAL: u8 = 3;
const UNARY: u8 = 16;
const POSTFIX: u8 = 18;
const PRIMARY: u8 = 20;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Arrow(_) => ARROW,
        Expr::Conditional(..) => CONDITIONAL,
        Expr::Binary(op, ..) => op.precedence(),
        Expr::Not(_) => UNARY,
        Expr::Member(..) | Expr::Index(..) | Expr::Call(..) => POSTFIX,
        Expr::Identifier(_)
        | Expr::Literal(_)
        | Expr::Array(_)
        | Expr::Object(_)
        | Expr::Markup(_) => PRIMARY,
    }
}

fn append_statement(statement: &Stmt, ctx: &mut Context) {
    match statement {
        Stmt::Import { alias, path } => {
            ctx.add_line(&format!("import * as {} from {};", alias, quote_string(path)));
        }
        Stmt::Let { kind, name, init } => {
            let init = expression(init, ARROW, ctx.tab_size);
            ctx.add_line(&format!("{} {} = {};", kind, name, init));
        }
        Stmt::Expr(expr) => {
            let printed = expression(expr, 0, ctx.tab_size);
            if printed.starts_with('{') {
                ctx.add_line(&format!("({});", printed));
            } else {
                ctx.add_line(&format!("{};", printed));
            }
        }
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            let test = expression(test, 0, ctx.tab_size);
            ctx.add_line(&format!("if ({}) {{", test));
            append_body(consequent, ctx);
            let mut alternate = alternate.as_deref();
            while let Some(branch) = alternate {
                match branch {
                    Stmt::If {
                        test,
                        consequent,
                        alternate: next,
                    } => {
                        let test = expression(test, 0, ctx.tab_size);
                        ctx.add_line(&format!("}} else if ({}) {{", test));
                        append_body(consequent, ctx);
                        alternate = next.as_deref();
                    }
                    other => {
                        ctx.add_line("} else {");
                        append_body(other, ctx);
                        alternate = None;
                    }
                }
            }
            ctx.add_line("}");
        }
        Stmt::ForOf {
            binding,
            iterable,
            body,
        } => {
            let iterable = expression(iterable, 0, ctx.tab_size);
            ctx.add_line(&format!("for (const {} of {}) {{", binding, iterable));
            append_body(body, ctx);
            ctx.add_line("}");
        }
        Stmt::Block(statements) => {
            ctx.add_line("{");
            ctx.tab_size += 1;
            for statement in statements {
                append_statement(statement, ctx);
            }
            ctx.tab_size -= 1;
            ctx.add_line("}");
        }
        Stmt::Return(None) => ctx.add_line("return;"),
        Stmt::Return(Some(value)) => {
            let value = expression(value, 0, ctx.tab_size);
            ctx.add_line(&format!("return {};", value));
        }
    }
}

/// Appends the statements of a braced body, one level deeper.
fn append_body(body: &Stmt, ctx: &mut Context) {
    ctx.tab_size += 1;
    match body {
        Stmt::Block(statements) => {
            for statement in statements {
                append_statement(statement, ctx);
            }
        }
        other => append_statement(other, ctx),
    }
    ctx.tab_size -= 1;
}

/// Prints `expr`, parenthesized when it binds looser than `min`. Multi-line output is
/// indented relative to `tabs`.
fn expression(expr: &Expr, min: u8, tabs: usize) -> String {
    let printed = match expr {
        Expr::Identifier(name) => name.to_string(),
        Expr::Literal(literal) => print_literal(literal),
        Expr::Array(items) => format!("[{}]", items.iter().map(|i| item(i, tabs)).join(", ")),
        Expr::Object(properties) if properties.is_empty() => "{}".to_owned(),
        Expr::Object(properties) => format!(
            "{{ {} }}",
            properties.iter().map(|p| property(p, tabs)).join(", ")
        ),
        Expr::Member(object, name) => {
            format!("{}.{}", expression(object, POSTFIX, tabs), name)
        }
        Expr::Index(object, index) => format!(
            "{}[{}]",
            expression(object, POSTFIX, tabs),
            expression(index, 0, tabs)
        ),
        Expr::Call(callee, args) => format!(
            "{}({})",
            expression(callee, POSTFIX, tabs),
            args.iter().map(|a| item(a, tabs)).join(", ")
        ),
        Expr::Not(operand) => format!("!{}", expression(operand, UNARY, tabs)),
        Expr::Binary(op, left, right) => format!(
            "{} {} {}",
            expression(left, op.precedence(), tabs),
            op,
            expression(right, op.precedence() + 1, tabs)
        ),
        Expr::Conditional(test, consequent, alternate) => format!(
            "{} ? {} : {}",
            expression(test, CONDITIONAL + 1, tabs),
            expression(consequent, ARROW, tabs),
            expression(alternate, ARROW, tabs)
        ),
        Expr::Arrow(function) => {
            let params = function.params.iter().join(", ");
            match &function.body {
                FunctionBody::Expr(body) => {
                    let body = expression(body, ARROW, tabs);
                    if body.starts_with('{') {
                        format!("({}) => ({})", params, body)
                    } else {
                        format!("({}) => {}", params, body)
                    }
                }
                FunctionBody::Block(statements) if statements.is_empty() => {
                    format!("({}) => {{}}", params)
                }
                FunctionBody::Block(statements) => {
                    let mut inner = Context::new(tabs + 1);
                    for statement in statements {
                        append_statement(statement, &mut inner);
                    }
                    format!(
                        "({}) => {{\n{}\n{}}}",
                        params,
                        inner.into_string(),
                        with_tabs(tabs, "")
                    )
                }
            }
        }
        Expr::Markup(markup) => print_markup(markup, tabs),
    };
    if precedence(expr) < min {
        return format!("({})", printed);
    }
    return printed;
}

fn item(item: &Item, tabs: usize) -> String {
    match item {
        Item::Expr(expr) => expression(expr, ARROW, tabs),
        Item::Spread(expr) => format!("...{}", expression(expr, ARROW, tabs)),
    }
}

fn property(property: &Property, tabs: usize) -> String {
    match property {
        Property::KeyValue(key, value) => {
            format!("{}: {}", property_key(key), expression(value, ARROW, tabs))
        }
        Property::Spread(expr) => format!("...{}", expression(expr, ARROW, tabs)),
    }
}

fn property_key(key: &str) -> String {
    let mut chars = key.chars();
    let is_identifier = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        key.to_owned()
    } else {
        quote_string(key)
    }
}

fn print_literal(literal: &Literal) -> String {
    match literal {
        Literal::String { raw: Some(raw), .. } => raw.to_string(),
        Literal::String { value, raw: None } => quote_string(value),
        Literal::Number(n) => format_number(*n),
        Literal::Bool(b) => b.to_string(),
        Literal::Null => "null".to_owned(),
        Literal::Undefined => "undefined".to_owned(),
    }
}

fn print_markup(markup: &Markup, tabs: usize) -> String {
    match markup {
        Markup::Text(text) => text.to_string(),
        Markup::Expression(None) => "{}".to_owned(),
        Markup::Expression(Some(expr)) => format!("{{{}}}", expression(expr, 0, tabs)),
        Markup::Fragment(children) => format!(
            "<>{}</>",
            children.iter().map(|c| print_markup(c, tabs)).join("")
        ),
        Markup::Element(element) => {
            let name = match &element.name {
                TagName::Static(name) => name.to_string(),
                TagName::Dynamic(expr) => format!("${}", expression(expr, 0, tabs)),
                TagName::Macro(expr) => expression(expr, 0, tabs),
            };
            let attributes: String = element
                .attributes
                .iter()
                .map(|attribute| match attribute {
                    MarkupAttribute::Named { name, value: None } => format!(" {}", name),
                    MarkupAttribute::Named {
                        name,
                        value: Some(Expr::Literal(literal @ Literal::String { .. })),
                    } => format!(" {}={}", name, print_literal(literal)),
                    MarkupAttribute::Named {
                        name,
                        value: Some(value),
                    } => format!(" {}={{{}}}", name, expression(value, 0, tabs)),
                    MarkupAttribute::Spread(expr) => {
                        format!(" {{...{}}}", expression(expr, 0, tabs))
                    }
                })
                .collect();
            if element.self_closing && element.children.is_empty() {
                return format!("<{}{} />", name, attributes);
            }
            format!(
                "<{}{}>{}</{}>",
                name,
                attributes,
                element
                    .children
                    .iter()
                    .map(|c| print_markup(c, tabs))
                    .join(""),
                name
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantics::{parse_expression, parse_program};
    use crate::syntax::BinaryOp;

    macro_rules! assert_prints {
        ($expr:expr, $expected:expr) => {
            assert_eq!(JavaScript::translate_expression(&$expr), $expected);
        };
    }

    macro_rules! assert_reprints {
        ($source:expr) => {
            let parsed = parse_expression($source).unwrap();
            assert_eq!(JavaScript::translate_expression(&parsed), $source);
        };
    }

    #[test]
    fn test_parenthesizes_by_precedence() {
        assert_prints!(
            Expr::binary(
                BinaryOp::Add,
                Expr::ident("a"),
                Expr::binary(BinaryOp::Add, Expr::ident("b"), Expr::ident("c"))
            ),
            "a + (b + c)"
        );
        assert_prints!(
            Expr::call_with(
                Expr::arrow(&["x"], FunctionBody::Expr(Expr::ident("x"))),
                vec![Expr::number(1.0)]
            ),
            "((x) => x)(1)"
        );
        assert_prints!(
            Expr::Not(Box::new(Expr::binary(
                BinaryOp::StrictEq,
                Expr::ident("a"),
                Expr::null()
            ))),
            "!(a === null)"
        );
        assert_prints!(
            Expr::arrow(&[], FunctionBody::Expr(Expr::Object(vec![]))),
            "() => ({})"
        );
    }

    #[test]
    fn test_strings() {
        assert_prints!(Expr::string("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_prints!(
            Expr::Object(vec![
                Property::KeyValue("data-id".into(), Expr::number(2.0)),
                Property::KeyValue("id".into(), Expr::number(0.5)),
            ]),
            "{ \"data-id\": 2, id: 0.5 }"
        );
    }

    #[test]
    fn test_reprints_source() {
        assert_reprints!("a ? b : c || !d");
        assert_reprints!("f(...xs, [1, 'two'], { a: b, ...c })");
        assert_reprints!("<div class=\"x\" id={y} hidden {...z}>a {b}<br /></div>");
        assert_reprints!("<$tag><Card.Body>x</Card.Body></$tag>");
        assert_reprints!("<>one{}</>");
    }

    #[test]
    fn test_program() {
        let program = parse_program(
            "import * as _h from 'marklit/runtime'
            const f = (xs) => { for (const x of xs) { if (x) return x; else g(); } return; }
            f([]);",
        )
        .unwrap();
        assert_eq!(
            JavaScript::translate(&program),
            r#"import * as _h from "marklit/runtime";
const f = (xs) => {
  for (const x of xs) {
    if (x) {
      return x;
    } else {
      g();
    }
  }
  return;
};
f([]);
"#
        );
    }
}
