//! Interprets parsed token pairs as a [Program].

#[macro_use]
mod base;
mod markup;

use pest::iterators::Pair;
use pest::Parser;
use std::rc::Rc;
use std::result::Result;
use std::str::FromStr;

use crate::parser::{MarklitParser, Rule};
use crate::syntax::{
    BinaryOp, Expr, Function, FunctionBody, Item, Literal, Markup, Program, Property, Stmt,
    VarKind,
};
use base::{next_pair, pair_at, significant_pairs, FromPair};

pub use base::{Error, LinePosition};

/// Parses a whole source file.
pub fn parse_program(source: &str) -> Result<Program, Error> {
    let mut pairs = MarklitParser::parse(Rule::main, source)?;
    let main = match pairs.next() {
        Some(pair) => pair,
        None => return Ok(Program::default()),
    };
    return interpret_program(main);
}

/// Parses a single expression.
pub fn parse_expression(source: &str) -> Result<Expr, Error> {
    let mut pairs = MarklitParser::parse(Rule::expression_only, source)?;
    let main = match pairs.next() {
        Some(pair) => pair,
        None => return Ok(Expr::undefined()),
    };
    let mut inner = main.clone().into_inner();
    return Expr::from_pair(next_pair(&main, &mut inner)?);
}

pub fn interpret_program<'a>(main: Pair<'a, Rule>) -> Result<Program, Error> {
    let mut body = vec![];
    for pair in main.into_inner() {
        if pair.as_rule() == Rule::EOI {
            break;
        }
        body.push(Stmt::from_pair(pair)?);
    }
    return Ok(Program { body });
}

impl FromPair for Stmt {
    fn from_pair<'a>(pair: Pair<'a, Rule>) -> Result<Self, Error> {
        let parts = significant_pairs(&pair);
        process_pair!(
            pair,
            import_statement => {
                let alias = Rc::from(pair_at(&pair, &parts, 0)?.as_str());
                let path = string_value(pair_at(&pair, &parts, 1)?)?;
                Ok(Stmt::Import { alias, path })
            },
            var_statement => {
                let kind = VarKind::from_str(pair_at(&pair, &parts, 0)?.as_str())
                    .map_err(|_| Error::unexpected_token(&pair, vec![Rule::var_kind]))?;
                Ok(Stmt::Let {
                    kind,
                    name: Rc::from(pair_at(&pair, &parts, 1)?.as_str()),
                    init: Expr::from_pair(pair_at(&pair, &parts, 2)?)?,
                })
            },
            if_statement => {
                let alternate = match parts.get(2) {
                    Some(p) => Some(Box::new(Stmt::from_pair(p.clone())?)),
                    None => None,
                };
                Ok(Stmt::If {
                    test: Expr::from_pair(pair_at(&pair, &parts, 0)?)?,
                    consequent: Box::new(body_statement(&pair, &parts, 1)?),
                    alternate,
                })
            },
            for_statement => Ok(Stmt::ForOf {
                binding: Rc::from(pair_at(&pair, &parts, 1)?.as_str()),
                iterable: Expr::from_pair(pair_at(&pair, &parts, 2)?)?,
                body: Box::new(body_statement(&pair, &parts, 3)?),
            }),
            return_statement => match parts.into_iter().next() {
                Some(value) => Ok(Stmt::Return(Some(Expr::from_pair(value)?))),
                None => Ok(Stmt::Return(None)),
            },
            block => Ok(Stmt::Block(
                parts
                    .into_iter()
                    .map(Stmt::from_pair)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            expression_statement => Ok(Stmt::Expr(Expr::from_pair(pair_at(&pair, &parts, 0)?)?)),
        )
    }
}

/// A statement used as the body of `if` or `for`. A lone `;` is an empty block.
fn body_statement<'a>(
    parent: &Pair<'a, Rule>,
    parts: &[Pair<'a, Rule>],
    index: usize,
) -> Result<Stmt, Error> {
    return match parts.get(index) {
        Some(pair) => Stmt::from_pair(pair.clone()),
        None if index > 0 && !parts.is_empty() => Ok(Stmt::Block(vec![])),
        None => Err(Error::missing_pair(parent)),
    };
}

impl FromPair for Expr {
    fn from_pair<'a>(pair: Pair<'a, Rule>) -> Result<Self, Error> {
        process_pair!(
            pair,
            expression => {
                let mut inner = pair.clone().into_inner();
                Expr::from_pair(next_pair(&pair, &mut inner)?)
            },
            arrow_function => interpret_arrow(pair),
            conditional => {
                let mut inner = pair.clone().into_inner();
                let test = Expr::from_pair(next_pair(&pair, &mut inner)?)?;
                match inner.next() {
                    Some(consequent) => Ok(Expr::conditional(
                        test,
                        Expr::from_pair(consequent)?,
                        Expr::from_pair(next_pair(&pair, &mut inner)?)?,
                    )),
                    None => Ok(test),
                }
            },
            logical_or | logical_and | equality | additive => interpret_binary(pair),
            unary => {
                let mut negations = 0;
                let mut operand = None;
                for inner in pair.clone().into_inner() {
                    if inner.as_rule() == Rule::not_op {
                        negations += 1;
                    } else {
                        operand = Some(Expr::from_pair(inner)?);
                    }
                }
                let mut expr = match operand {
                    Some(expr) => expr,
                    None => return Err(Error::missing_pair(&pair)),
                };
                for _ in 0..negations {
                    expr = Expr::Not(Box::new(expr));
                }
                Ok(expr)
            },
            postfix => interpret_postfix(pair),
            markup_element | markup_fragment => {
                Ok(Expr::Markup(Box::new(Markup::from_pair(pair)?)))
            },
            string_literal | number_literal | boolean_literal | null_literal | undefined_literal => {
                Ok(Expr::Literal(Literal::from_pair(pair)?))
            },
            array => Ok(Expr::Array(
                pair.into_inner()
                    .map(Item::from_pair)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            object => Ok(Expr::Object(
                pair.into_inner()
                    .map(Property::from_pair)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            identifier => Ok(Expr::Identifier(Rc::from(pair.as_str()))),
        )
    }
}

fn interpret_binary<'a>(pair: Pair<'a, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.clone().into_inner();
    let mut left = Expr::from_pair(next_pair(&pair, &mut inner)?)?;
    while let Some(op) = inner.next() {
        let op_kind = BinaryOp::from_str(op.as_str())
            .map_err(|_| Error::unexpected_token(&op, vec![Rule::add_op, Rule::equality_op]))?;
        let right = Expr::from_pair(next_pair(&pair, &mut inner)?)?;
        left = Expr::binary(op_kind, left, right);
    }
    return Ok(left);
}

fn interpret_postfix<'a>(pair: Pair<'a, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.clone().into_inner();
    let mut expr = Expr::from_pair(next_pair(&pair, &mut inner)?)?;
    for suffix in inner {
        expr = process_pair!(
            suffix,
            call_arguments => Expr::call(
                expr,
                suffix
                    .into_inner()
                    .map(Item::from_pair)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            member_access => {
                let mut name = suffix.clone().into_inner();
                Expr::member(expr, next_pair(&suffix, &mut name)?.as_str())
            },
            index_access => {
                let mut index = suffix.clone().into_inner();
                Expr::Index(Box::new(expr), Box::new(Expr::from_pair(next_pair(&suffix, &mut index)?)?))
            },
        );
    }
    return Ok(expr);
}

fn interpret_arrow<'a>(pair: Pair<'a, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.clone().into_inner();
    let params_pair = next_pair(&pair, &mut inner)?;
    let params = params_pair
        .into_inner()
        .map(|p| Rc::from(p.as_str()))
        .collect();
    let body_pair = next_pair(&pair, &mut inner)?;
    let body = match body_pair.as_rule() {
        Rule::block => match Stmt::from_pair(body_pair)? {
            Stmt::Block(statements) => FunctionBody::Block(statements),
            other => FunctionBody::Block(vec![other]),
        },
        _ => FunctionBody::Expr(Expr::from_pair(body_pair)?),
    };
    return Ok(Expr::Arrow(Rc::new(Function { params, body })));
}

impl FromPair for Item {
    fn from_pair<'a>(pair: Pair<'a, Rule>) -> Result<Self, Error> {
        process_pair!(
            pair,
            spread => {
                let mut inner = pair.clone().into_inner();
                Ok(Item::Spread(Expr::from_pair(next_pair(&pair, &mut inner)?)?))
            },
            expression => Ok(Item::Expr(Expr::from_pair(pair)?)),
        )
    }
}

impl FromPair for Property {
    fn from_pair<'a>(pair: Pair<'a, Rule>) -> Result<Self, Error> {
        process_pair!(
            pair,
            spread => {
                let mut inner = pair.clone().into_inner();
                Ok(Property::Spread(Expr::from_pair(next_pair(&pair, &mut inner)?)?))
            },
            key_value => {
                let mut inner = pair.clone().into_inner();
                let key_pair = next_pair(&pair, &mut inner)?;
                let key = match key_pair.as_rule() {
                    Rule::string_literal => string_value(key_pair)?,
                    _ => Rc::from(key_pair.as_str()),
                };
                Ok(Property::KeyValue(key, Expr::from_pair(next_pair(&pair, &mut inner)?)?))
            },
            shorthand => {
                let name: Rc<str> = Rc::from(pair.as_str().trim());
                Ok(Property::KeyValue(Rc::clone(&name), Expr::Identifier(name)))
            },
        )
    }
}

impl FromPair for Literal {
    fn from_pair<'a>(pair: Pair<'a, Rule>) -> Result<Self, Error> {
        process_pair!(
            pair,
            string_literal => Ok(Literal::String {
                value: string_value(pair.clone())?,
                raw: Some(Rc::from(pair.as_str())),
            }),
            number_literal => match pair.as_str().parse::<f64>() {
                Ok(n) => Ok(Literal::Number(n)),
                Err(_) => Err(Error::InvalidNumber(Rc::from(pair.as_str()), (&pair).into())),
            },
            boolean_literal => Ok(Literal::Bool(pair.as_str() == "true")),
            null_literal => Ok(Literal::Null),
            undefined_literal => Ok(Literal::Undefined),
        )
    }
}

/// The decoded contents of a `string_literal` pair.
fn string_value<'a>(pair: Pair<'a, Rule>) -> Result<Rc<str>, Error> {
    let mut inner = pair.clone().into_inner();
    let contents = next_pair(&pair, &mut inner)?;
    return Ok(Rc::from(unescape(contents.as_str())));
}

fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('u') if chars.as_str().starts_with('{') => {
                let rest = chars.as_str();
                let decoded = rest.find('}').and_then(|end| {
                    u32::from_str_radix(&rest[1..end], 16)
                        .ok()
                        .and_then(char::from_u32)
                        .map(|c| (c, end))
                });
                match decoded {
                    Some((c, end)) => {
                        result.push(c);
                        chars = rest[end + 1..].chars();
                    }
                    None => result.push('u'),
                }
            }
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{MarkupAttribute, MarkupElement, TagName};

    macro_rules! assert_expression {
        ($source:expr, $expected:expr) => {
            let parsed = parse_expression($source);
            assert!(matches!(parsed, Ok(_)), "{:?}", parsed);
            assert_eq!(parsed.unwrap(), $expected);
        };
    }

    fn string(value: &str, raw: &str) -> Expr {
        Expr::Literal(Literal::String {
            value: Rc::from(value),
            raw: Some(Rc::from(raw)),
        })
    }

    #[test]
    fn test_precedence() {
        assert_expression!(
            "a + b === c && !d || e",
            Expr::binary(
                BinaryOp::Or,
                Expr::binary(
                    BinaryOp::And,
                    Expr::binary(
                        BinaryOp::StrictEq,
                        Expr::binary(BinaryOp::Add, Expr::ident("a"), Expr::ident("b")),
                        Expr::ident("c")
                    ),
                    Expr::Not(Box::new(Expr::ident("d")))
                ),
                Expr::ident("e")
            )
        );
    }

    #[test]
    fn test_postfix_chain() {
        assert_expression!(
            "items.map((x) => x.name)[0]",
            Expr::Index(
                Box::new(Expr::call(
                    Expr::member(Expr::ident("items"), "map"),
                    vec![Item::Expr(Expr::arrow(
                        &["x"],
                        FunctionBody::Expr(Expr::member(Expr::ident("x"), "name"))
                    ))]
                )),
                Box::new(Expr::number(0.0))
            )
        );
    }

    #[test]
    fn test_literals_and_collections() {
        assert_expression!(
            "[1, 'a\\'b', true, null, undefined, ...rest]",
            Expr::Array(vec![
                Item::Expr(Expr::number(1.0)),
                Item::Expr(string("a'b", "'a\\'b'")),
                Item::Expr(Expr::bool(true)),
                Item::Expr(Expr::null()),
                Item::Expr(Expr::undefined()),
                Item::Spread(Expr::ident("rest")),
            ])
        );
        assert_expression!(
            "{ a: 1, \"data-x\": y, z, ...more }",
            Expr::Object(vec![
                Property::KeyValue(Rc::from("a"), Expr::number(1.0)),
                Property::KeyValue(Rc::from("data-x"), Expr::ident("y")),
                Property::KeyValue(Rc::from("z"), Expr::ident("z")),
                Property::Spread(Expr::ident("more")),
            ])
        );
    }

    #[test]
    fn test_conditional() {
        assert_expression!(
            "a ? b : c ? d : e",
            Expr::conditional(
                Expr::ident("a"),
                Expr::ident("b"),
                Expr::conditional(Expr::ident("c"), Expr::ident("d"), Expr::ident("e"))
            )
        );
    }

    #[test]
    fn test_markup_expression() {
        assert_expression!(
            "<a href={url} hidden>go</a>",
            Expr::Markup(Box::new(Markup::Element(MarkupElement {
                name: TagName::Static(Rc::from("a")),
                attributes: vec![
                    MarkupAttribute::Named {
                        name: Rc::from("href"),
                        value: Some(Expr::ident("url")),
                    },
                    MarkupAttribute::Named {
                        name: Rc::from("hidden"),
                        value: None,
                    },
                ],
                children: vec![Markup::Text(Rc::from("go"))],
                self_closing: false,
            })))
        );
    }

    #[test]
    fn test_program() {
        let program = parse_program(
            "import * as _h from 'marklit/runtime';
            const page = (items) => {
                if (items === null) return <p>none</p>;
                for (const item of items) log(item);
                return <ul />;
            };",
        )
        .unwrap();
        assert_eq!(program.body.len(), 2);
        assert_eq!(
            program.body[0],
            Stmt::Import {
                alias: Rc::from("_h"),
                path: Rc::from("marklit/runtime"),
            }
        );
        let init = match &program.body[1] {
            Stmt::Let { kind: VarKind::Const, name, init } if name.as_ref() == "page" => init,
            other => panic!("unexpected statement {:?}", other),
        };
        let function = match init {
            Expr::Arrow(function) => function,
            other => panic!("unexpected expression {:?}", other),
        };
        match &function.body {
            FunctionBody::Block(statements) => {
                assert!(matches!(statements[0], Stmt::If { alternate: None, .. }));
                assert!(matches!(statements[1], Stmt::ForOf { .. }));
                assert!(matches!(statements[2], Stmt::Return(Some(_))));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error() {
        let result = parse_program("const = 1;");
        assert!(matches!(result, Err(Error::Syntax(_))));
    }
}
