use pest::iterators::Pair;
use std::rc::Rc;
use std::result::Result;

use super::base::{next_pair, Error, FromPair};
use crate::normalize::is_macro_name;
use crate::parser::Rule;
use crate::syntax::{Expr, Literal, Markup, MarkupAttribute, MarkupElement, TagName};

impl FromPair for Markup {
    fn from_pair<'a>(pair: Pair<'a, Rule>) -> Result<Self, Error> {
        process_pair!(
            pair,
            markup_element => Ok(Markup::Element(MarkupElement::from_pair(pair)?)),
            markup_fragment => {
                let mut inner = pair.clone().into_inner();
                Ok(Markup::Fragment(interpret_children(next_pair(&pair, &mut inner)?)?))
            },
            markup_expression => match pair.into_inner().next() {
                Some(expression) => Ok(Markup::Expression(Some(Expr::from_pair(expression)?))),
                None => Ok(Markup::Expression(None)),
            },
            markup_text => Ok(Markup::Text(Rc::from(pair.as_str()))),
        )
    }
}

fn interpret_children<'a>(pair: Pair<'a, Rule>) -> Result<Vec<Markup>, Error> {
    return pair.into_inner().map(Markup::from_pair).collect();
}

impl FromPair for MarkupElement {
    fn from_pair<'a>(pair: Pair<'a, Rule>) -> Result<Self, Error> {
        let mut inner = pair.clone().into_inner();
        let open = next_pair(&pair, &mut inner)?;
        let self_closing = open.as_rule() == Rule::markup_self_closing;

        let mut tag_parts = open.clone().into_inner();
        let tag = next_pair(&open, &mut tag_parts)?;
        let attributes = tag_parts
            .map(MarkupAttribute::from_pair)
            .collect::<Result<Vec<_>, _>>()?;

        let children = if self_closing {
            vec![]
        } else {
            let children = interpret_children(next_pair(&pair, &mut inner)?)?;
            let close = next_pair(&pair, &mut inner)?;
            let mut close_parts = close.clone().into_inner();
            let close_tag = next_pair(&close, &mut close_parts)?;
            if close_tag.as_str() != tag.as_str() {
                return Err(Error::mismatched_closing_tag(tag.as_str(), &close_tag));
            }
            children
        };

        return Ok(MarkupElement {
            name: classify_tag_name(tag.as_str()),
            attributes,
            children,
            self_closing,
        });
    }
}

/// `$name` is computed, capitalized or dotted names are macros and anything else is
/// an element tag.
fn classify_tag_name(name: &str) -> TagName {
    if let Some(dynamic) = name.strip_prefix('$') {
        return TagName::Dynamic(member_chain(dynamic));
    }
    if name.contains('.') || is_macro_name(name) {
        return TagName::Macro(member_chain(name));
    }
    return TagName::Static(Rc::from(name));
}

fn member_chain(path: &str) -> Expr {
    let mut segments = path.split('.');
    let root = Expr::ident(segments.next().unwrap_or_default());
    return segments.fold(root, Expr::member);
}

impl FromPair for MarkupAttribute {
    fn from_pair<'a>(pair: Pair<'a, Rule>) -> Result<Self, Error> {
        process_pair!(
            pair,
            markup_spread => {
                let mut inner = pair.clone().into_inner();
                Ok(MarkupAttribute::Spread(Expr::from_pair(next_pair(&pair, &mut inner)?)?))
            },
            markup_named => {
                let mut inner = pair.clone().into_inner();
                let name = Rc::from(next_pair(&pair, &mut inner)?.as_str());
                let value = match inner.next() {
                    Some(value) if value.as_rule() == Rule::string_literal => {
                        Some(Expr::Literal(Literal::from_pair(value)?))
                    }
                    Some(value) => Some(Expr::from_pair(value)?),
                    None => None,
                };
                Ok(MarkupAttribute::Named { name, value })
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantics::parse_expression;

    macro_rules! assert_markup {
        ($source:expr, $expected:expr) => {
            let parsed = parse_expression($source);
            assert!(matches!(parsed, Ok(_)), "{:?}", parsed);
            match parsed.unwrap() {
                Expr::Markup(markup) => assert_eq!(*markup, $expected),
                other => panic!("not markup: {:?}", other),
            }
        };
    }

    fn element(name: TagName, children: Vec<Markup>) -> Markup {
        Markup::Element(MarkupElement {
            name,
            attributes: vec![],
            children,
            self_closing: false,
        })
    }

    #[test]
    fn test_tag_classification() {
        assert_eq!(classify_tag_name("div"), TagName::Static(Rc::from("div")));
        assert_eq!(
            classify_tag_name("my-widget"),
            TagName::Static(Rc::from("my-widget"))
        );
        assert_eq!(classify_tag_name("Card"), TagName::Macro(Expr::ident("Card")));
        assert_eq!(
            classify_tag_name("ui.card"),
            TagName::Macro(Expr::member(Expr::ident("ui"), "card"))
        );
        assert_eq!(classify_tag_name("$tag"), TagName::Dynamic(Expr::ident("tag")));
        assert_eq!(
            classify_tag_name("$props.as"),
            TagName::Dynamic(Expr::member(Expr::ident("props"), "as"))
        );
    }

    #[test]
    fn test_children() {
        assert_markup!(
            "<p>a {x} {} <b>c</b></p>",
            element(
                TagName::Static(Rc::from("p")),
                vec![
                    Markup::Text(Rc::from("a ")),
                    Markup::Expression(Some(Expr::ident("x"))),
                    Markup::Text(Rc::from(" ")),
                    Markup::Expression(None),
                    Markup::Text(Rc::from(" ")),
                    element(
                        TagName::Static(Rc::from("b")),
                        vec![Markup::Text(Rc::from("c"))]
                    ),
                ]
            )
        );
    }

    #[test]
    fn test_fragment() {
        assert_markup!(
            "<><br/>x</>",
            Markup::Fragment(vec![
                Markup::Element(MarkupElement {
                    name: TagName::Static(Rc::from("br")),
                    attributes: vec![],
                    children: vec![],
                    self_closing: true,
                }),
                Markup::Text(Rc::from("x")),
            ])
        );
    }

    #[test]
    fn test_attributes() {
        assert_markup!(
            "<Card {...rest} title=\"hi\" open />",
            Markup::Element(MarkupElement {
                name: TagName::Macro(Expr::ident("Card")),
                attributes: vec![
                    MarkupAttribute::Spread(Expr::ident("rest")),
                    MarkupAttribute::Named {
                        name: Rc::from("title"),
                        value: Some(Expr::Literal(Literal::String {
                            value: Rc::from("hi"),
                            raw: Some(Rc::from("\"hi\"")),
                        })),
                    },
                    MarkupAttribute::Named {
                        name: Rc::from("open"),
                        value: None,
                    },
                ],
                children: vec![],
                self_closing: true,
            })
        );
    }

    #[test]
    fn test_mismatched_closing_tag() {
        let result = parse_expression("<div><span></div></span>");
        assert!(
            matches!(result, Err(Error::MismatchedClosingTag(ref open, ref close, _))
                if open.as_ref() == "span" && close.as_ref() == "div"),
            "{:?}",
            result
        );
    }
}
