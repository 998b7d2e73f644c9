use pest::iterators::{Pair, Pairs};
use std::result::Result;
use std::{fmt, rc::Rc};

use crate::parser::Rule;

/// Syntax tree nodes read from a single grammar pair.
pub trait FromPair: Sized {
    fn from_pair(pair: Pair<'_, Rule>) -> Result<Self, Error>;
}

macro_rules! process_pair {
    ($pair:ident, $($($expected_rule:ident)|+ => $process:expr),+ $(,)?) => {
        match $pair.as_rule() {
            $($(Rule::$expected_rule)|+ => $process,)+
            _ => return Err(Error::unexpected_token(&$pair, vec![$($(Rule::$expected_rule),+),+])),
        }
    };
}

/// Keyword pairs carry no information beyond their position.
pub fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_import
            | Rule::kw_as
            | Rule::kw_from
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_for
            | Rule::kw_of
            | Rule::kw_return
    )
}

/// The inner pairs of `pair`, without keywords.
pub fn significant_pairs<'a>(pair: &Pair<'a, Rule>) -> Vec<Pair<'a, Rule>> {
    pair.clone()
        .into_inner()
        .filter(|p| !is_keyword(p.as_rule()))
        .collect()
}

pub fn next_pair<'a>(
    parent: &Pair<'a, Rule>,
    pairs: &mut Pairs<'a, Rule>,
) -> Result<Pair<'a, Rule>, Error> {
    return match pairs.next() {
        Some(pair) => Ok(pair),
        _ => Err(Error::missing_pair(parent)),
    };
}

pub fn pair_at<'a>(
    parent: &Pair<'a, Rule>,
    pairs: &[Pair<'a, Rule>],
    index: usize,
) -> Result<Pair<'a, Rule>, Error> {
    return match pairs.get(index) {
        Some(pair) => Ok(pair.clone()),
        _ => Err(Error::missing_pair(parent)),
    };
}

/// Where a pair starts: its 1-based line and column, and the source line it is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePosition {
    pub line: usize,
    pub column: usize,
    source_line: Rc<str>,
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(
            f,
            "{}:{} `{}`",
            self.line,
            self.column,
            self.source_line.trim()
        );
    }
}

impl From<pest::Position<'_>> for LinePosition {
    fn from(value: pest::Position) -> Self {
        let (line, column) = value.line_col();
        return LinePosition {
            line,
            column,
            source_line: Rc::from(value.line_of()),
        };
    }
}

impl From<&'_ Pair<'_, Rule>> for LinePosition {
    fn from(value: &Pair<'_, Rule>) -> Self {
        return value.as_span().start_pos().into();
    }
}

#[derive(Debug, Clone)]
pub enum Error {
    /// The input does not match the grammar.
    Syntax(Box<pest::error::Error<Rule>>),
    /// A pair of the first rule turned up where one of the listed rules belongs.
    UnexpectedToken(Rule, Vec<Rule>, LinePosition),
    /// A pair of the given rule ended before all of its parts were read.
    MissingPair(Rule, LinePosition),
    /// A closing tag did not match its opening tag.
    MismatchedClosingTag(Rc<str>, Rc<str>, LinePosition),
    /// A number literal could not be represented.
    InvalidNumber(Rc<str>, LinePosition),
}

impl Error {
    pub fn missing_pair(parent: &Pair<'_, Rule>) -> Error {
        return Self::MissingPair(parent.as_rule(), parent.into());
    }

    pub fn unexpected_token(found: &Pair<'_, Rule>, expected: Vec<Rule>) -> Error {
        return Self::UnexpectedToken(found.as_rule(), expected, found.into());
    }

    pub fn mismatched_closing_tag<'a>(open: &str, close: &Pair<'a, Rule>) -> Error {
        return Self::MismatchedClosingTag(Rc::from(open), Rc::from(close.as_str()), close.into());
    }
}

impl From<pest::error::Error<Rule>> for Error {
    fn from(value: pest::error::Error<Rule>) -> Self {
        return Error::Syntax(Box::new(value));
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return match self {
            Self::Syntax(error) => write!(f, "syntax error\n{}", error),
            Self::MissingPair(parent, at) => {
                write!(f, "incomplete {:?} at {}", parent, at)
            }
            Self::UnexpectedToken(found, expected, at) => write!(
                f,
                "found {:?} where one of {:?} belongs at {}",
                found, expected, at
            ),
            Self::MismatchedClosingTag(open, close, at) => write!(
                f,
                "closing tag </{}> does not match <{}> at {}",
                close, open, at
            ),
            Self::InvalidNumber(found, at) => write!(f, "invalid number {} at {}", found, at),
        };
    }
}
