use crate::syntax::{Expr, Program};

/// A translator takes a program and translates it to source text of another language.
pub trait Translator {
    /// Translate the program into text, ready to save to a file.
    fn translate(program: &Program) -> String;

    /// Translate a single expression.
    fn translate_expression(expr: &Expr) -> String;
}

/// Quotes `s` as a double-quoted string literal.
pub fn quote_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => result.push_str("\\0"),
            c if c.is_control() => result.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => result.push(c),
        }
    }
    result.push('"');
    result
}
