//! Syntax tree to values.
//!
//! The reader never evaluates. Parenthesised groups become S-expressions,
//! braced groups become Q-expressions, and comments vanish. Bad numeric
//! literals do not abort reading: they become error values in place, which
//! the evaluator then reports like any other error.

use crate::Error;
use crate::ast::Value;
use crate::parser::{NodeKind, SyntaxNode};

/// Escape sequences understood inside string and character literals,
/// as (escape letter, character) pairs
const ESCAPES: [(char, char); 12] = [
    ('a', '\x07'),
    ('b', '\x08'),
    ('f', '\x0c'),
    ('n', '\n'),
    ('r', '\r'),
    ('t', '\t'),
    ('v', '\x0b'),
    ('\\', '\\'),
    ('\'', '\''),
    ('"', '"'),
    ('?', '?'),
    ('0', '\0'),
];

/// Replace escape sequences with the characters they denote.
/// Unknown escapes are kept as written, backslash included.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(letter) => match ESCAPES.iter().find(|(l, _)| *l == letter) {
                Some(&(_, ch)) => out.push(ch),
                None => {
                    out.push('\\');
                    out.push(letter);
                }
            },
            None => out.push('\\'),
        }
    }
    out
}

/// Inverse of [`unescape`]: produce literal text that reads back as `text`.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        // `?` reads back fine unescaped
        match ESCAPES.iter().find(|(l, ch)| *ch == c && *l != '?') {
            Some(&(letter, _)) => {
                out.push('\\');
                out.push(letter);
            }
            None => out.push(c),
        }
    }
    out
}

fn read_long(text: &str) -> Value {
    text.parse::<i64>()
        .map_or_else(|_| Error::InvalidLong.into(), Value::Long)
}

fn read_double(text: &str) -> Value {
    match text.parse::<f64>() {
        Ok(d) if d.is_infinite() => Error::InvalidDouble.into(),
        Ok(d) if d == 0.0 && text.chars().any(|c| matches!(c, '1'..='9')) => {
            Error::InvalidDouble.into()
        }
        Ok(d) => Value::Double(d),
        Err(_) => Error::InvalidDouble.into(),
    }
}

fn read_symbol(text: &str) -> Value {
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "ok" => Value::Ok,
        name => Value::Symbol(name.to_owned()),
    }
}

/// Text between the delimiters of a string or character literal
fn quoted_body(text: &str) -> &str {
    let mut chars = text.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

fn read_children(node: &SyntaxNode) -> Vec<Value> {
    node.children
        .iter()
        .filter(|child| child.kind != NodeKind::Comment)
        .map(read)
        .collect()
}

/// Turn one syntax node into an unevaluated value.
///
/// A `Top` node reads as a Q-expression of its forms.
pub fn read(node: &SyntaxNode) -> Value {
    match node.kind {
        NodeKind::Integer => read_long(&node.text),
        NodeKind::Float => read_double(&node.text),
        NodeKind::Symbol => read_symbol(&node.text),
        NodeKind::String => Value::String(unescape(quoted_body(&node.text))),
        NodeKind::Char => Value::Char(unescape(quoted_body(&node.text))),
        NodeKind::Comment => Value::SExpr(Vec::new()),
        NodeKind::ParenGroup => Value::SExpr(read_children(node)),
        NodeKind::BraceGroup | NodeKind::Top => Value::QExpr(read_children(node)),
    }
}

/// The top-level forms of a parsed program, in source order.
pub fn read_program(program: &SyntaxNode) -> Vec<Value> {
    read_children(program)
}
