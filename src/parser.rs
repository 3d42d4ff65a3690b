//! Source text to syntax tree.
//!
//! The grammar, in order of preference:
//!
//! ```text
//! double  : -?[0-9]+\.[0-9]+      (not followed by a symbol character)
//! long    : -?[0-9]+              (not followed by a symbol character or '.')
//! symbol  : [alphanumeric _+-*/\=<>!?&%|^]+
//! string  : "(\\.|[^"\\])*"
//! char    : '(\\.|[^'\\])'
//! comment : ;[^\r\n]*
//! sexpr   : '(' expr* ')'
//! qexpr   : '{' expr* '}'
//! program : expr* EOF
//! ```
//!
//! Whitespace may separate any two tokens. The parser only recognises
//! structure: atoms keep their raw text (quotes and escapes included) and the
//! [`crate::reader`] turns them into values.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{anychar, char, digit1, multispace0, none_of, satisfy},
    combinator::{cut, eof, map, not, opt, recognize},
    error::ErrorKind,
    multi::many0,
    sequence::{pair, preceded, terminated},
};

use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Non-alphanumeric characters allowed in symbol names
pub(crate) const SYMBOL_SPECIAL_CHARS: &str = "_+-*/\\=<>!?&%|^";

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)
}

/// Tag of a [`SyntaxNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Integer,
    Float,
    Symbol,
    String,
    Char,
    Comment,
    /// `( ... )`
    ParenGroup,
    /// `{ ... }`
    BraceGroup,
    /// The whole input
    Top,
}

/// A node of the syntax tree.
///
/// Atoms carry their source text and no children; groups and `Top` carry
/// children and an empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub text: String,
    /// Byte offset of the node in the source
    pub offset: usize,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    fn atom(kind: NodeKind, text: &str, offset: usize) -> Self {
        SyntaxNode {
            kind,
            text: text.to_owned(),
            offset,
            children: Vec::new(),
        }
    }

    fn group(kind: NodeKind, offset: usize, children: Vec<SyntaxNode>) -> Self {
        SyntaxNode {
            kind,
            text: String::new(),
            offset,
            children,
        }
    }
}

/// Convert nom parsing errors to user-friendly messages
fn to_parse_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = input.len().saturating_sub(e.input.len());
            let (kind, message) = match e.code {
                ErrorKind::TooLarge => (
                    ParseErrorKind::TooDeeplyNested,
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                ),
                _ if e.input.is_empty() => (
                    ParseErrorKind::Incomplete,
                    "Unexpected end of input".to_owned(),
                ),
                _ => {
                    let near: String = e.input.chars().take(10).collect();
                    (
                        ParseErrorKind::InvalidSyntax,
                        format!("Invalid syntax near '{near}'"),
                    )
                }
            };
            ParseError::with_context(kind, message, input, offset)
        }
        nom::Err::Incomplete(_) => ParseError::new(
            ParseErrorKind::Incomplete,
            "Incomplete input",
            None,
            None,
        ),
    }
}

fn double(input: &str) -> IResult<&str, &str> {
    terminated(
        recognize((opt(char('-')), digit1, char('.'), digit1)),
        not(satisfy(is_symbol_char)),
    )
    .parse(input)
}

fn long(input: &str) -> IResult<&str, &str> {
    terminated(
        recognize(pair(opt(char('-')), digit1)),
        not(satisfy(|c| is_symbol_char(c) || c == '.')),
    )
    .parse(input)
}

fn symbol(input: &str) -> IResult<&str, &str> {
    take_while1(is_symbol_char).parse(input)
}

/// A backslash and the character it escapes
fn escape_sequence(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('\\'), anychar)).parse(input)
}

fn string(input: &str) -> IResult<&str, &str> {
    recognize((
        char('"'),
        cut((
            many0(alt((escape_sequence, recognize(none_of("\\\""))))),
            char('"'),
        )),
    ))
    .parse(input)
}

fn character(input: &str) -> IResult<&str, &str> {
    recognize((
        char('\''),
        cut((
            alt((escape_sequence, recognize(none_of("\\'")))),
            char('\''),
        )),
    ))
    .parse(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char(';'), take_while(|c| c != '\n' && c != '\r'))).parse(input)
}

/// Grammar over one source text, used to compute node offsets.
struct Grammar<'s> {
    source: &'s str,
}

impl<'s> Grammar<'s> {
    fn offset(&self, rest: &str) -> usize {
        self.source.len() - rest.len()
    }

    fn expr(&self, input: &'s str, depth: usize) -> IResult<&'s str, SyntaxNode> {
        let offset = self.offset(input);
        let atom = |kind| move |text: &str| SyntaxNode::atom(kind, text, offset);

        alt((
            map(double, atom(NodeKind::Float)),
            map(long, atom(NodeKind::Integer)),
            map(symbol, atom(NodeKind::Symbol)),
            map(string, atom(NodeKind::String)),
            map(character, atom(NodeKind::Char)),
            map(comment, atom(NodeKind::Comment)),
            |i| self.group(i, ('(', ')'), NodeKind::ParenGroup, depth),
            |i| self.group(i, ('{', '}'), NodeKind::BraceGroup, depth),
        ))
        .parse(input)
    }

    fn group(
        &self,
        input: &'s str,
        (open, close): (char, char),
        kind: NodeKind,
        depth: usize,
    ) -> IResult<&'s str, SyntaxNode> {
        let offset = self.offset(input);
        let (input, _) = char(open).parse(input)?;
        if depth >= MAX_PARSE_DEPTH {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                ErrorKind::TooLarge,
            )));
        }

        let (input, children) = cut(terminated(
            many0(preceded(multispace0, |i| self.expr(i, depth + 1))),
            pair(multispace0, char(close)),
        ))
        .parse(input)?;

        Ok((input, SyntaxNode::group(kind, offset, children)))
    }
}

/// Parse a whole program (a file, a REPL line, the argument of `read`) into a `Top` node.
pub fn parse_program(source: &str) -> Result<SyntaxNode, Error> {
    let grammar = Grammar { source };

    terminated(
        many0(preceded(multispace0, |i| grammar.expr(i, 0))),
        pair(multispace0, eof),
    )
    .parse(source)
    .map(|(_, children)| SyntaxNode::group(NodeKind::Top, 0, children))
    .map_err(|e| Error::Parse(to_parse_error(source, e)))
}
