//! Lispy - a small Lisp with quoted lists and errors as values
//!
//! This crate implements a compact, dynamically typed Lisp dialect in the
//! tradition of "build your own Lisp" interpreters. Programs are made of two
//! kinds of list: S-expressions, which the evaluator reduces, and
//! Q-expressions, which are quoted data and never evaluated automatically.
//!
//! ```text
//! (+ 1 2 3)                     ; arithmetic
//! {+ 1 2}                       ; quoted, evaluates to itself
//! (eval {+ 1 2})                ; 3
//! (def {add} (\ {x y} {+ x y})) ; closures with partial application
//! (add 1)                       ; (\ {y} {+ x y})
//! ```
//!
//! ## Errors are values
//!
//! Nothing inside the language unwinds. Every failing operation produces a
//! [`ast::Value::Error`], and reducing an S-expression returns the first error
//! found among its evaluated elements. On the host side the same failures are
//! described by [`Error`], which converts into an error value.
//!
//! ## Scoping
//!
//! Closure parameters are bound lexically into a private frame, but the frame's
//! parent is the environment of the *caller*, attached for the duration of the
//! call. Free variables in a body therefore resolve dynamically.
//!
//! ## Modules
//!
//! - `parser`: source text to a tagged syntax tree
//! - `reader`: syntax tree to unevaluated values
//! - `evaluator`: environments, reduction rules and closure application
//! - `builtinops`: the registry of primitive operations
//! - `ast`: the value model and its printer

use std::fmt;

use crate::ast::Kind;
use crate::evaluator::Bound;

/// Maximum nesting depth accepted by the parser.
/// Bounds the recursion of the parser, the reader and plain S-expression reduction.
pub const MAX_PARSE_DEPTH: usize = 128;

/// Maximum number of nested closure frames.
///
/// A closure application beyond this depth yields an error value, provided
/// the evaluating thread has a stack of [`INTERPRETER_STACK_SIZE`]. Each
/// nested call costs several kilobytes of host stack in unoptimized builds,
/// so the 2 MiB default of spawned threads overflows at roughly 200 levels.
pub const MAX_CALL_DEPTH: usize = 512;

/// Stack size for a thread running the evaluator, enough to reach
/// [`MAX_CALL_DEPTH`] and [`MAX_PARSE_DEPTH`] in any build profile.
pub const INTERPRETER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, unbalanced closing brackets)
    InvalidSyntax,
    /// Input ended before the expression was complete (unterminated string, unclosed group)
    Incomplete,
    /// Expression nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred
    pub context: Option<String>,
    /// The problematic character encountered, if any
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a ParseError with a context snippet taken from `input` around `error_offset`
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 60;

        let found = input
            .get(error_offset..)
            .and_then(|rest| rest.chars().next())
            .map(String::from);

        let mut start = error_offset.saturating_sub(20).min(input.len());
        while !input.is_char_boundary(start) {
            start -= 1;
        }
        let snippet: String = input[start..].chars().take(MAX_CONTEXT).collect();

        let mut context = String::new();
        if start > 0 {
            context.push_str("[...]");
        }
        context.push_str(&snippet);
        if start + snippet.len() < input.len() {
            context.push_str("[...]");
        }
        let context = context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(context), found)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ParseError: {}", self.message)?;
        if let Some(found) = &self.found {
            write!(f, "\nFound: {found}")?;
        }
        if let Some(context) = &self.context {
            write!(f, "\nContext: {context}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Failures raised by the parser, the evaluator and the builtin library.
///
/// Inside the language every variant is observed as a [`ast::Value::Error`]
/// carrying the `Display` text, see `impl From<Error> for Value`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unbound symbol: '{0}'")]
    UnboundSymbol(String),

    #[error("Invalid number of arguments passed to '{func}'. Got {got}, expected {expected}.")]
    Arity {
        func: &'static str,
        got: usize,
        expected: Bound,
    },

    #[error(
        "Incorrect type for argument #{position} passed to '{func}'. Got {got}, expected {expected}."
    )]
    Type {
        func: &'static str,
        position: usize,
        got: Kind,
        expected: &'static str,
    },

    #[error("Empty {what} passed to '{func}' as argument #{position}.")]
    Empty {
        func: &'static str,
        position: usize,
        what: &'static str,
    },

    #[error("S-expression starts with incorrect type. Got {0}, expected Function.")]
    NotCallable(Kind),

    #[error("Function passed too many arguments. Got {got}, expected {expected}.")]
    TooManyArguments { got: usize, expected: usize },

    #[error("Function format invalid. Symbol '&' not followed by a single symbol.")]
    MalformedVariadic,

    #[error("The first argument to '{func}' must be a list of symbols. Got {got}, expected Symbol.")]
    NotASymbol { func: &'static str, got: Kind },

    #[error(
        "The number of symbols defined by '{func}' must be equal to the number of values. Got {got}, expected {expected}."
    )]
    BindingCount {
        func: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo arguments must be whole numbers")]
    ModuloNonInteger,

    #[error("integer overflow in '{0}'")]
    Overflow(&'static str),

    /// A Double operation produced an infinity or NaN
    #[error("non-finite result in '{0}'")]
    NonFinite(&'static str),

    #[error("invalid long")]
    InvalidLong,

    #[error("invalid double")]
    InvalidDouble,

    #[error("call depth limit exceeded (max: {})", MAX_CALL_DEPTH)]
    DepthExceeded,

    #[error("Could not load file {path}.\n\n{reason}")]
    Load { path: String, reason: String },

    /// File builtin failures; the message is shown as-is
    #[error("{0}")]
    File(String),

    /// Raised from Lispy code with `error`
    #[error("{0}")]
    User(String),
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod parser;
pub mod reader;

pub use ast::Value;
pub use evaluator::{Environment, create_global_env, eval, eval_source};
