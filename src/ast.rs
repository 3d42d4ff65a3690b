//! This module defines the runtime value model of the interpreter. The main enum,
//! [`Value`], is a closed set of variants covering numbers, booleans, symbols,
//! strings, characters, functions, the two list forms (S-expressions and
//! Q-expressions), open files, errors and the `ok` marker.
//!
//! Values form an owned tree: lists own their elements and a closure owns its
//! private [`Environment`]. Cloning is therefore a deep copy, except for
//! builtins, which are plain function pointers, and file handles, which share
//! the underlying OS handle.
//!
//! Equality and display follow the language rules rather than Rust's derived
//! behaviour: numbers compare across `Long`/`Double`, builtins compare by name,
//! and the printer emits text the reader accepts back. Helper functions such as
//! [`val`], [`sym`], [`qexpr`] and [`sexpr`] keep construction terse in code and tests.

use std::fmt;

use crate::Error;
use crate::builtinops::file::FileHandle;
use crate::evaluator::{Arity, Environment};
use crate::reader::escape;

/// Type tag of a [`Value`], named the way error messages name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Error,
    Long,
    Double,
    Bool,
    Symbol,
    String,
    Char,
    Function,
    SExpr,
    QExpr,
    Ok,
    File,
}

impl Kind {
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Error => "Error",
            Kind::Long => "Long",
            Kind::Double => "Double",
            Kind::Bool => "Boolean",
            Kind::Symbol => "Symbol",
            Kind::String => "String",
            Kind::Char => "Character",
            Kind::Function => "Function",
            Kind::SExpr => "S-expression",
            Kind::QExpr => "Q-expression",
            Kind::Ok => "OK",
            Kind::File => "File",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signature shared by every primitive operation.
///
/// A primitive owns its argument vector and may consume or rearrange it.
/// Returning `Err` is equivalent to returning the corresponding error value.
pub type BuiltinFn = fn(&mut Environment, Vec<Value>) -> Result<Value, Error>;

/// A primitive operation bound into an environment.
///
/// `name` is the canonical registry name. Aliases share it, so `(== + add)` holds.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub func: BuiltinFn,
}

impl Builtin {
    /// Validate the argument count, then run the primitive.
    pub fn invoke(&self, env: &mut Environment, args: Vec<Value>) -> Value {
        match self.arity.validate(self.name, args.len()) {
            Ok(()) => (self.func)(env, args).unwrap_or_else(Value::from),
            Err(e) => e.into(),
        }
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

/// A user-defined function, possibly partially applied.
///
/// `env` holds the parameters bound so far. It has no parent until the
/// closure is actually applied.
#[derive(Debug, Clone)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Vec<Value>,
    pub env: Environment,
}

#[derive(Debug, Clone)]
pub enum Function {
    Builtin(Builtin),
    Lambda(Box<Lambda>),
}

/// Runtime value of the language.
#[derive(Debug, Clone)]
pub enum Value {
    /// Error message; terminal, propagates through evaluation
    Error(String),
    Long(i64),
    Double(f64),
    Bool(bool),
    /// "Succeeded, nothing to report"
    Ok,
    Symbol(String),
    String(String),
    /// A single character, kept as a string
    Char(String),
    Function(Function),
    /// Evaluated list: the head is called with the rest as arguments
    SExpr(Vec<Value>),
    /// Quoted list, never evaluated automatically
    QExpr(Vec<Value>),
    File(FileHandle),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Error(_) => Kind::Error,
            Value::Long(_) => Kind::Long,
            Value::Double(_) => Kind::Double,
            Value::Bool(_) => Kind::Bool,
            Value::Ok => Kind::Ok,
            Value::Symbol(_) => Kind::Symbol,
            Value::String(_) => Kind::String,
            Value::Char(_) => Kind::Char,
            Value::Function(_) => Kind::Function,
            Value::SExpr(_) => Kind::SExpr,
            Value::QExpr(_) => Kind::QExpr,
            Value::File(_) => Kind::File,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Construct a closure with no parameters bound yet.
    pub fn lambda(params: Vec<String>, body: Vec<Value>) -> Value {
        Value::Function(Function::Lambda(Box::new(Lambda {
            params,
            body,
            env: Environment::new(),
        })))
    }
}

impl From<Error> for Value {
    fn from(e: Error) -> Self {
        Value::Error(e.to_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Long(i64::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

// Rust sequences become quoted lists: data, not code.
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::QExpr(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::QExpr(arr.into_iter().map(Into::into).collect())
    }
}

/// Helper function for creating values
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating symbols
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Q-expressions from mixed values
pub fn qexpr<I: IntoIterator<Item = Value>>(items: I) -> Value {
    Value::QExpr(items.into_iter().collect())
}

/// Helper function for creating S-expressions from mixed values
pub fn sexpr<I: IntoIterator<Item = Value>>(items: I) -> Value {
    Value::SExpr(items.into_iter().collect())
}

impl PartialEq for Value {
    #[expect(clippy::cast_precision_loss, clippy::float_cmp)] // numeric equality is exact
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Long(a), Value::Double(b)) | (Value::Double(b), Value::Long(a)) => {
                *a as f64 == *b
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Ok, Value::Ok) => true,
            (Value::Error(a), Value::Error(b))
            | (Value::Symbol(a), Value::Symbol(b))
            | (Value::String(a), Value::String(b))
            | (Value::Char(a), Value::Char(b)) => a == b,
            (Value::SExpr(a), Value::SExpr(b)) | (Value::QExpr(a), Value::QExpr(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::File(a), Value::File(b)) => a.name() == b.name(),
            _ => false,
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Builtin(a), Function::Builtin(b)) => a.name == b.name,
            (Function::Lambda(a), Function::Lambda(b)) => {
                a.params == b.params && a.body == b.body
            }
            _ => false,
        }
    }
}

fn write_cells(f: &mut fmt::Formatter<'_>, open: char, cells: &[Value], close: char) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{cell}")?;
    }
    write!(f, "{close}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Error(msg) => write!(f, "Error: {msg}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Double(d) => {
                // Always keep a decimal point so the text reads back as a Double.
                let text = d.to_string();
                if d.is_finite() && !text.contains('.') {
                    write!(f, "{text}.0")
                } else {
                    write!(f, "{text}")
                }
            }
            Value::Bool(b) => write!(f, "{b}"),
            Value::Ok => write!(f, "ok"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::String(s) => write!(f, "\"{}\"", escape(s)),
            Value::Char(c) => write!(f, "'{}'", escape(c)),
            Value::Function(func) => write!(f, "{func}"),
            Value::SExpr(cells) => write_cells(f, '(', cells, ')'),
            Value::QExpr(cells) => write_cells(f, '{', cells, '}'),
            Value::File(handle) => write!(f, "{handle}"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Builtin(_) => write!(f, "<builtin>"),
            Function::Lambda(lambda) => {
                write!(f, "(\\ {{")?;
                for (i, param) in lambda.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, "}} ")?;
                write_cells(f, '{', &lambda.body, '}')?;
                write!(f, ")")
            }
        }
    }
}
