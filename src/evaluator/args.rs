use std::fmt;

use crate::Error;
use crate::ast::Value;
use crate::builtinops::file::FileHandle;

// Argument plumbing for the builtin library: arity bounds and typed
// extraction of positional arguments. Every failure here produces one of
// the arity/type/empty messages that Lispy code sees as an error value.

/// Number of arguments accepted by a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    AtMost(usize),
    /// Inclusive range
    Between(usize, usize),
    Any,
}

impl Arity {
    /// Check `got` against this bound. The error names the bound that was violated,
    /// so `Between(2, 3)` reports "at least 2" or "at most 3".
    pub fn validate(self, func: &'static str, got: usize) -> Result<(), Error> {
        let violated = match self {
            Arity::Exact(n) if got != n => Some(Bound::Exact(n)),
            Arity::AtLeast(min) | Arity::Between(min, _) if got < min => Some(Bound::AtLeast(min)),
            Arity::AtMost(max) | Arity::Between(_, max) if got > max => Some(Bound::AtMost(max)),
            _ => None,
        };
        match violated {
            Some(expected) => Err(Error::Arity {
                func,
                got,
                expected,
            }),
            None => Ok(()),
        }
    }
}

/// The side of an [`Arity`] a call fell outside of, as named in arity errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact(usize),
    AtLeast(usize),
    AtMost(usize),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Exact(n) => write!(f, "{n}"),
            Bound::AtLeast(n) => write!(f, "at least {n}"),
            Bound::AtMost(n) => write!(f, "at most {n}"),
        }
    }
}

/// Conversion of one argument into the Rust type a builtin works with.
///
/// On mismatch the value is handed back so the caller can name its type.
pub(crate) trait FromArg: Sized {
    /// Type name(s) shown in the "expected ..." part of the error
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> Result<Self, Value>;
}

impl FromArg for i64 {
    const EXPECTED: &'static str = "Long";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Long(n) => Ok(n),
            other => Err(other),
        }
    }
}

impl FromArg for bool {
    const EXPECTED: &'static str = "Boolean";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromArg for String {
    const EXPECTED: &'static str = "String";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromArg for FileHandle {
    const EXPECTED: &'static str = "File";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::File(handle) => Ok(handle),
            other => Err(other),
        }
    }
}

/// Elements of a Q-expression argument
pub(crate) struct QList(pub Vec<Value>);

impl FromArg for QList {
    const EXPECTED: &'static str = "Q-expression";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::QExpr(cells) => Ok(QList(cells)),
            other => Err(other),
        }
    }
}

/// Payload of a Character argument
pub(crate) struct Chr(pub String);

impl FromArg for Chr {
    const EXPECTED: &'static str = "Character";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Char(c) => Ok(Chr(c)),
            other => Err(other),
        }
    }
}

/// Convert argument number `position` (1-based) of `func`.
pub(crate) fn arg<T: FromArg>(func: &'static str, position: usize, value: Value) -> Result<T, Error> {
    T::from_value(value).map_err(|other| Error::Type {
        func,
        position,
        got: other.kind(),
        expected: T::EXPECTED,
    })
}

/// Convert every argument of `func` to `T`, in order.
pub(crate) fn all<T: FromArg>(func: &'static str, args: Vec<Value>) -> Result<Vec<T>, Error> {
    args.into_iter()
        .enumerate()
        .map(|(i, value)| arg(func, i + 1, value))
        .collect()
}

/// Split the argument vector into exactly `N` values.
pub(crate) fn exact<const N: usize>(
    func: &'static str,
    args: Vec<Value>,
) -> Result<[Value; N], Error> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| Error::Arity {
        func,
        got,
        expected: Bound::Exact(N),
    })
}

/// Split off the first argument of a function taking at least one.
pub(crate) fn first_and_rest(
    func: &'static str,
    mut args: Vec<Value>,
) -> Result<(Value, Vec<Value>), Error> {
    if args.is_empty() {
        return Err(Error::Arity {
            func,
            got: 0,
            expected: Bound::AtLeast(1),
        });
    }
    let first = args.remove(0);
    Ok((first, args))
}

/// Reject an empty Q-expression passed as argument `position`.
pub(crate) fn non_empty(
    func: &'static str,
    position: usize,
    cells: Vec<Value>,
) -> Result<Vec<Value>, Error> {
    if cells.is_empty() {
        Err(Error::Empty {
            func,
            position,
            what: "Q-expression",
        })
    } else {
        Ok(cells)
    }
}

/// Reject an empty string passed as argument `position`.
pub(crate) fn non_empty_str(func: &'static str, position: usize, s: String) -> Result<String, Error> {
    if s.is_empty() {
        Err(Error::Empty {
            func,
            position,
            what: "string",
        })
    } else {
        Ok(s)
    }
}
