use crate::Error;
use crate::ast::Value;
use crate::evaluator::{
    Environment, FromArg, QList, arg, eval as eval_value, exact, first_and_rest, non_empty,
    non_empty_str,
};

/// An argument that may be either a Q-expression or a string
enum Sequence {
    List(Vec<Value>),
    Text(String),
}

impl FromArg for Sequence {
    const EXPECTED: &'static str = "Q-expression or String";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::QExpr(cells) => Ok(Sequence::List(cells)),
            Value::String(s) => Ok(Sequence::Text(s)),
            other => Err(other),
        }
    }
}

/// Split a non-empty string after its first character.
fn split_first_char(s: &str) -> (&str, &str) {
    let boundary = s.chars().next().map_or(0, char::len_utf8);
    s.split_at(boundary)
}

fn sequence(func: &'static str, args: Vec<Value>) -> Result<Sequence, Error> {
    let [value] = exact::<1>(func, args)?;
    match arg(func, 1, value)? {
        Sequence::List(cells) => non_empty(func, 1, cells).map(Sequence::List),
        Sequence::Text(s) => non_empty_str(func, 1, s).map(Sequence::Text),
    }
}

pub(crate) fn list(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    Ok(Value::QExpr(args))
}

pub(crate) fn head(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    Ok(match sequence("head", args)? {
        Sequence::List(mut cells) => {
            cells.truncate(1);
            Value::QExpr(cells)
        }
        Sequence::Text(s) => Value::String(split_first_char(&s).0.to_owned()),
    })
}

pub(crate) fn first(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    Ok(match sequence("first", args)? {
        Sequence::List(mut cells) => cells.swap_remove(0),
        Sequence::Text(s) => Value::Char(split_first_char(&s).0.to_owned()),
    })
}

pub(crate) fn tail(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    Ok(match sequence("tail", args)? {
        Sequence::List(mut cells) => {
            cells.remove(0);
            Value::QExpr(cells)
        }
        Sequence::Text(s) => Value::String(split_first_char(&s).1.to_owned()),
    })
}

pub(crate) fn init(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [value] = exact::<1>("init", args)?;
    let QList(cells) = arg("init", 1, value)?;
    let mut cells = non_empty("init", 1, cells)?;
    cells.pop();
    Ok(Value::QExpr(cells))
}

pub(crate) fn eval(env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [value] = exact::<1>("eval", args)?;
    let QList(cells) = arg("eval", 1, value)?;
    Ok(eval_value(env, Value::SExpr(cells)))
}

/// All Q-expressions or all strings, decided by the first argument.
/// S-expressions count as Q-expressions.
pub(crate) fn join(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let quoted = args.into_iter().map(|value| match value {
        Value::SExpr(cells) => Value::QExpr(cells),
        other => other,
    });
    let (first, rest) = first_and_rest("join", quoted.collect())?;
    let rest = rest.into_iter().zip(2..);

    match first {
        Value::QExpr(mut cells) => {
            for (value, position) in rest {
                let QList(more) = arg("join", position, value)?;
                cells.extend(more);
            }
            Ok(Value::QExpr(cells))
        }
        Value::String(mut text) => {
            for (value, position) in rest {
                text.push_str(&arg::<String>("join", position, value)?);
            }
            Ok(Value::String(text))
        }
        other => Err(Error::Type {
            func: "join",
            position: 1,
            got: other.kind(),
            expected: "String or Q-expression",
        }),
    }
}

pub(crate) fn cons(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [value, list] = exact::<2>("cons", args)?;
    let QList(mut cells) = arg("cons", 2, list)?;
    cells.insert(0, value);
    Ok(Value::QExpr(cells))
}

pub(crate) fn len(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [value] = exact::<1>("len", args)?;
    let QList(cells) = arg("len", 1, value)?;
    i64::try_from(cells.len())
        .map(Value::Long)
        .map_err(|_| Error::Overflow("len"))
}
