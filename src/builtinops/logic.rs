use std::cmp::Ordering;

use crate::Error;
use crate::ast::Value;
use crate::builtinops::arith::Number;
use crate::evaluator::{Bound, Environment, all, arg, eval, exact};

/// True when `holds` is satisfied by every adjacent pair.
fn chained<T>(values: &[T], holds: impl Fn(&T, &T) -> bool) -> bool {
    values
        .windows(2)
        .all(|pair| matches!(pair, [a, b] if holds(a, b)))
}

fn equality(args: &[Value]) -> bool {
    chained(args, |a, b| a == b)
}

pub(crate) fn eq(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    Ok(Value::Bool(equality(&args)))
}

pub(crate) fn ne(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    Ok(Value::Bool(!equality(&args)))
}

fn ordering(func: &'static str, args: Vec<Value>, test: fn(Ordering) -> bool) -> Result<Value, Error> {
    let numbers: Vec<Number> = all(func, args)?;
    Ok(Value::Bool(chained(&numbers, |a, b| {
        a.compare(*b).is_some_and(test)
    })))
}

// Macro to generate the numeric ordering builtins
macro_rules! numeric_ordering {
    ($name:ident, $func:expr, $test:expr) => {
        pub(crate) fn $name(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
            ordering($func, args, $test)
        }
    };
}

numeric_ordering!(gt, ">", Ordering::is_gt);
numeric_ordering!(lt, "<", Ordering::is_lt);
numeric_ordering!(ge, ">=", Ordering::is_ge);
numeric_ordering!(le, "<=", Ordering::is_le);

pub(crate) fn or(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let flags: Vec<bool> = all("||", args)?;
    Ok(Value::Bool(flags.into_iter().any(|b| b)))
}

pub(crate) fn and(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let flags: Vec<bool> = all("&&", args)?;
    Ok(Value::Bool(flags.into_iter().all(|b| b)))
}

pub(crate) fn not(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [value] = exact::<1>("!", args)?;
    let flag: bool = arg("!", 1, value)?;
    Ok(Value::Bool(!flag))
}

/// A non-empty Q-expression branch runs as code; anything else is evaluated as is.
fn eval_branch(env: &mut Environment, branch: Value) -> Value {
    match branch {
        Value::QExpr(cells) if !cells.is_empty() => eval(env, Value::SExpr(cells)),
        other => eval(env, other),
    }
}

pub(crate) fn if_(env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let got = args.len();
    let mut args = args.into_iter();
    let (Some(condition), Some(then_branch)) = (args.next(), args.next()) else {
        return Err(Error::Arity {
            func: "if",
            got,
            expected: Bound::AtLeast(2),
        });
    };
    let else_branch = args.next();

    let condition: bool = arg("if", 1, condition)?;
    Ok(match (condition, else_branch) {
        (true, _) => eval_branch(env, then_branch),
        (false, Some(branch)) => eval_branch(env, branch),
        (false, None) => Value::Ok,
    })
}
