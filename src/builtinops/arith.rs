//! Arithmetic over Longs and Doubles.
//!
//! Every operator folds its arguments left to right. A Long result is only
//! produced when both operands are Longs; any Double operand promotes the
//! step to Double.

use std::cmp::Ordering;

use crate::Error;
use crate::ast::Value;
use crate::evaluator::{Environment, FromArg, all};

/// A numeric argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Long(i64),
    Double(f64),
}

impl Number {
    #[expect(clippy::cast_precision_loss)] // Long to Double promotion
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Long(n) => n as f64,
            Number::Double(d) => d,
        }
    }

    fn is_negative(self) -> bool {
        match self {
            Number::Long(n) => n < 0,
            Number::Double(d) => d < 0.0,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Long(n) => n == 0,
            Number::Double(d) => d == 0.0,
        }
    }

    /// Numeric ordering across representations; `None` only involves NaN.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Long(a), Number::Long(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Long(n) => Value::Long(n),
            Number::Double(d) => Value::Double(d),
        }
    }
}

impl FromArg for Number {
    const EXPECTED: &'static str = "Long or Double";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Long(n) => Ok(Number::Long(n)),
            Value::Double(d) => Ok(Number::Double(d)),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Min,
    Max,
}

/// `base ^ exp` on Longs. Negative exponents go through floating point and truncate.
/// A zero base with a negative exponent is rejected before this is called.
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn long_pow(base: i64, exp: i64) -> Option<i64> {
    if exp < 0 {
        let power = (base as f64).powf(exp as f64).trunc();
        // i64::MAX as f64 rounds up to 2^63, which is out of range
        let in_range = power >= i64::MIN as f64 && power < i64::MAX as f64;
        return in_range.then_some(power as i64);
    }
    match (base, u32::try_from(exp)) {
        (_, Ok(exp)) => base.checked_pow(exp),
        (0 | 1, Err(_)) => Some(base),
        (-1, Err(_)) => Some(if exp % 2 == 0 { 1 } else { -1 }),
        _ => None,
    }
}

fn long_step(op: Op, a: i64, b: i64) -> Option<i64> {
    match op {
        Op::Add => a.checked_add(b),
        Op::Sub => a.checked_sub(b),
        Op::Mul => a.checked_mul(b),
        Op::Div => a.checked_div(b),
        Op::Rem => a.checked_rem(b),
        Op::Pow => long_pow(a, b),
        Op::Min => Some(a.min(b)),
        Op::Max => Some(a.max(b)),
    }
}

fn double_step(op: Op, a: f64, b: f64) -> f64 {
    match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::Rem => a % b,
        Op::Pow => a.powf(b),
        Op::Min => a.min(b),
        Op::Max => a.max(b),
    }
}

fn step(op: Op, func: &'static str, x: Number, y: Number) -> Result<Number, Error> {
    match op {
        // min and max return one of their operands unchanged; ties keep the first
        Op::Min => Ok(if y.compare(x) == Some(Ordering::Less) { y } else { x }),
        Op::Max => Ok(if y.compare(x) == Some(Ordering::Greater) { y } else { x }),
        Op::Rem if !matches!((x, y), (Number::Long(_), Number::Long(_))) => {
            Err(Error::ModuloNonInteger)
        }
        Op::Div | Op::Rem if y.is_zero() => Err(Error::DivisionByZero),
        // 0 ^ -n is 1 / 0 ^ n
        Op::Pow if x.is_zero() && y.is_negative() => Err(Error::DivisionByZero),
        _ => match (x, y) {
            (Number::Long(a), Number::Long(b)) => long_step(op, a, b)
                .map(Number::Long)
                .ok_or(Error::Overflow(func)),
            (a, b) => {
                let result = double_step(op, a.as_f64(), b.as_f64());
                if result.is_finite() {
                    Ok(Number::Double(result))
                } else {
                    Err(Error::NonFinite(func))
                }
            }
        },
    }
}

fn fold(op: Op, func: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let numbers: Vec<Number> = all(func, args)?;
    let Some((&first, rest)) = numbers.split_first() else {
        return Err(Error::Arity {
            func,
            got: 0,
            expected: crate::evaluator::Bound::AtLeast(1),
        });
    };

    if op == Op::Sub && rest.is_empty() {
        return match first {
            Number::Long(n) => n.checked_neg().map(Value::Long).ok_or(Error::Overflow(func)),
            Number::Double(d) => Ok(Value::Double(-d)),
        };
    }

    rest.iter()
        .try_fold(first, |acc, &n| step(op, func, acc, n))
        .map(Value::from)
}

macro_rules! arithmetic_builtin {
    ($name:ident, $op:expr, $func:expr) => {
        pub(crate) fn $name(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
            fold($op, $func, args)
        }
    };
}

arithmetic_builtin!(add, Op::Add, "+");
arithmetic_builtin!(sub, Op::Sub, "-");
arithmetic_builtin!(mul, Op::Mul, "*");
arithmetic_builtin!(div, Op::Div, "/");
arithmetic_builtin!(rem, Op::Rem, "%");
arithmetic_builtin!(pow, Op::Pow, "^");
arithmetic_builtin!(min, Op::Min, "min");
arithmetic_builtin!(max, Op::Max, "max");
