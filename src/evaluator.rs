//! Reduction rules and closure application.
//!
//! Evaluation is a plain recursive reduction over owned values:
//!
//! - a symbol evaluates to a copy of its binding;
//! - an S-expression evaluates all of its elements, returns the first error
//!   among them if there is one, and otherwise calls the head with the rest;
//! - every other value, Q-expressions included, evaluates to itself.
//!
//! Errors never unwind. A failing builtin returns an error value and the
//! enclosing S-expression hands it on.

use crate::ast::{Function, Lambda, Value};
use crate::builtinops::get_builtin_ops;
use crate::parser::parse_program;
use crate::reader::read_program;
use crate::{Error, MAX_CALL_DEPTH};

mod args;
mod environment;

pub(crate) use args::{
    Chr, FromArg, QList, all, arg, exact, first_and_rest, non_empty, non_empty_str,
};
pub use args::{Arity, Bound};
pub use environment::Environment;

/// Parameter that collects the remaining arguments of a call into a Q-expression.
pub const VARIADIC_MARKER: &str = "&";

/// Evaluate `value` in `env`.
///
/// Recursion depth follows the nesting of the program. Run deep programs on a
/// thread with [`crate::INTERPRETER_STACK_SIZE`] of stack; see [`MAX_CALL_DEPTH`].
pub fn eval(env: &mut Environment, value: Value) -> Value {
    match value {
        Value::Symbol(name) => env.lookup(&name).unwrap_or_else(Value::from),
        Value::SExpr(cells) => eval_sexpr(env, cells),
        other => other,
    }
}

fn eval_sexpr(env: &mut Environment, cells: Vec<Value>) -> Value {
    let mut cells: Vec<Value> = cells.into_iter().map(|cell| eval(env, cell)).collect();

    if let Some(pos) = cells.iter().position(Value::is_error) {
        return cells.swap_remove(pos);
    }

    let mut cells = cells.into_iter();
    let Some(head) = cells.next() else {
        return Value::SExpr(Vec::new());
    };
    let args: Vec<Value> = cells.collect();

    match head {
        Value::Function(func) => call(env, func, args),
        // `(x)` is just x, which lets `{x}` serve as a body or an `if` branch
        single if args.is_empty() => single,
        other => Error::NotCallable(other.kind()).into(),
    }
}

/// Apply a function to already evaluated arguments.
pub fn call(env: &mut Environment, func: Function, args: Vec<Value>) -> Value {
    match func {
        Function::Builtin(builtin) => builtin.invoke(env, args),
        Function::Lambda(lambda) => call_lambda(env, *lambda, args),
    }
}

/// Bind arguments to parameters one at a time.
///
/// Running out of arguments returns the partially applied closure. Once every
/// parameter is bound the body runs in the closure frame, with the caller's
/// environment lent to it as parent.
fn call_lambda(env: &mut Environment, lambda: Lambda, args: Vec<Value>) -> Value {
    let Lambda {
        params,
        body,
        env: mut frame,
    } = lambda;

    let given = args.len();
    let total = params.len();
    let mut params = params.into_iter();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let Some(param) = params.next() else {
            return Error::TooManyArguments {
                got: given,
                expected: total,
            }
            .into();
        };

        if param == VARIADIC_MARKER {
            let (Some(rest), None) = (params.next(), params.next()) else {
                return Error::MalformedVariadic.into();
            };
            let collected = std::iter::once(arg).chain(args.by_ref()).collect();
            frame.put(rest, Value::QExpr(collected));
            break;
        }

        frame.put(param, arg);
    }

    let mut remaining: Vec<String> = params.collect();
    if remaining.first().is_some_and(|p| p.as_str() == VARIADIC_MARKER) {
        let [_, rest] = remaining.as_slice() else {
            return Error::MalformedVariadic.into();
        };
        frame.put(rest.clone(), Value::QExpr(Vec::new()));
        remaining.clear();
    }

    if !remaining.is_empty() {
        return Value::Function(Function::Lambda(Box::new(Lambda {
            params: remaining,
            body,
            env: frame,
        })));
    }

    if env.depth() >= MAX_CALL_DEPTH {
        tracing::debug!(depth = env.depth(), "call depth limit reached");
        return Error::DepthExceeded.into();
    }

    tracing::trace!(args = given, depth = env.depth(), "applying closure");
    env.lend_to(&mut frame, |frame| eval(frame, Value::SExpr(body)))
}

/// Parse `source` and evaluate each top-level form in order.
///
/// A syntax error rejects the whole input. Evaluation failures are returned
/// in place as error values.
pub fn eval_source(env: &mut Environment, source: &str) -> Result<Vec<Value>, Error> {
    let program = parse_program(source)?;
    Ok(read_program(&program)
        .into_iter()
        .map(|form| eval(env, form))
        .collect())
}

/// Create a global environment with every builtin bound under its name and aliases.
pub fn create_global_env() -> Environment {
    let mut env = Environment::new();

    for op in get_builtin_ops() {
        for name in op.names() {
            env.put(name, Value::Function(Function::Builtin(op.builtin())));
        }
    }

    tracing::debug!(
        builtins = get_builtin_ops().len(),
        "global environment created"
    );
    env
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{qexpr, sym, val};
    use pretty_assertions::assert_eq;

    /// Test result variants for comprehensive testing
    #[derive(Debug)]
    enum TestResult {
        EvalResult(Value),           // Evaluation should succeed with this value
        SpecificError(&'static str), // Evaluation should yield an error containing this string
        Error,                       // Evaluation should yield an error value
    }
    use TestResult::*;

    /// Test environment containing test cases that share state
    struct TestEnvironment(Vec<(&'static str, TestResult)>);

    /// Micro-helper for success cases in comprehensive tests
    fn success<T: Into<Value>>(value: T) -> TestResult {
        EvalResult(val(value))
    }

    /// Macro for setup expressions that return `ok` (like def)
    macro_rules! test_setup {
        ($expr:expr) => {
            ($expr, EvalResult(Value::Ok))
        };
    }

    /// Evaluate the last form of `input` in `env`
    fn eval_last(input: &str, env: &mut Environment, test_id: &str) -> Value {
        match eval_source(env, input) {
            Ok(mut results) => results.pop().unwrap_or(Value::Ok),
            Err(parse_err) => {
                panic!("{test_id}: unexpected parse error for '{input}': {parse_err}")
            }
        }
    }

    /// Execute a single test case with detailed error reporting
    fn execute_test_case(input: &str, expected: &TestResult, env: &mut Environment, test_id: &str) {
        match (eval_last(input, env, test_id), expected) {
            (Value::Error(msg), Error) => {
                assert!(!msg.is_empty(), "{test_id}: empty error message");
            }
            (Value::Error(msg), SpecificError(expected_text)) => {
                assert!(
                    msg.contains(expected_text),
                    "{test_id}: error should contain '{expected_text}', got: {msg}"
                );
            }
            (Value::Error(msg), EvalResult(expected_val)) => {
                panic!("{test_id}: expected {expected_val}, got error {msg}");
            }
            (actual, EvalResult(expected_val)) => {
                assert_eq!(actual, *expected_val, "{test_id}: '{input}'");
            }
            (actual, _) => {
                panic!("{test_id}: expected error for '{input}', got {actual}");
            }
        }
    }

    /// Run tests in isolated environments with shared state
    fn run_tests_in_environment(test_environments: Vec<TestEnvironment>) {
        for (env_idx, TestEnvironment(test_cases)) in test_environments.iter().enumerate() {
            let mut env = create_global_env();
            for (test_idx, (input, expected)) in test_cases.iter().enumerate() {
                let test_id = format!("Environment #{} test #{}", env_idx + 1, test_idx + 1);
                execute_test_case(input, expected, &mut env, &test_id);
            }
        }
    }

    /// Each case gets a fresh global environment
    fn run_comprehensive_tests(test_cases: Vec<(&str, TestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let mut env = create_global_env();
            let test_id = format!("#{}", i + 1);
            execute_test_case(input, expected, &mut env, &test_id);
        }
    }

    #[test]
    fn test_reduction_rules() {
        let test_cases = vec![
            // === SELF-EVALUATING FORMS ===
            ("42", success(42)),
            ("-3.5", success(-3.5)),
            ("\"text\"", success("text")),
            ("'c'", EvalResult(Value::Char("c".into()))),
            ("true", success(true)),
            ("ok", EvalResult(Value::Ok)),
            ("{}", EvalResult(qexpr([]))),
            ("()", EvalResult(Value::SExpr(vec![]))),
            // Q-expressions are never evaluated
            ("{+ 1 2}", EvalResult(qexpr([sym("+"), val(1), val(2)]))),
            ("{undefined-name (/ 1 0)}", EvalResult(qexpr([
                sym("undefined-name"),
                Value::SExpr(vec![sym("/"), val(1), val(0)]),
            ]))),
            ("(eval {+ 1 2})", success(3)),
            // === SYMBOL LOOKUP ===
            ("nope", SpecificError("unbound symbol: 'nope'")),
            ("(eval nope)", Error),
            // === S-EXPRESSIONS ===
            ("(+ 1 (* 2 3))", success(7)),
            ("(eval {list})", EvalResult(qexpr([]))),
            ("(eval {head})", SpecificError("Got 0, expected 1.")),
            ("(5)", success(5)),
            ("((+ 1 2))", success(3)),
            ("(1 2 3)", SpecificError(
                "S-expression starts with incorrect type. Got Long, expected Function.",
            )),
            ("({1} 2)", SpecificError("Got Q-expression, expected Function.")),
            // === ERROR SHORT-CIRCUIT ===
            ("(+ 1 (error \"boom\") (/ 1 0))", EvalResult(Value::Error("boom".into()))),
            ("(list (/ 1 0) (error \"later\"))", SpecificError("division by zero")),
            ("(undefined (error \"boom\"))", SpecificError("unbound symbol: 'undefined'")),
            ("(head (error \"inner\"))", EvalResult(Value::Error("inner".into()))),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_closures() {
        let environment_test_cases = vec![
            // Variadic binding and partial application
            TestEnvironment(vec![
                test_setup!(r"(def {f} (\ {x & xs} {xs}))"),
                ("(f 1 2 3)", success([2, 3])),
                // A trailing `& xs` with nothing left to collect binds an empty list
                ("(f 1)", success(Vec::<Value>::new())),
                ("((f) 1 2 3)", success([2, 3])),
                test_setup!(r"(def {g} (\ {a b & rest} {list a b rest}))"),
                ("(g 1 2 3 4)", EvalResult(qexpr([val(1), val(2), val([3, 4])]))),
                ("((g 1) 2 3)", EvalResult(qexpr([val(1), val(2), val([3])]))),
                ("(g 1)", EvalResult(Value::lambda(
                    vec!["b".into(), "&".into(), "rest".into()],
                    vec![sym("list"), sym("a"), sym("b"), sym("rest")],
                ))),
            ]),
            // Partial application builds up the frame
            TestEnvironment(vec![
                test_setup!(r"(def {add3} (\ {a b c} {+ a b c}))"),
                ("(add3 1 2 3)", success(6)),
                ("((add3 1) 2 3)", success(6)),
                ("(((add3 1) 2) 3)", success(6)),
                test_setup!("(def {inc} (add3 1 0))"),
                ("(inc 41)", success(42)),
                ("(add3 1 2 3 4)", SpecificError(
                    "Function passed too many arguments. Got 4, expected 3.",
                )),
            ]),
            // Malformed variadic markers
            TestEnvironment(vec![
                test_setup!(r"(def {bad} (\ {x &} {x}))"),
                ("(bad 1 2)", SpecificError("Symbol '&' not followed by a single symbol")),
                ("(bad 1)", SpecificError("Symbol '&' not followed by a single symbol")),
                test_setup!(r"(def {worse} (\ {& a b} {a}))"),
                ("(worse 1)", SpecificError("Function format invalid")),
            ]),
            // Zero-parameter closures run when called alone
            TestEnvironment(vec![
                test_setup!(r"(def {answer} (\ {} {42}))"),
                ("(answer)", success(42)),
                ("(answer 1)", SpecificError("Got 1, expected 0.")),
            ]),
            // Recursion through the global environment
            TestEnvironment(vec![
                test_setup!(r"(def {fact} (\ {n} {if (== n 0) {1} {* n (fact (- n 1))}}))"),
                ("(fact 10)", success(3_628_800)),
                test_setup!(r"(def {count} (\ {l} {if (== l {}) {0} {+ 1 (count (tail l))}}))"),
                ("(count {a b c d})", success(4)),
            ]),
        ];

        run_tests_in_environment(environment_test_cases);
    }

    #[test]
    fn test_call_time_scoping() {
        let environment_test_cases = vec![
            // Local rebinding inside a call does not leak
            TestEnvironment(vec![
                test_setup!("(def {x} 1)"),
                test_setup!(r"(def {inner} (\ {_} {= {x} 2}))"),
                test_setup!(r"(def {outer} (\ {_} {inner 0}))"),
                ("(outer 0)", EvalResult(Value::Ok)),
                ("x", success(1)),
            ]),
            // Free variables resolve through the caller's frame
            TestEnvironment(vec![
                test_setup!("(def {x} 1)"),
                test_setup!(r"(def {read-x} (\ {_} {x}))"),
                test_setup!(r"(def {with-x} (\ {x} {read-x 0}))"),
                ("(with-x 5)", success(5)),
                ("(read-x 0)", success(1)),
                test_setup!(r"(def {set-local} (\ {_} {= {x} 99}))"),
                ("(set-local 0)", EvalResult(Value::Ok)),
                ("x", success(1)),
                test_setup!(r"(def {set-global} (\ {_} {def {x} 7}))"),
                ("(set-global 0)", EvalResult(Value::Ok)),
                ("x", success(7)),
            ]),
        ];

        run_tests_in_environment(environment_test_cases);
    }

    #[test]
    fn test_eval_source_reports_parse_errors() {
        let mut env = create_global_env();
        let err = eval_source(&mut env, "(+ 1 2").unwrap_err();
        assert!(matches!(err, crate::Error::Parse(_)), "{err:?}");

        let results = eval_source(&mut env, "(def {a} 1) ; comment\n (+ a 1) {a}").unwrap();
        assert_eq!(results, vec![Value::Ok, val(2), qexpr([sym("a")])]);
    }

    #[test]
    fn test_call_depth_limit() {
        // Deep recursion needs more stack than the default test thread has
        let handle = std::thread::Builder::new()
            .stack_size(crate::INTERPRETER_STACK_SIZE)
            .spawn(|| {
                let mut env = create_global_env();
                eval_source(
                    &mut env,
                    r"(def {down} (\ {n} {if (== n 0) {0} {+ 1 (down (- n 1))}}))",
                )
                .unwrap();
                let shallow = eval_source(&mut env, "(down 100)").unwrap();
                let deep = eval_source(&mut env, "(down 100000)").unwrap();

                assert_eq!(shallow, vec![val(100)]);
                assert_eq!(
                    deep,
                    vec![Value::Error(format!(
                        "call depth limit exceeded (max: {MAX_CALL_DEPTH})"
                    ))]
                );
            })
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_register_builtin() {
        fn double(_env: &mut Environment, args: Vec<Value>) -> Result<Value, crate::Error> {
            let [n] = exact::<1>("double", args)?;
            let n: i64 = arg("double", 1, n)?;
            Ok(Value::Long(n * 2))
        }

        let mut env = create_global_env();
        env.register_builtin("double", Arity::Exact(1), double);

        let results = eval_source(&mut env, "(double 21) (double) (double {})").unwrap();
        assert_eq!(
            results,
            vec![
                val(42),
                Value::Error(
                    "Invalid number of arguments passed to 'double'. Got 0, expected 1.".into()
                ),
                Value::Error(
                    "Incorrect type for argument #1 passed to 'double'. Got Q-expression, expected Long."
                        .into()
                ),
            ]
        );
    }
}
