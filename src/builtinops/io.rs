//! Console output, source loading and process control.

use std::path::Path;

use crate::Error;
use crate::ast::Value;
use crate::evaluator::{Environment, all, arg, eval, exact};
use crate::parser::parse_program;
use crate::reader::{read as read_node, read_program};

pub(crate) fn print_env(env: &mut Environment, _args: Vec<Value>) -> Result<Value, Error> {
    for (name, value) in env.local_bindings() {
        println!("{name}: {value}");
    }
    Ok(Value::Ok)
}

pub(crate) fn print(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let line: String = args.iter().map(|value| format!("{value} ")).collect();
    println!("{line}");
    Ok(Value::Ok)
}

pub(crate) fn show(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [text] = exact::<1>("show", args)?;
    let text: String = arg("show", 1, text)?;
    println!("{text}");
    Ok(Value::Ok)
}

pub(crate) fn error(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [message] = exact::<1>("error", args)?;
    Err(Error::User(arg("error", 1, message)?))
}

pub(crate) fn read(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [source] = exact::<1>("read", args)?;
    let source: String = arg("read", 1, source)?;
    Ok(read_node(&parse_program(&source)?))
}

/// Evaluate every form of a source file in `env`.
///
/// Forms run in order and error results are printed as they occur. The file
/// as a whole fails only when it cannot be read or parsed.
pub fn load_file(env: &mut Environment, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let load_error = |reason: String| Error::Load {
        path: path.display().to_string(),
        reason,
    };

    tracing::debug!(path = %path.display(), "loading file");
    let source = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let program = parse_program(&source).map_err(|e| load_error(e.to_string()))?;

    for form in read_program(&program) {
        let result = eval(env, form);
        if result.is_error() {
            println!("{result}");
        }
    }
    Ok(())
}

pub(crate) fn load(env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    for path in all::<String>("load-file", args)? {
        load_file(env, path)?;
    }
    Ok(Value::Ok)
}

pub(crate) fn exit(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let code = match args.into_iter().next() {
        Some(code) => arg::<i64>("exit", 1, code)?,
        None => 0,
    };
    tracing::debug!(code, "exit requested");
    std::process::exit(i32::try_from(code).unwrap_or(1))
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{qexpr, sexpr, sym, val};
    use crate::{create_global_env, eval_source};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn run(env: &mut Environment, source: &str) -> Value {
        eval_source(env, source).unwrap().pop().unwrap()
    }

    #[test]
    fn test_output_builtins_return_ok() {
        let mut env = create_global_env();
        let test_cases: Vec<(&str, Value)> = vec![
            ("(print 1 \"two\" {3})", Value::Ok),
            ("(print)", Value::Ok),
            ("(show \"raw text\")", Value::Ok),
            ("(print-env)", Value::Ok),
            (
                "(show 1)",
                Value::Error(
                    "Incorrect type for argument #1 passed to 'show'. Got Long, expected String."
                        .into(),
                ),
            ),
        ];

        for (source, expected) in test_cases {
            assert_eq!(run(&mut env, source), expected, "{source}");
        }
    }

    #[test]
    fn test_error_and_read() {
        let mut env = create_global_env();
        let test_cases: Vec<(&str, Value)> = vec![
            ("(error \"custom failure\")", Value::Error("custom failure".into())),
            (
                "(error 'x')",
                Value::Error(
                    "Incorrect type for argument #1 passed to 'error'. Got Character, expected String."
                        .into(),
                ),
            ),
            ("(read \"(+ 1 2) {a}\")", qexpr([sexpr([sym("+"), val(1), val(2)]), qexpr([sym("a")])])),
            ("(read \"\")", qexpr([])),
            ("(eval (read \"+ 1 2\"))", val(3)),
        ];

        for (source, expected) in test_cases {
            assert_eq!(run(&mut env, source), expected, "{source}");
        }

        match run(&mut env, "(read \"(1 2\")") {
            Value::Error(msg) => assert!(msg.contains("Unexpected end of input"), "{msg}"),
            other => panic!("expected a parse error value, got {other}"),
        }
    }

    #[test]
    fn test_load_file() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            script,
            "; definitions\n(def {{loaded}} 42)\n(error \"reported, not fatal\")\n(def {{after}} (+ loaded 1))"
        )
        .unwrap();

        let mut env = create_global_env();
        let path = script.path().display().to_string();
        let source = format!("(load-file \"{}\")", crate::reader::escape(&path));
        assert_eq!(run(&mut env, &source), Value::Ok);
        assert_eq!(env.lookup("loaded"), Ok(val(42)));
        assert_eq!(env.lookup("after"), Ok(val(43)));

        let missing = run(&mut env, "(load-file \"/definitely/not/here.lspy\")");
        match missing {
            Value::Error(msg) => {
                assert!(msg.starts_with("Could not load file /definitely/not/here.lspy.\n\n"), "{msg}");
            }
            other => panic!("expected a load error, got {other}"),
        }

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        writeln!(broken, "(def {{x}} 1").unwrap();
        let err = load_file(&mut env, broken.path()).unwrap_err();
        assert!(err.to_string().contains("Unexpected end of input"), "{err}");
    }
}
