use crate::Error;
use crate::ast::Value;
use crate::evaluator::{Environment, QList, arg, exact, first_and_rest};

/// Names from a list that must hold only symbols.
fn symbol_names(func: &'static str, cells: Vec<Value>) -> Result<Vec<String>, Error> {
    cells
        .into_iter()
        .map(|cell| match cell {
            Value::Symbol(name) => Ok(name),
            other => Err(Error::NotASymbol {
                func,
                got: other.kind(),
            }),
        })
        .collect()
}

/// `(def {a b} 1 2)` and `(= {a b} 1 2)`.
fn bind(
    env: &mut Environment,
    func: &'static str,
    args: Vec<Value>,
    define: fn(&mut Environment, String, Value),
) -> Result<Value, Error> {
    let (names, values) = first_and_rest(func, args)?;
    let QList(names) = arg(func, 1, names)?;
    let names = symbol_names(func, names)?;

    if names.len() != values.len() {
        return Err(Error::BindingCount {
            func,
            got: names.len(),
            expected: values.len(),
        });
    }

    for (name, value) in names.into_iter().zip(values) {
        tracing::trace!(func, name = %name, "binding");
        define(env, name, value);
    }
    Ok(Value::Ok)
}

pub(crate) fn def(env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    bind(env, "def", args, |env, name, value| env.def(name, value))
}

pub(crate) fn put(env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    bind(env, "=", args, |env, name, value| env.put(name, value))
}

pub(crate) fn lambda(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [params, body] = exact::<2>("\\", args)?;
    let QList(params) = arg("\\", 1, params)?;
    let QList(body) = arg("\\", 2, body)?;
    Ok(Value::lambda(symbol_names("\\", params)?, body))
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use crate::ast::{sym, val};
    use crate::{Value, create_global_env, eval_source};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_definitions() {
        let mut env = create_global_env();
        let results = eval_source(
            &mut env,
            r#"
            (def {a b} 1 2)
            (+ a b)
            (= {c} "local at top level")
            c
            (def {} )
            (def {x y} 1)
            (def {x 1} 1 2)
            (def 1 2)
            (= {"s"} 1)
            "#,
        )
        .unwrap();

        assert_eq!(
            results,
            vec![
                Value::Ok,
                val(3),
                Value::Ok,
                val("local at top level"),
                Value::Ok,
                Value::Error(
                    "The number of symbols defined by 'def' must be equal to the number of values. Got 2, expected 1."
                        .into()
                ),
                Value::Error(
                    "The first argument to 'def' must be a list of symbols. Got Long, expected Symbol."
                        .into()
                ),
                Value::Error(
                    "Incorrect type for argument #1 passed to 'def'. Got Long, expected Q-expression."
                        .into()
                ),
                Value::Error(
                    "The first argument to '=' must be a list of symbols. Got String, expected Symbol."
                        .into()
                ),
            ]
        );
    }

    #[test]
    fn test_lambda_construction() {
        let mut env = create_global_env();
        let results = eval_source(
            &mut env,
            r#"
            (\ {x y} {+ x y})
            ((\ {x y} {+ x y}) 2 3)
            (\ {x 1} {x})
            (\ {x} 5)
            (\ {x})
            "#,
        )
        .unwrap();

        assert_eq!(
            results,
            vec![
                Value::lambda(
                    vec!["x".into(), "y".into()],
                    vec![sym("+"), sym("x"), sym("y")]
                ),
                val(5),
                Value::Error(
                    "The first argument to '\\' must be a list of symbols. Got Long, expected Symbol."
                        .into()
                ),
                Value::Error(
                    "Incorrect type for argument #2 passed to '\\'. Got Long, expected Q-expression."
                        .into()
                ),
                Value::Error(
                    "Invalid number of arguments passed to '\\'. Got 1, expected 2.".into()
                ),
            ]
        );
    }
}
