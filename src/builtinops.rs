//! Built-in operations registry.
//!
//! Every primitive of the language is described once here by a [`BuiltinOp`]:
//! its canonical name, the aliases it is also bound under, its arity and the
//! host function implementing it. [`crate::evaluator::create_global_env`]
//! binds each entry under all of its names.
//!
//! ```text
//! (+ 1 2.5)              ; arithmetic, also `add`
//! (head {1 2 3})         ; list operations
//! (def {x} 10)           ; binding
//! (if (> x 5) {1} {2})   ; control
//! (fopen "data.txt" "r") ; files
//! ```
//!
//! ## Strictness
//!
//! - **Arity** is checked by the dispatcher before the primitive runs, so
//!   every arity failure reads the same way.
//! - **Types** are never coerced, except that Long and Double mix in
//!   arithmetic (the result is a Double).
//! - **Overflow** in Long arithmetic is reported instead of wrapping.
//!
//! All of these failures reach Lispy code as error values.
//!
//! ## Adding New Operations
//!
//! 1. Implement a [`crate::ast::BuiltinFn`] in the submodule for its category
//! 2. Add a [`BuiltinOp`] entry to the registry below
//! 3. Add tests covering the success path and each error message

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::ast::{Builtin, BuiltinFn};
use crate::evaluator::Arity;

pub mod arith;
mod binding;
pub mod file;
pub mod io;
mod list;
mod logic;

/// Definition of a built-in operation
#[derive(Debug, Clone, Copy)]
pub struct BuiltinOp {
    /// Name used in error messages and for equality between builtins
    pub name: &'static str,
    /// Further names the operation is bound under
    pub aliases: &'static [&'static str],
    pub arity: Arity,
    pub func: BuiltinFn,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl BuiltinOp {
    /// The canonical name followed by the aliases
    pub fn names(&self) -> impl Iterator<Item = &'static str> + use<> {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }

    /// The function value bound into environments
    pub fn builtin(&self) -> Builtin {
        Builtin {
            name: self.name,
            arity: self.arity,
            func: self.func,
        }
    }
}

const fn op(name: &'static str, arity: Arity, func: BuiltinFn) -> BuiltinOp {
    BuiltinOp {
        name,
        aliases: &[],
        arity,
        func,
    }
}

const fn aliased(
    name: &'static str,
    aliases: &'static [&'static str],
    arity: Arity,
    func: BuiltinFn,
) -> BuiltinOp {
    BuiltinOp {
        name,
        aliases,
        arity,
        func,
    }
}

/// Global registry of all built-in operations.
static BUILTIN_OPS: &[BuiltinOp] = &[
    // List operations
    op("list", Arity::Any, list::list),
    op("head", Arity::Exact(1), list::head),
    op("first", Arity::Exact(1), list::first),
    aliased("tail", &["rest"], Arity::Exact(1), list::tail),
    op("init", Arity::Exact(1), list::init),
    op("eval", Arity::Exact(1), list::eval),
    op("join", Arity::AtLeast(1), list::join),
    op("cons", Arity::Exact(2), list::cons),
    op("len", Arity::Exact(1), list::len),
    // Arithmetic
    aliased("+", &["add"], Arity::AtLeast(1), arith::add),
    aliased("-", &["sub"], Arity::AtLeast(1), arith::sub),
    aliased("*", &["mul"], Arity::AtLeast(1), arith::mul),
    aliased("/", &["div"], Arity::AtLeast(1), arith::div),
    aliased("%", &["mod"], Arity::AtLeast(1), arith::rem),
    aliased("^", &["pow"], Arity::AtLeast(1), arith::pow),
    op("min", Arity::AtLeast(1), arith::min),
    op("max", Arity::AtLeast(1), arith::max),
    // Comparison and logic
    op("if", Arity::Between(2, 3), logic::if_),
    op("==", Arity::AtLeast(1), logic::eq),
    op("!=", Arity::AtLeast(1), logic::ne),
    op(">", Arity::AtLeast(1), logic::gt),
    op("<", Arity::AtLeast(1), logic::lt),
    op(">=", Arity::AtLeast(1), logic::ge),
    op("<=", Arity::AtLeast(1), logic::le),
    aliased("||", &["or"], Arity::AtLeast(1), logic::or),
    aliased("&&", &["and"], Arity::AtLeast(1), logic::and),
    aliased("!", &["not"], Arity::Exact(1), logic::not),
    // Binding
    op("def", Arity::AtLeast(1), binding::def),
    op("=", Arity::AtLeast(1), binding::put),
    op("\\", Arity::Exact(2), binding::lambda),
    // Input, output and the host
    op("print-env", Arity::Exact(0), io::print_env),
    op("print", Arity::Any, io::print),
    op("show", Arity::Exact(1), io::show),
    op("error", Arity::Exact(1), io::error),
    op("read", Arity::Exact(1), io::read),
    op("load-file", Arity::AtLeast(1), io::load),
    op("exit", Arity::AtMost(1), io::exit),
    // Files
    op("fopen", Arity::Exact(2), file::fopen),
    op("fclose", Arity::Exact(1), file::fclose),
    op("getc", Arity::Exact(1), file::getc),
    op("putc", Arity::Exact(2), file::putc),
    op("fgets", Arity::Exact(2), file::fgets),
    op("fseek", Arity::Exact(3), file::fseek),
    op("ftell", Arity::Exact(1), file::ftell),
    op("rewind", Arity::Exact(1), file::rewind),
];

/// Lazy static map from every name and alias to its operation (use [`find_builtin`])
static BUILTIN_NAMES: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    BUILTIN_OPS
        .iter()
        .flat_map(|op| op.names().map(move |name| (name, op)))
        .collect()
});

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

/// Find a builtin operation by its name or one of its aliases
pub fn find_builtin(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_NAMES.get(name).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::Value;
    use crate::ast::val;
    use crate::evaluator::Environment;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ops_registry() {
        // Lookup by name and by alias lands on the same entry
        let add = find_builtin("+").unwrap();
        assert_eq!(add.arity, Arity::AtLeast(1));
        assert!(std::ptr::eq(add, find_builtin("add").unwrap()));
        assert_eq!(find_builtin("rest").unwrap().name, "tail");
        assert_eq!(find_builtin("not").unwrap().name, "!");
        assert_eq!(find_builtin("and").unwrap().name, "&&");
        assert_eq!(find_builtin("pow").unwrap().name, "^");

        assert_eq!(find_builtin("if").unwrap().arity, Arity::Between(2, 3));
        assert_eq!(find_builtin("exit").unwrap().arity, Arity::AtMost(1));
        assert!(find_builtin("unknown").is_none());

        // Aliased builtins are equal as values
        assert_eq!(
            find_builtin("mod").unwrap().builtin().name,
            find_builtin("%").unwrap().builtin().name
        );

        // No name is registered twice
        let mut seen = HashSet::new();
        for op in get_builtin_ops() {
            for name in op.names() {
                assert!(seen.insert(name), "duplicate builtin name {name}");
            }
        }
        assert_eq!(seen.len(), BUILTIN_NAMES.len());
    }

    #[test]
    fn test_dispatcher_checks_arity() {
        let mut env = Environment::new();
        let test_cases: Vec<(&str, Vec<Value>, &str)> = vec![
            ("head", vec![], "Got 0, expected 1."),
            ("cons", vec![val(1)], "Got 1, expected 2."),
            ("+", vec![], "Got 0, expected at least 1."),
            ("if", vec![val(true)], "Got 1, expected at least 2."),
            ("if", vec![val(true), val(1), val(2), val(3)], "Got 4, expected at most 3."),
            ("print-env", vec![val(1)], "Got 1, expected 0."),
        ];

        for (name, args, expected) in test_cases {
            let result = find_builtin(name).unwrap().builtin().invoke(&mut env, args);
            match result {
                Value::Error(msg) => {
                    assert!(msg.starts_with(&format!(
                        "Invalid number of arguments passed to '{name}'."
                    )));
                    assert!(msg.ends_with(expected), "{name}: {msg}");
                }
                other => panic!("{name}: expected an arity error, got {other}"),
            }
        }
    }
}
