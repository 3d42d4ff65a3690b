use std::collections::HashMap;

use crate::Error;
use crate::ast::{Builtin, BuiltinFn, Function, Value};
use crate::evaluator::Arity;

/// Name to value bindings with an optional parent frame.
///
/// The global environment has no parent. A closure frame gets one only while
/// the closure is being applied: [`Environment::lend_to`] moves the caller in
/// as the parent and restores it once the body has been evaluated, so a frame
/// can never outlive the environment it points to.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
    parent: Option<Box<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    /// Look a name up in this frame, then in its ancestors.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.get(name)))
    }

    /// Like [`Environment::get`], but yields an owned copy or the unbound-symbol error.
    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::UnboundSymbol(name.to_owned()))
    }

    /// Bind in this frame only, replacing any existing binding.
    pub fn put(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Bind in the root of the parent chain.
    pub fn def(&mut self, name: impl Into<String>, value: Value) {
        match self.parent.as_deref_mut() {
            Some(parent) => parent.def(name, value),
            None => self.put(name, value),
        }
    }

    /// Number of ancestors above this frame.
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |parent| parent.depth() + 1)
    }

    /// Run `body` in `frame` with `self` temporarily attached as its parent.
    ///
    /// Bindings made in the parent chain during the call (for example by `def`)
    /// are kept when `self` is handed back.
    pub(crate) fn lend_to<R>(
        &mut self,
        frame: &mut Environment,
        body: impl FnOnce(&mut Environment) -> R,
    ) -> R {
        frame.parent = Some(Box::new(std::mem::take(self)));
        let result = body(frame);
        if let Some(caller) = frame.parent.take() {
            *self = *caller;
        }
        result
    }

    /// Register a host function as a builtin of this frame.
    ///
    /// The arity is checked before `func` runs, and an `Err` returned from it
    /// reaches Lispy code as an error value.
    ///
    /// # Example
    /// ```
    /// use lispy::ast::Value;
    /// use lispy::evaluator::{Arity, Environment, create_global_env, eval_source};
    /// use lispy::Error;
    ///
    /// fn answer(_env: &mut Environment, _args: Vec<Value>) -> Result<Value, Error> {
    ///     Ok(Value::Long(42))
    /// }
    ///
    /// let mut env = create_global_env();
    /// env.register_builtin("answer", Arity::Exact(0), answer);
    /// let results = eval_source(&mut env, "(answer)").unwrap();
    /// assert_eq!(results, vec![Value::Long(42)]);
    /// ```
    pub fn register_builtin(&mut self, name: &'static str, arity: Arity, func: BuiltinFn) {
        self.put(
            name,
            Value::Function(Function::Builtin(Builtin { name, arity, func })),
        );
    }

    /// Bindings of this frame only, sorted by name
    pub fn local_bindings(&self) -> Vec<(&str, &Value)> {
        let mut result: Vec<_> = self
            .bindings
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        result.sort_by(|a, b| a.0.cmp(b.0));
        result
    }

    /// Get all bindings visible from this frame, inner frames shadowing outer ones.
    /// Returns a Vec of (name, value) pairs sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = HashMap::new();

        if let Some(parent) = &self.parent {
            for (name, value) in parent.get_all_bindings() {
                bindings.insert(name, value);
            }
        }

        for (name, value) in &self.bindings {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}
