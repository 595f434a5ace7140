use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tera::{Function, Tera, Value};

/// Helper functions made available to every template, keyed by the name
/// templates call them with.
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: BTreeMap<String, Arc<dyn Function>>,
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a helper. A later registration under the same name replaces
    /// the earlier one.
    pub fn insert<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Function + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(func));
    }

    pub fn with<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Function + 'static,
    {
        self.insert(name, func);
        self
    }

    /// Merge `other` into `self`; entries in `other` win on name clashes.
    pub fn extend(&mut self, other: &FuncMap) {
        for (name, func) in &other.funcs {
            self.funcs.insert(name.clone(), Arc::clone(func));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Register every helper on a freshly built template set.
    pub(crate) fn register(&self, tera: &mut Tera) {
        for (name, func) in &self.funcs {
            tera.register_function(name, SharedFunction(Arc::clone(func)));
        }
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.funcs.keys()).finish()
    }
}

/// Lets one helper be registered on many template sets.
struct SharedFunction(Arc<dyn Function>);

impl Function for SharedFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.call(args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}
