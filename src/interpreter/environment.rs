use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interpreter::value::Value;

/// A frame in the lexical scope chain. Frames are shared: closures capture
/// them and instances own one, so lookups and updates go through a RefCell.
#[derive(Debug, Default)]
pub struct Environment {
    parent: Option<Rc<Environment>>,
    values: RefCell<HashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            parent: Some(parent),
            values: RefCell::new(HashMap::new()),
        })
    }

    /// Recursive lookup along the parent chain. Absent names are simply
    /// absent; callers decide what that means.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// One level only. Instance members live in the instance's own frame;
    /// falling through would expose the class's enclosing scope.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.values.borrow().get(name).cloned()
    }

    /// Binds in this frame unconditionally, shadowing any outer binding.
    pub fn put(&self, name: impl Into<String>, value: Value) {
        self.values.borrow_mut().insert(name.into(), value);
    }

    /// Rebinds in the nearest enclosing frame that already holds `name`;
    /// creates the binding in this frame if none does.
    pub fn set(&self, name: &str, value: Value) {
        let mut env = self;
        loop {
            if let Some(slot) = env.values.borrow_mut().get_mut(name) {
                *slot = value;
                return;
            }
            match &env.parent {
                Some(parent) => env = parent.as_ref(),
                None => break,
            }
        }
        self.put(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_the_parent_chain() {
        let outer = Environment::new();
        outer.put("x", Value::Int(1));
        let inner = Environment::with_parent(outer);
        assert!(matches!(inner.get("x"), Some(Value::Int(1))));
        assert!(inner.get("y").is_none());
    }

    #[test]
    fn put_shadows_instead_of_updating() {
        let outer = Environment::new();
        outer.put("x", Value::Int(1));
        let inner = Environment::with_parent(outer.clone());
        inner.put("x", Value::Int(2));
        assert!(matches!(inner.get("x"), Some(Value::Int(2))));
        assert!(matches!(outer.get("x"), Some(Value::Int(1))));
    }

    #[test]
    fn set_rebinds_the_nearest_enclosing_frame() {
        let outer = Environment::new();
        outer.put("x", Value::Int(1));
        let inner = Environment::with_parent(outer.clone());
        inner.set("x", Value::Int(2));
        assert!(matches!(outer.get("x"), Some(Value::Int(2))));
        assert!(inner.get_local("x").is_none());
    }

    #[test]
    fn set_falls_back_to_the_current_frame() {
        let outer = Environment::new();
        let inner = Environment::with_parent(outer.clone());
        inner.set("x", Value::Int(3));
        assert!(matches!(inner.get_local("x"), Some(Value::Int(3))));
        assert!(outer.get("x").is_none());
    }
}
