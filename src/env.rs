// ABOUTME: Environment module for managing variable bindings and scopes

use crate::value::{ObjectRef, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A lexical scope: an ordered map of bindings plus an optional parent.
///
/// A scope may also carry a `fields` view of an object's entries; this is
/// how method calls make the owning object's fields visible as locals.
/// Names resolve through `bindings` first, then `fields`, then the parent
/// chain.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<IndexMap<String, Value>>,
    fields: Option<ObjectRef>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new root environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(IndexMap::new()),
            fields: None,
            parent: None,
        })
    }

    /// Creates a new child environment.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(IndexMap::new()),
            fields: None,
            parent: Some(parent),
        })
    }

    /// Creates a scope that resolves through an object's fields before the
    /// parent chain. Used when calling a method so the owner's fields read
    /// and write like locals.
    pub fn with_fields(object: ObjectRef, parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(IndexMap::new()),
            fields: Some(object),
            parent: Some(parent),
        })
    }

    /// Binds in THIS scope unconditionally, shadowing any parent binding.
    /// Used by `var`, parameters, loop variables, and the catch variable.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Walks the parent chain looking for a binding.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        if let Some(fields) = &self.fields {
            if let Some(value) = fields.borrow().get(name) {
                return Some(value.clone());
            }
        }
        match &self.parent {
            Some(parent) => parent.get(name),
            None => None,
        }
    }

    /// Assigns in the first enclosing scope that already binds `name`; if
    /// no scope does, creates the binding at the root. This is the default
    /// behaviour of bare assignment in Duso.
    pub fn set(&self, name: &str, value: Value) {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return;
        }
        if let Some(fields) = &self.fields {
            if fields.borrow().contains_key(name) {
                fields.borrow_mut().insert(name.to_string(), value);
                return;
            }
        }
        match &self.parent {
            Some(parent) => parent.set(name, value),
            None => {
                self.bindings.borrow_mut().insert(name.to_string(), value);
            }
        }
    }
}
