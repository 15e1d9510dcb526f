//! Lexical scope chain: a singly-linked list of name→value bindings.
//!
//! Shared via `Rc<RefCell<_>>` since closures capture an environment that
//! can outlive the block that created it, and assignment mutates a binding
//! in place rather than rebinding.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::token::Token;
use crate::value::Value;

#[derive(Debug)]
struct Scope {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

/// A reference-counted handle to a single scope in the chain.
#[derive(Debug, Clone)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    /// A fresh environment with no parent — used once, for the globals.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Scope {
            bindings: HashMap::new(),
            parent: None,
        })))
    }

    /// A child scope nested inside `parent`.
    pub fn new_child(parent: &Environment) -> Self {
        Self(Rc::new(RefCell::new(Scope {
            bindings: HashMap::new(),
            parent: Some(parent.clone()),
        })))
    }

    /// Unconditionally binds `name` in this scope, overwriting any prior
    /// binding already present in the same scope.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Walks from this scope outward, returning the first binding found.
    pub fn get(&self, name: &Token) -> Result<Value, String> {
        let mut current = self.clone();
        loop {
            let next = {
                let scope = current.0.borrow();
                if let Some(value) = scope.bindings.get(&name.lexeme) {
                    return Ok(value.clone());
                }
                scope.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => return Err(format!("undefined variable '{}'", name.lexeme)),
            }
        }
    }

    /// Walks from this scope outward, updating the first scope that already
    /// binds `name`. Never introduces a new binding.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), String> {
        let mut current = self.clone();
        loop {
            let next = {
                let mut scope = current.0.borrow_mut();
                if scope.bindings.contains_key(&name.lexeme) {
                    scope.bindings.insert(name.lexeme.clone(), value);
                    return Ok(());
                }
                scope.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => return Err(format!("undefined variable '{}'", name.lexeme)),
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
