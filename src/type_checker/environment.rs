//! Lexical scopes and symbol resolution.
//!
//! A `ScopeTable` is a stack of `Environment`s. The bottom environment holds
//! global declarations and is never popped; function parameter scopes and
//! block scopes are pushed on top of it while their owner is generated.

use std::collections::HashMap;

use log::trace;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    Global,
    Function,
    Block,
}

impl EnvironmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentKind::Global => "global",
            EnvironmentKind::Function => "function",
            EnvironmentKind::Block => "block",
        }
    }
}

/// What a name resolves to: a storage handle of the code generator and the
/// declared type.
#[derive(Debug, Clone)]
pub struct Binding<S> {
    pub storage: S,
    pub binding_type: Type,
    pub position: Position,
}

#[derive(Debug)]
pub struct Environment<S> {
    pub variable_lookup: HashMap<String, Binding<S>>,
    pub id: i32,
    pub kind: EnvironmentKind,
}

impl<S> Environment<S> {
    pub fn new(id: i32, kind: EnvironmentKind) -> Self {
        Environment {
            variable_lookup: HashMap::new(),
            id,
            kind,
        }
    }

    pub fn get_variable(&self, name: &str) -> Option<&Binding<S>> {
        self.variable_lookup.get(name)
    }
}

#[derive(Debug)]
pub struct ScopeTable<S> {
    environments: Vec<Environment<S>>,
    next_id: i32,
}

impl<S> Default for ScopeTable<S> {
    fn default() -> Self {
        ScopeTable::new()
    }
}

impl<S> ScopeTable<S> {
    pub fn new() -> Self {
        ScopeTable {
            environments: vec![Environment::new(0, EnvironmentKind::Global)],
            next_id: 1,
        }
    }

    pub fn push(&mut self, kind: EnvironmentKind) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        trace!("enter {} scope #{}", kind.as_str(), id);
        self.environments.push(Environment::new(id, kind));
        id
    }

    /// Pops the innermost scope, dropping its bindings. The global scope is
    /// never popped.
    pub fn pop(&mut self) -> Option<Environment<S>> {
        if self.environments.len() == 1 {
            return None;
        }
        let environment = self.environments.pop();
        if let Some(environment) = &environment {
            trace!("leave {} scope #{}", environment.kind.as_str(), environment.id);
        }
        environment
    }

    /// Number of open scopes, the global scope included.
    pub fn depth(&self) -> usize {
        self.environments.len()
    }

    pub fn is_global(&self) -> bool {
        self.environments.len() == 1
    }

    /// Binds `name` in the innermost scope. Fails if the innermost scope
    /// already binds it; outer bindings are shadowed.
    pub fn declare(
        &mut self,
        name: &str,
        storage: S,
        binding_type: Type,
        position: Position,
    ) -> Result<(), Error> {
        let last = self.environments.len() - 1;
        let environment = &mut self.environments[last];

        if environment.variable_lookup.contains_key(name) {
            return Err(Error::new(
                ErrorImpl::DuplicateDeclaration {
                    name: name.to_string(),
                },
                position,
            ));
        }

        environment.variable_lookup.insert(
            name.to_string(),
            Binding {
                storage,
                binding_type,
                position,
            },
        );
        Ok(())
    }

    /// Replaces an existing global binding, used when a forward-declared
    /// function receives its body.
    pub fn redeclare_global(&mut self, name: &str, storage: S, binding_type: Type, position: Position) {
        self.environments[0].variable_lookup.insert(
            name.to_string(),
            Binding {
                storage,
                binding_type,
                position,
            },
        );
    }

    /// Finds the nearest binding of `name`, searching from the innermost scope
    /// outwards.
    pub fn resolve(&self, name: &str, position: Position) -> Result<&Binding<S>, Error> {
        self.lookup(name).ok_or_else(|| {
            Error::new(
                ErrorImpl::UnknownIdentifier {
                    name: name.to_string(),
                },
                position,
            )
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding<S>> {
        self.environments
            .iter()
            .rev()
            .find_map(|environment| environment.get_variable(name))
    }

    /// Like `lookup`, restricted to the global scope.
    pub fn lookup_global(&self, name: &str) -> Option<&Binding<S>> {
        self.environments[0].get_variable(name)
    }
}
