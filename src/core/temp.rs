//! Temporary variable scopes introduced by reformulations
//!
//! A reformulation that needs storage the user program cannot see
//! opens a `TempScope`, asks it for variables by name, uses them via
//! `TempRef` tokens in the IR it builds and finally attaches that IR
//! as the scope's body. The resulting temp block releases its
//! variables when it completes.
use crate::common::sourcemap::{HasSmid, Smid};
use crate::core::error::CoreError;
use crate::core::ir::Stmt;
use log::trace;
use moniker::FreeVar;
use std::collections::HashMap;
use std::fmt;

/// Identity of a temp scope instance
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn new(n: u32) -> Self {
        ScopeId(n)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A slot owned by exactly one temp scope.
///
/// Identity is the fresh variable minted on allocation, not the
/// name: the same name requested from two scopes yields two distinct
/// variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TempVariable {
    var: FreeVar<String>,
    owner: ScopeId,
}

impl TempVariable {
    /// The name the variable was requested under
    pub fn name(&self) -> &str {
        self.var.pretty_name.as_deref().unwrap_or("?")
    }

    /// The scope that owns this variable
    pub fn owner(&self) -> ScopeId {
        self.owner
    }

    /// Unique identity of the variable
    pub fn id(&self) -> &FreeVar<String> {
        &self.var
    }

    /// Produce a reference to the variable for use inside `scope`.
    ///
    /// Whether `scope` is actually nested inside the owner is not
    /// checked here; see `core::verify`.
    pub fn make_reference(&self, scope: &TempScope) -> TempRef {
        TempRef {
            variable: self.clone(),
            scope: scope.id(),
        }
    }
}

/// A read / write binding to a temp variable, tagged with the scope
/// it was made for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TempRef {
    pub variable: TempVariable,
    pub scope: ScopeId,
}

impl TempRef {
    pub fn name(&self) -> &str {
        self.variable.name()
    }
}

/// Named container of temp variables wrapping exactly one body
#[derive(Clone, Debug, PartialEq)]
pub struct TempScope {
    id: ScopeId,
    smid: Smid,
    variables: HashMap<String, TempVariable>,
    body: Option<Box<Stmt>>,
}

impl TempScope {
    pub fn new(id: ScopeId, smid: Smid) -> Self {
        TempScope {
            id,
            smid,
            variables: HashMap::new(),
            body: None,
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Return the variable `name` of this scope, allocating it on
    /// first request.
    pub fn get_temp_variable(&mut self, name: &str) -> TempVariable {
        let owner = self.id;
        self.variables
            .entry(name.to_string())
            .or_insert_with(|| {
                trace!("allocating temp {} in scope {}", name, owner);
                TempVariable {
                    var: FreeVar::fresh_named(name),
                    owner,
                }
            })
            .clone()
    }

    /// Variables allocated so far
    pub fn variables(&self) -> impl Iterator<Item = &TempVariable> {
        self.variables.values()
    }

    /// True if `name` has been allocated in this scope
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Attach the executable content. Only one attachment is allowed.
    pub fn set_body(&mut self, body: Stmt) -> Result<(), CoreError> {
        if self.body.is_some() {
            return Err(CoreError::TempBodyAlreadySet(self.smid));
        }
        self.body = Some(Box::new(body));
        Ok(())
    }

    pub fn body(&self) -> Option<&Stmt> {
        self.body.as_deref()
    }

    /// Wrap up as a temp block statement for embedding in a parent
    /// tree. Fails if no body was attached.
    pub fn into_statement(self) -> Result<Stmt, CoreError> {
        if self.body.is_none() {
            return Err(CoreError::TempBodyMissing(self.smid));
        }
        Ok(Stmt::TempBlock(Box::new(self)))
    }
}

impl HasSmid for TempScope {
    fn smid(&self) -> Smid {
        self.smid
    }
}
