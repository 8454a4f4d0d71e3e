use crate::error::UminError;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Principal key that grants operations to every caller.
pub const ANY_CALLER: &str = "*";

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    View,
    Add,
    Change,
    Delete,
}

impl Operation {
    pub fn all() -> &'static [Operation] {
        &[
            Operation::View,
            Operation::Add,
            Operation::Change,
            Operation::Delete,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::View => "view",
            Operation::Add => "add",
            Operation::Change => "change",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = UminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Operation::View),
            "add" => Ok(Operation::Add),
            "change" => Ok(Operation::Change),
            "delete" => Ok(Operation::Delete),
            _ => Err(UminError::InvalidOperation(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Caller
// ---------------------------------------------------------------------------

/// The acting principal for one request, as established by whatever sits in
/// front of the admin (reverse proxy, session middleware, CLI flag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub name: String,
}

impl Caller {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// Permission collaborator: a yes/no predicate, nothing more.
pub trait Permissions: Send + Sync {
    fn allowed(&self, caller: &Caller, operation: Operation, record: Option<&Record>) -> bool;
}

/// Grants everything. Useful for tests and single-user setups.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Permissions for AllowAll {
    fn allowed(&self, _: &Caller, _: Operation, _: Option<&Record>) -> bool {
        true
    }
}

/// Static grants per principal, loaded from configuration. Grants under
/// [`ANY_CALLER`] apply to everyone.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    grants: HashMap<String, HashSet<Operation>>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, principal: impl Into<String>, operations: &[Operation]) -> Self {
        self.grants
            .entry(principal.into())
            .or_default()
            .extend(operations.iter().copied());
        self
    }

    pub fn from_config(grants: &BTreeMap<String, Vec<Operation>>) -> Self {
        grants
            .iter()
            .fold(Self::new(), |table, (principal, ops)| table.grant(principal, ops))
    }

    fn grants(&self, principal: &str, operation: Operation) -> bool {
        self.grants
            .get(principal)
            .is_some_and(|ops| ops.contains(&operation))
    }
}

impl Permissions for PermissionTable {
    fn allowed(&self, caller: &Caller, operation: Operation, _: Option<&Record>) -> bool {
        self.grants(&caller.name, operation) || self.grants(ANY_CALLER, operation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
