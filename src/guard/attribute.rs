//! Attribute Guard: rules enforced on every field assignment
//!
//! Mutation is explicit. Typed structs route their setters through
//! [`AttributeGuard::assign`]; dynamic records use [`GuardedObject::set`].
//! Either way a rejected value never reaches the field.

use crate::domain::{GuardResult, ValidationReport, Value};
use crate::registry::RuleSet;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field rules of one guarded type
#[derive(Debug, Clone)]
pub struct AttributeGuard {
    owner: Arc<str>,
    rules: Arc<RuleSet>,
}

impl AttributeGuard {
    pub fn new(owner: impl Into<String>, rules: RuleSet) -> Self {
        Self::from_shared(owner, Arc::new(rules))
    }

    pub(crate) fn from_shared(owner: impl Into<String>, rules: Arc<RuleSet>) -> Self {
        let owner: String = owner.into();
        Self { owner: owner.into(), rules }
    }

    /// Type name used as the owner in qualified names
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run the rules of `field` against `value` without assigning anything
    pub fn check(&self, field: &str, value: &Value) -> GuardResult<()> {
        self.rules.check(&self.owner, field, value)
    }

    /// Check `value`, then store it in `slot`. On failure `slot` is untouched.
    pub fn assign<T>(&self, field: &str, slot: &mut T, value: T) -> GuardResult<()>
    where
        T: Clone + Into<Value>,
    {
        self.check(field, &value.clone().into())?;
        *slot = value;
        Ok(())
    }

    /// Build an object by assigning each field through the guard, in order
    pub fn instantiate<K, V>(&self, fields: impl IntoIterator<Item = (K, V)>) -> GuardResult<GuardedObject>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut object = GuardedObject::empty(self.clone());
        for (name, value) in fields {
            object.set(name, value)?;
        }
        Ok(object)
    }

    /// Check every guarded field present in `values`, collecting all violations
    pub fn check_all(&self, values: &BTreeMap<String, Value>) -> ValidationReport {
        self.rules.check_all(&self.owner, |name| values.get(name).map(Cow::Borrowed))
    }
}

/// A dynamic record whose every write goes through an [`AttributeGuard`]
#[derive(Debug, Clone)]
pub struct GuardedObject {
    guard: AttributeGuard,
    fields: BTreeMap<String, Value>,
}

impl GuardedObject {
    /// An object with no fields set yet
    pub fn empty(guard: AttributeGuard) -> Self {
        Self { guard, fields: BTreeMap::new() }
    }

    /// Assign `name = value` if every rule for `name` passes
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> GuardResult<()> {
        let name = name.into();
        let value = value.into();
        self.guard.check(&name, &value)?;
        self.fields.insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn guard(&self) -> &AttributeGuard {
        &self.guard
    }
}
