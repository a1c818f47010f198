//! Rule registry: declaration-time storage of rules per owner
//!
//! Architecture: Repository - Owners (types and callables) and their RuleSets live here
//! - Declarations merge by name; later declarations append to earlier ones
//! - RuleSets are replaced copy-on-register, so guards hold cheap immutable snapshots
//! - Creating a guard seals the owner; attaching more rules afterwards is a configuration error

pub mod rule_set;

use crate::binder::Signature;
use crate::domain::{GuardError, GuardResult};
use crate::guard::{AttributeGuard, CallGuard};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use rule_set::{qualify, RuleSet};

/// What kind of thing an owner is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// A structured type whose fields are guarded
    Type,
    /// A callable whose parameters are guarded
    Callable,
}

impl OwnerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Callable => "callable",
        }
    }
}

#[derive(Debug, Clone)]
struct OwnerEntry {
    kind: OwnerKind,
    rules: Arc<RuleSet>,
    signature: Option<Arc<Signature>>,
    /// A guard has been built from this owner
    sealed: bool,
}

impl OwnerEntry {
    fn new(kind: OwnerKind, signature: Option<Arc<Signature>>) -> Self {
        Self { kind, rules: Arc::new(RuleSet::new()), signature, sealed: false }
    }
}

/// Registered owner, as listed by [`RuleRegistry::owners`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerSummary {
    pub name: String,
    pub kind: OwnerKind,
    /// Number of guarded names
    pub names: usize,
    /// Number of rules across all names
    pub rules: usize,
    pub sealed: bool,
}

/// Registry of owners and their rules
#[derive(Debug, Default)]
pub struct RuleRegistry {
    owners: RwLock<BTreeMap<String, OwnerEntry>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> GuardResult<RwLockReadGuard<'_, BTreeMap<String, OwnerEntry>>> {
        self.owners.read().map_err(|_| GuardError::config("rule registry lock poisoned"))
    }

    fn write(&self) -> GuardResult<RwLockWriteGuard<'_, BTreeMap<String, OwnerEntry>>> {
        self.owners.write().map_err(|_| GuardError::config("rule registry lock poisoned"))
    }

    /// Declare a guarded type. Declaring it again is a no-op.
    pub fn declare_type(&self, name: &str) -> GuardResult<()> {
        let mut owners = self.write()?;
        match owners.get(name) {
            Some(entry) if entry.kind == OwnerKind::Type => Ok(()),
            Some(entry) => Err(kind_mismatch(name, entry.kind, OwnerKind::Type)),
            None => {
                tracing::debug!("Declared type '{}'", name);
                owners.insert(name.to_string(), OwnerEntry::new(OwnerKind::Type, None));
                Ok(())
            }
        }
    }

    /// Declare a callable with its signature
    pub fn declare_callable(&self, signature: Signature) -> GuardResult<()> {
        signature.validate()?;
        let mut owners = self.write()?;
        match owners.get(&signature.name) {
            Some(entry) if entry.kind != OwnerKind::Callable => {
                Err(kind_mismatch(&signature.name, entry.kind, OwnerKind::Callable))
            }
            Some(entry) if entry.signature.as_deref() != Some(&signature) => {
                Err(GuardError::config(format!(
                    "callable '{}' is already declared with a different signature",
                    signature.name
                )))
            }
            Some(_) => Ok(()),
            None => {
                tracing::debug!(
                    "Declared callable '{}' with {} parameters",
                    signature.name,
                    signature.params.len()
                );
                let name = signature.name.clone();
                owners.insert(name, OwnerEntry::new(OwnerKind::Callable, Some(Arc::new(signature))));
                Ok(())
            }
        }
    }

    /// Attach field rules to a type, declaring it if needed.
    ///
    /// Rules for a name already present are appended after the existing ones.
    pub fn attach_field_rules(&self, owner: &str, rules: RuleSet) -> GuardResult<()> {
        let mut owners = self.write()?;
        let entry = owners
            .entry(owner.to_string())
            .or_insert_with(|| OwnerEntry::new(OwnerKind::Type, None));
        if entry.kind != OwnerKind::Type {
            return Err(GuardError::config(format!(
                "field rules can only be attached to a type, '{owner}' is a {}",
                entry.kind.as_str()
            )));
        }
        merge_into(owner, entry, rules)
    }

    /// Attach parameter rules to a declared callable
    pub fn attach_param_rules(&self, owner: &str, rules: RuleSet) -> GuardResult<()> {
        let mut owners = self.write()?;
        let Some(entry) = owners.get_mut(owner) else {
            return Err(GuardError::config(format!(
                "callable '{owner}' must be declared with a signature before attaching parameter rules"
            )));
        };
        if entry.kind != OwnerKind::Callable {
            return Err(GuardError::config(format!(
                "parameter rules can only be attached to a callable, '{owner}' is a {}",
                entry.kind.as_str()
            )));
        }
        merge_into(owner, entry, rules)
    }

    /// Snapshot of a type's field rules
    pub fn field_rules(&self, owner: &str) -> GuardResult<Option<Arc<RuleSet>>> {
        Ok(self.entry_of(owner, OwnerKind::Type)?.map(|entry| entry.rules))
    }

    /// Snapshot of a callable's parameter rules
    pub fn param_rules(&self, owner: &str) -> GuardResult<Option<Arc<RuleSet>>> {
        Ok(self.entry_of(owner, OwnerKind::Callable)?.map(|entry| entry.rules))
    }

    pub fn signature(&self, owner: &str) -> GuardResult<Option<Arc<Signature>>> {
        Ok(self.entry_of(owner, OwnerKind::Callable)?.and_then(|entry| entry.signature))
    }

    fn entry_of(&self, owner: &str, kind: OwnerKind) -> GuardResult<Option<OwnerEntry>> {
        Ok(self.read()?.get(owner).filter(|entry| entry.kind == kind).cloned())
    }

    /// Build the attribute guard of a declared type and seal it
    pub fn guard_type(&self, owner: &str) -> GuardResult<AttributeGuard> {
        let mut owners = self.write()?;
        let entry = match owners.get_mut(owner) {
            Some(entry) if entry.kind == OwnerKind::Type => entry,
            Some(entry) => return Err(kind_mismatch(owner, entry.kind, OwnerKind::Type)),
            None => return Err(GuardError::config(format!("type '{owner}' is not declared"))),
        };
        entry.sealed = true;
        Ok(AttributeGuard::from_shared(owner, entry.rules.clone()))
    }

    /// Wrap `func` with the parameter rules of a declared callable.
    ///
    /// A callable can be wrapped once; a second call guard on the same
    /// callable is a configuration error.
    pub fn guard_callable<F>(&self, owner: &str, func: F) -> GuardResult<CallGuard<F>> {
        let mut owners = self.write()?;
        let entry = match owners.get_mut(owner) {
            Some(entry) if entry.kind == OwnerKind::Callable => entry,
            Some(entry) => return Err(kind_mismatch(owner, entry.kind, OwnerKind::Callable)),
            None => return Err(GuardError::config(format!("callable '{owner}' is not declared"))),
        };
        if entry.sealed {
            return Err(GuardError::config(format!(
                "callable '{owner}' is already wrapped by a call guard"
            )));
        }
        let Some(signature) = entry.signature.clone() else {
            return Err(GuardError::config(format!("callable '{owner}' has no signature")));
        };

        let guard = CallGuard::from_shared(signature, entry.rules.clone(), func)?;
        entry.sealed = true;
        tracing::debug!("Sealed callable '{}' with {} rules", owner, entry.rules.rule_count());
        Ok(guard)
    }

    /// Every registered owner, sorted by name
    pub fn owners(&self) -> GuardResult<Vec<OwnerSummary>> {
        Ok(self
            .read()?
            .iter()
            .map(|(name, entry)| OwnerSummary {
                name: name.clone(),
                kind: entry.kind,
                names: entry.rules.len(),
                rules: entry.rules.rule_count(),
                sealed: entry.sealed,
            })
            .collect())
    }
}

fn kind_mismatch(owner: &str, actual: OwnerKind, expected: OwnerKind) -> GuardError {
    GuardError::config(format!(
        "'{owner}' is declared as a {}, not a {}",
        actual.as_str(),
        expected.as_str()
    ))
}

fn merge_into(owner: &str, entry: &mut OwnerEntry, rules: RuleSet) -> GuardResult<()> {
    if entry.sealed {
        return Err(GuardError::config(format!(
            "cannot attach rules to '{owner}': a guard has already been built from it"
        )));
    }
    for (name, list) in rules.iter() {
        tracing::debug!("Registering {} rules for '{}'", list.len(), qualify(owner, name));
    }

    let mut merged = RuleSet::clone(&entry.rules);
    merged.merge(rules);
    entry.rules = Arc::new(merged);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::CallArgs;
    use crate::domain::Value;
    use crate::rules;
    use crate::rules::{EmailFormat, NotNone, StrLength};

    fn test_func_signature() -> Signature {
        Signature::new("test_func")
            .param("phone")
            .param_with_default("email", Value::None)
            .var_positional("args")
            .var_keyword("kwargs")
    }

    #[test]
    fn test_field_rules_merge_by_name() {
        let registry = RuleRegistry::new();
        registry.attach_field_rules("TestClass", RuleSet::new().rule("email", EmailFormat)).unwrap();
        registry.attach_field_rules("TestClass", RuleSet::new().rule("email", NotNone)).unwrap();

        let rules = registry.field_rules("TestClass").unwrap().unwrap();
        let kinds: Vec<_> = rules.rules_for("email").iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, ["email_format", "not_none"]);
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_registration() {
        let registry = RuleRegistry::new();
        registry.attach_field_rules("T", RuleSet::new().rule("a", NotNone)).unwrap();
        let before = registry.field_rules("T").unwrap().unwrap();

        registry.attach_field_rules("T", RuleSet::new().rule("a", EmailFormat)).unwrap();
        assert_eq!(before.rule_count(), 1);
        assert_eq!(registry.field_rules("T").unwrap().unwrap().rule_count(), 2);
    }

    #[test]
    fn test_field_rules_on_callable_rejected() {
        let registry = RuleRegistry::new();
        registry.declare_callable(test_func_signature()).unwrap();

        let err = registry
            .attach_field_rules("test_func", RuleSet::new().rule("phone", NotNone))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_param_rules_on_type_rejected() {
        let registry = RuleRegistry::new();
        registry.declare_type("TestClass").unwrap();

        let err = registry
            .attach_param_rules("TestClass", RuleSet::new().rule("phone", NotNone))
            .unwrap_err();
        assert!(err.is_configuration());

        let err = registry.attach_param_rules("missing", RuleSet::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_redeclaration() {
        let registry = RuleRegistry::new();
        registry.declare_type("T").unwrap();
        registry.declare_type("T").unwrap();
        assert!(registry.declare_callable(Signature::new("T")).is_err());

        registry.declare_callable(test_func_signature()).unwrap();
        registry.declare_callable(test_func_signature()).unwrap();
        let changed = Signature::new("test_func").param("phone");
        assert!(registry.declare_callable(changed).unwrap_err().is_configuration());
        assert!(registry.declare_type("test_func").is_err());
    }

    #[test]
    fn test_double_call_guard_rejected_at_declaration() {
        let registry = RuleRegistry::new();
        registry.declare_callable(test_func_signature()).unwrap();
        registry
            .attach_param_rules("test_func", RuleSet::new().rule("phone", StrLength::new(11)))
            .unwrap();

        let _guarded = registry.guard_callable("test_func", |_args: CallArgs| ()).unwrap();
        let err = registry.guard_callable("test_func", |_args: CallArgs| ()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("already wrapped"));
    }

    #[test]
    fn test_sealed_owner_rejects_more_rules() {
        let registry = RuleRegistry::new();
        registry.attach_field_rules("T", RuleSet::new().rule("a", NotNone)).unwrap();
        let _guard = registry.guard_type("T").unwrap();

        let err = registry.attach_field_rules("T", RuleSet::new().rule("a", NotNone)).unwrap_err();
        assert!(err.is_configuration());

        // Building another guard for the same type is fine.
        assert!(registry.guard_type("T").is_ok());
    }

    #[test]
    fn test_guard_unknown_owner() {
        let registry = RuleRegistry::new();
        assert!(registry.guard_type("Nope").unwrap_err().is_configuration());
        assert!(registry.guard_callable("nope", |_args: CallArgs| ()).is_err());
    }

    #[test]
    fn test_guarded_callable_uses_merged_rules() {
        let registry = RuleRegistry::new();
        registry.declare_callable(test_func_signature()).unwrap();
        registry
            .attach_param_rules("test_func", RuleSet::new().rule("phone", StrLength::new(11)))
            .unwrap();
        registry
            .attach_param_rules("test_func", RuleSet::new().rules("email", rules![NotNone, EmailFormat]))
            .unwrap();

        let guarded = registry.guard_callable("test_func", |_args: CallArgs| "ran").unwrap();
        let err = guarded
            .call(CallArgs::new().arg("11111111111").kwarg("email", "12345@").kwarg("we", "we"))
            .unwrap_err();
        assert_eq!(err.to_string(), "<test_func.email> Invalid email format.");
    }

    #[test]
    fn test_owners_summary() {
        let registry = RuleRegistry::new();
        registry
            .attach_field_rules("Contact", RuleSet::new().rules("x", rules![NotNone, EmailFormat]))
            .unwrap();
        registry.declare_callable(Signature::new("send").param("p")).unwrap();
        registry.declare_type("Account").unwrap();
        registry.guard_type("Account").unwrap();

        let owners = registry.owners().unwrap();
        let names: Vec<_> = owners.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["Account", "Contact", "send"]);

        assert!(owners[0].sealed);
        assert_eq!(owners[0].rules, 0);
        assert_eq!(owners[1].kind, OwnerKind::Type);
        assert_eq!((owners[1].names, owners[1].rules), (1, 2));
        assert!(!owners[1].sealed);
        assert_eq!(owners[2].kind, OwnerKind::Callable);
    }

    #[test]
    fn test_concurrent_reads() {
        let registry = Arc::new(RuleRegistry::new());
        registry.attach_field_rules("T", RuleSet::new().rule("a", NotNone)).unwrap();
        let guard = registry.guard_type("T").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let guard = guard.clone();
                std::thread::spawn(move || guard.check("a", &Value::Int(i)).is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
