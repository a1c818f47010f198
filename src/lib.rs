//! Rule Guard - Declarative validation rules for fields and call arguments
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Rules are immutable predicates declared once and shared by every check
//! - The registry merges declarations per owner and hands out guard snapshots
//! - Guards enforce rules at assignment or invocation time and fail fast
//!
//! ```
//! use rule_guard::rules::{EmailFormat, NotNone, StrLength};
//! use rule_guard::{rules, AttributeGuard, RuleSet};
//!
//! let guard = AttributeGuard::new(
//!     "Contact",
//!     RuleSet::new()
//!         .rules("phone", rules![NotNone, StrLength::new(11)])
//!         .rule("email", EmailFormat),
//! );
//!
//! let mut contact = guard.instantiate([("phone", "11111111111")]).unwrap();
//! let err = contact.set("email", "12345@").unwrap_err();
//! assert_eq!(err.to_string(), "<Contact.email> Invalid email format.");
//! assert!(contact.get("email").is_none());
//! ```

pub mod binder;
pub mod config;
pub mod domain;
pub mod guard;
pub mod registry;
pub mod report;
pub mod rules;

// Re-export main types for convenient access
pub use domain::{GuardError, GuardResult, ValidationReport, ValidationSummary, Value, Violation};

pub use binder::{bind, BoundArguments, CallArgs, Parameter, Signature};

pub use config::{GuardConfig, RuleSpec};

pub use guard::{AttributeGuard, CallGuard, GuardedObject};

pub use registry::{OwnerKind, OwnerSummary, RuleRegistry, RuleSet};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use rules::{Rule, SharedRule};

lazy_static::lazy_static! {
    static ref GLOBAL_REGISTRY: RuleRegistry = RuleRegistry::new();
}

/// The process-wide registry used by the free functions below
pub fn registry() -> &'static RuleRegistry {
    &GLOBAL_REGISTRY
}

/// Attach field rules to a type in the process-wide registry
pub fn attach_field_rules(owner: &str, rules: RuleSet) -> GuardResult<()> {
    registry().attach_field_rules(owner, rules)
}

/// Declare a guarded type in the process-wide registry
pub fn declare_type(name: &str) -> GuardResult<()> {
    registry().declare_type(name)
}

/// Declare a callable's signature in the process-wide registry
pub fn declare_callable(signature: Signature) -> GuardResult<()> {
    registry().declare_callable(signature)
}

/// Attach parameter rules to a declared callable in the process-wide registry
pub fn attach_param_rules(owner: &str, rules: RuleSet) -> GuardResult<()> {
    registry().attach_param_rules(owner, rules)
}

/// Build the attribute guard of a type from the process-wide registry
pub fn guard_type(owner: &str) -> GuardResult<AttributeGuard> {
    registry().guard_type(owner)
}

/// Wrap `func` with the parameter rules of a callable from the process-wide registry
pub fn guard_callable<F>(owner: &str, func: F) -> GuardResult<CallGuard<F>> {
    registry().guard_callable(owner, func)
}

/// Load a YAML declaration file into the process-wide registry
pub fn load_declarations<P: AsRef<std::path::Path>>(path: P) -> GuardResult<GuardConfig> {
    let config = GuardConfig::load_from_file(path)?;
    config.apply(registry())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{EmailFormat, NotNone, StrLength};
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    // Owner names are unique per test: the global registry is shared by the test binary.

    #[test]
    fn test_field_declarations_merge_in_attach_order() {
        attach_field_rules("LibContact", RuleSet::new().rules("phone", rules![NotNone, StrLength::new(11)]))
            .unwrap();
        attach_field_rules("LibContact", RuleSet::new().rule("email", EmailFormat)).unwrap();
        attach_field_rules("LibContact", RuleSet::new().rule("email", NotNone)).unwrap();

        let guard = guard_type("LibContact").unwrap();
        let kinds: Vec<_> = guard.rules().rules_for("email").iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, ["email_format", "not_none"]);

        let err = guard
            .instantiate([("phone", "1111111111"), ("email", "12345@gmail.com")])
            .unwrap_err();
        assert_eq!(err.to_string(), "<LibContact.phone> Invalid length 10, 11 expected");
    }

    #[test]
    fn test_guarded_call_end_to_end() {
        declare_callable(
            Signature::new("lib_test_func")
                .param("phone")
                .param_with_default("email", Value::None)
                .var_positional("args")
                .var_keyword("kwargs"),
        )
        .unwrap();
        attach_param_rules(
            "lib_test_func",
            RuleSet::new()
                .rule("phone", StrLength::new(11))
                .rules("email", rules![NotNone, EmailFormat]),
        )
        .unwrap();

        let calls = Cell::new(0);
        let guarded = guard_callable("lib_test_func", |_args: CallArgs| calls.set(calls.get() + 1))
            .unwrap();

        let err = guarded
            .call(CallArgs::new().arg("11111111111").kwarg("email", "12345@").kwarg("we", "we"))
            .unwrap_err();
        assert_eq!(err.to_string(), "<lib_test_func.email> Invalid email format.");
        assert_eq!(calls.get(), 0);

        guarded
            .call(CallArgs::new().arg("11111111111").kwarg("email", "12345@gmail.com"))
            .unwrap();
        assert_eq!(calls.get(), 1);

        let err = guard_callable("lib_test_func", |_args: CallArgs| ()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_load_declarations() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("guards.yaml");
        fs::write(
            &path,
            "version: \"1.0\"\ntypes:\n  - name: LibLoaded\n    fields:\n      code:\n        rule: is_numeric\n",
        )
        .unwrap();

        let config = load_declarations(&path).unwrap();
        assert_eq!(config.rule_count(), 1);

        let guard = guard_type("LibLoaded").unwrap();
        assert!(guard.check("code", &Value::from("42")).is_ok());
        assert!(guard.check("code", &Value::from("x")).is_err());
        assert!(registry().owners().unwrap().iter().any(|o| o.name == "LibLoaded"));
    }
}
