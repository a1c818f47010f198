//! Rule abstraction and the built-in rule catalogue
//!
//! Architectural Principle: Service Layer - Each rule is one immutable predicate over a named value
//! - Every rule implements the `Rule` trait for clean polymorphism
//! - Structural rules (`not_none`, `str_*`, `int_*`) demand the value already has the right shape
//! - Range rules (`in_set`, `is_numeric`, `between`, `greater`) coerce through numeric parsing

pub mod numeric;
pub mod string;

use crate::domain::{Value, Violation};
use std::fmt::Debug;
use std::sync::Arc;

pub use numeric::{Between, Greater, InSet, IntBetween, IntGreater, IsNumeric};
pub use string::{EmailFormat, Length, NotNone, StrLength, StrRegex};

/// A single predicate over a named value.
///
/// `check` must be a pure function of `(key, value)`. Implement this trait to
/// add rules beyond the built-in catalogue.
pub trait Rule: Debug + Send + Sync {
    /// Stable kind identifier carried by violations (e.g. `str_length`)
    fn kind(&self) -> &'static str;

    /// Check `value`, reporting a violation against the qualified `key`
    fn check(&self, key: &str, value: &Value) -> Result<(), Violation>;

    /// Human-readable rule with its parameters, e.g. `str_length(11)`
    fn describe(&self) -> String {
        self.kind().to_string()
    }
}

/// Rules are shared between a RuleSet and every guard built from it
pub type SharedRule = Arc<dyn Rule>;

/// Build an ordered list of shared rules.
///
/// ```
/// use rule_guard::rules;
/// use rule_guard::rules::{NotNone, StrLength};
///
/// let phone = rules![NotNone, StrLength::new(11)];
/// assert_eq!(phone.len(), 2);
/// ```
#[macro_export]
macro_rules! rules {
    ($($rule:expr),* $(,)?) => {
        vec![$(::std::sync::Arc::new($rule) as $crate::rules::SharedRule),*]
    };
}

/// Shorthand for building a violation with the `<key> ...` message shape
pub(crate) fn violation(kind: &str, key: &str, detail: impl std::fmt::Display) -> Violation {
    Violation::new(kind, key, format!("<{key}> {detail}"))
}

/// Catalogue entry describing a built-in rule kind
#[derive(Debug, Clone, Copy)]
pub struct RuleInfo {
    pub kind: &'static str,
    pub parameters: &'static str,
    pub description: &'static str,
    /// Whether the rule coerces the value through numeric parsing
    pub coercing: bool,
}

/// Every built-in rule kind
pub const BUILTIN_RULES: &[RuleInfo] = &[
    RuleInfo {
        kind: "not_none",
        parameters: "",
        description: "Fails when the value is absent (null)",
        coercing: false,
    },
    RuleInfo {
        kind: "str_length",
        parameters: "length",
        description: "Fails unless the value is a string of exactly `length` chars",
        coercing: false,
    },
    RuleInfo {
        kind: "length",
        parameters: "min = 1, max = 100",
        description: "Fails unless the length of a string, list or map is within [min, max]",
        coercing: false,
    },
    RuleInfo {
        kind: "str_regex",
        parameters: "pattern",
        description: "Fails unless the string matches `pattern` anchored at its start",
        coercing: false,
    },
    RuleInfo {
        kind: "email_format",
        parameters: "",
        description: "Fails unless the string is shaped like local@domain.tld",
        coercing: false,
    },
    RuleInfo {
        kind: "in_set",
        parameters: "values",
        description: "Fails unless the value parsed as an integer is one of `values`",
        coercing: true,
    },
    RuleInfo {
        kind: "is_numeric",
        parameters: "",
        description: "Fails unless the value can be parsed as a number",
        coercing: true,
    },
    RuleInfo {
        kind: "between",
        parameters: "min, max",
        description: "Fails unless the value parsed as a number is within [min, max]",
        coercing: true,
    },
    RuleInfo {
        kind: "int_between",
        parameters: "min, max",
        description: "Fails unless the value is already an integer within [min, max]",
        coercing: false,
    },
    RuleInfo {
        kind: "int_greater",
        parameters: "min",
        description: "Fails unless the value is already an integer >= min",
        coercing: false,
    },
    RuleInfo {
        kind: "greater",
        parameters: "min",
        description: "Fails unless the value parsed as a number is >= min",
        coercing: true,
    },
];

/// Look up a built-in rule kind
pub fn rule_info(kind: &str) -> Option<&'static RuleInfo> {
    BUILTIN_RULES.iter().find(|info| info.kind == kind)
}
