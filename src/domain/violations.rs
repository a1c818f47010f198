//! Core domain models for rule violations and guard errors
//!
//! Architecture: Rich Domain Models - Violations are values with behavior, not just data
//! - A Violation names the rule that produced it and the qualified field or parameter
//! - ValidationReport acts as an aggregate root when callers opt into collect-all checking
//! - GuardError is the single error surface of the crate

use serde::{Deserialize, Serialize};

/// A single failed rule check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Violation {
    /// Kind identifier of the rule that failed (e.g. `str_length`)
    pub rule: String,
    /// Qualified name of the offending value, `Owner.name`
    pub qualified_name: String,
    /// Developer-facing diagnostic message
    pub message: String,
}

impl Violation {
    /// Create a new violation
    pub fn new(
        rule: impl Into<String>,
        qualified_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { rule: rule.into(), qualified_name: qualified_name.into(), message: message.into() }
    }

    /// Bare field or parameter name, without the owner prefix
    pub fn field_name(&self) -> &str {
        self.qualified_name.rsplit_once('.').map_or(self.qualified_name.as_str(), |(_, name)| name)
    }

    /// Owner part of the qualified name, if present
    pub fn owner(&self) -> Option<&str> {
        self.qualified_name.rsplit_once('.').map(|(owner, _)| owner)
    }

    /// Format violation for display
    pub fn format_display(&self) -> String {
        format!("{} [{}] {}", self.qualified_name, self.rule, self.message)
    }
}

/// Summary statistics for a collect-all check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of named values that had rules attached
    pub names_checked: usize,
    /// Number of rule evaluations performed
    pub rules_evaluated: usize,
    /// Number of names with at least one violation
    pub names_failed: usize,
}

/// Every violation found by a collect-all check over one owner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Owner the values were checked against
    pub owner: String,
    /// Violations in name order, then rule order
    pub violations: Vec<Violation>,
    /// Summary statistics
    pub summary: ValidationSummary,
}

impl ValidationReport {
    /// Create a new empty report for an owner
    pub fn new(owner: impl Into<String>) -> Self {
        Self { owner: owner.into(), violations: Vec::new(), summary: ValidationSummary::default() }
    }

    /// Add a violation to the report
    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Violations raised against one field or parameter
    pub fn violations_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.field_name() == name)
    }

    /// The violation a fail-fast guard would have reported
    pub fn first_violation(&self) -> Option<&Violation> {
        self.violations.first()
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: ValidationReport) {
        self.violations.extend(other.violations);
        self.summary.names_checked += other.summary.names_checked;
        self.summary.rules_evaluated += other.summary.rules_evaluated;
        self.summary.names_failed += other.summary.names_failed;
    }
}

/// Error types raised by declaration, binding and guarded operations
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Declaration-time misuse, fatal at load time
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Call arguments could not be matched to the declared signature
    #[error("Binding error in {callable}: {message}")]
    Binding { callable: String, message: String },

    /// A rule rejected a named value
    #[error("{0}")]
    Violation(#[from] Violation),

    /// Configuration file could not be read
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl GuardError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a binding error
    pub fn binding(callable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Binding { callable: callable.into(), message: message.into() }
    }

    /// The violation carried by this error, if it is one
    pub fn as_violation(&self) -> Option<&Violation> {
        match self {
            Self::Violation(violation) => Some(violation),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_binding(&self) -> bool {
        matches!(self, Self::Binding { .. })
    }
}

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;
