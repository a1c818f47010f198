//! Configuration loading for guard declarations
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to rules, RuleSets and signatures
//! - Declaration order in the document is preserved, so merge order is deterministic
//! - `apply` feeds every declaration into a RuleRegistry

use crate::binder::{Parameter, Signature};
use crate::domain::{GuardError, GuardResult};
use crate::registry::{RuleRegistry, RuleSet};
use crate::rules::{
    Between, EmailFormat, Greater, InSet, IntBetween, IntGreater, IsNumeric, Length, NotNone,
    SharedRule, StrLength, StrRegex,
};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Supported configuration format versions
const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Guard declarations loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Configuration format version
    pub version: String,
    /// Field rules per type
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
    /// Signatures and parameter rules per callable
    #[serde(default)]
    pub callables: Vec<CallableDeclaration>,
}

/// Field rules of one type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: String,
    #[serde(default)]
    pub fields: RuleMap,
}

/// Signature and parameter rules of one callable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallableDeclaration {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub var_positional: Option<String>,
    #[serde(default)]
    pub var_keyword: Option<String>,
    #[serde(default)]
    pub rules: RuleMap,
}

impl CallableDeclaration {
    pub fn signature(&self) -> Signature {
        Signature {
            name: self.name.clone(),
            params: self.params.clone(),
            var_positional: self.var_positional.clone(),
            var_keyword: self.var_keyword.clone(),
        }
    }
}

/// One built-in rule with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    NotNone,
    StrLength {
        length: usize,
    },
    Length {
        #[serde(default = "default_min_length")]
        min: usize,
        #[serde(default = "default_max_length")]
        max: usize,
    },
    StrRegex {
        pattern: String,
    },
    EmailFormat,
    InSet {
        values: Vec<i64>,
    },
    IsNumeric,
    Between {
        min: f64,
        max: f64,
    },
    IntBetween {
        min: i64,
        max: i64,
    },
    IntGreater {
        min: i64,
    },
    Greater {
        min: f64,
    },
}

fn default_min_length() -> usize {
    1
}

fn default_max_length() -> usize {
    100
}

impl RuleSpec {
    /// Construct the described rule
    pub fn build(&self) -> GuardResult<SharedRule> {
        let rule: SharedRule = match self {
            Self::NotNone => Arc::new(NotNone),
            Self::StrLength { length } => Arc::new(StrLength::new(*length)),
            Self::Length { min, max } => Arc::new(Length::new(*min, *max)?),
            Self::StrRegex { pattern } => Arc::new(StrRegex::new(pattern.as_str())?),
            Self::EmailFormat => Arc::new(EmailFormat),
            Self::InSet { values } => Arc::new(InSet::new(values.iter().copied())),
            Self::IsNumeric => Arc::new(IsNumeric),
            Self::Between { min, max } => Arc::new(Between::new(*min, *max)?),
            Self::IntBetween { min, max } => Arc::new(IntBetween::new(*min, *max)?),
            Self::IntGreater { min } => Arc::new(IntGreater::new(*min)),
            Self::Greater { min } => Arc::new(Greater::new(*min)),
        };
        Ok(rule)
    }
}

/// A single rule or an ordered list of rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSpecs {
    One(RuleSpec),
    Many(Vec<RuleSpec>),
}

impl RuleSpecs {
    pub fn as_slice(&self) -> &[RuleSpec] {
        match self {
            Self::One(spec) => std::slice::from_ref(spec),
            Self::Many(specs) => specs,
        }
    }
}

/// Name-to-rules mapping that keeps document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMap(pub Vec<(String, RuleSpecs)>);

impl RuleMap {
    /// Build the RuleSet for this mapping
    pub fn to_rule_set(&self) -> GuardResult<RuleSet> {
        let mut set = RuleSet::new();
        for (name, specs) in &self.0 {
            let rules = specs
                .as_slice()
                .iter()
                .map(RuleSpec::build)
                .collect::<GuardResult<Vec<_>>>()
                .map_err(|e| GuardError::config(format!("rule for '{name}': {e}")))?;
            set.push(name.clone(), rules);
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RuleMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, specs) in &self.0 {
            map.serialize_entry(name, specs)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleMapVisitor;

        impl<'de> Visitor<'de> for RuleMapVisitor {
            type Value = RuleMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping from names to rules")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RuleMap, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, specs)) = access.next_entry::<String, RuleSpecs>()? {
                    entries.push((name, specs));
                }
                Ok(RuleMap(entries))
            }
        }

        deserializer.deserialize_map(RuleMapVisitor)
    }
}

impl GuardConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            GuardError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            GuardError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> GuardResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GuardError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(GuardError::config(format!(
                "Unsupported configuration version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        let mut seen = HashSet::new();
        let owner_names = self
            .types
            .iter()
            .map(|t| t.name.as_str())
            .chain(self.callables.iter().map(|c| c.name.as_str()));
        for name in owner_names {
            if !seen.insert(name) {
                return Err(GuardError::config(format!("Duplicate owner '{name}'")));
            }
        }

        for declaration in &self.types {
            declaration.fields.to_rule_set().map_err(|e| {
                GuardError::config(format!("Invalid rules for type '{}': {e}", declaration.name))
            })?;
        }

        for declaration in &self.callables {
            declaration.signature().validate()?;
            declaration.rules.to_rule_set().map_err(|e| {
                GuardError::config(format!(
                    "Invalid rules for callable '{}': {e}",
                    declaration.name
                ))
            })?;
        }

        Ok(())
    }

    /// Register every declaration in document order
    pub fn apply(&self, registry: &RuleRegistry) -> GuardResult<()> {
        for declaration in &self.types {
            registry.declare_type(&declaration.name)?;
            registry.attach_field_rules(&declaration.name, declaration.fields.to_rule_set()?)?;
        }

        for declaration in &self.callables {
            registry.declare_callable(declaration.signature())?;
            if !declaration.rules.is_empty() {
                registry.attach_param_rules(&declaration.name, declaration.rules.to_rule_set()?)?;
            }
        }

        tracing::debug!(
            "Applied configuration: {} types, {} callables",
            self.types.len(),
            self.callables.len()
        );
        Ok(())
    }

    /// Total number of rules declared across all owners
    pub fn rule_count(&self) -> usize {
        let count = |map: &RuleMap| map.0.iter().map(|(_, specs)| specs.as_slice().len()).sum::<usize>();
        self.types.iter().map(|t| count(&t.fields)).sum::<usize>()
            + self.callables.iter().map(|c| count(&c.rules)).sum::<usize>()
    }

    /// Convert to JSON for serialization
    pub fn to_json(&self) -> GuardResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GuardError::config(format!("Failed to serialize config: {e}")))
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { version: "1.0".to_string(), types: Vec::new(), callables: Vec::new() }
    }
}
