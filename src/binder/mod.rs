//! Argument binding for guarded callables
//!
//! Architecture: Explicit Signature Descriptor - Callables declare their parameters once
//! - `Signature` lists parameters in order, with defaults and variadic collectors
//! - `bind` maps one call's positional and keyword arguments onto that signature
//! - `BoundArguments` exposes every name a rule may target, including extra keywords

use crate::domain::{GuardError, GuardResult, Value};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Default used when the call does not supply the parameter.
    /// `Some(Value::None)` is a real default of null.
    #[serde(default, deserialize_with = "present_value", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Only bindable by keyword
    #[serde(default)]
    pub keyword_only: bool,
}

/// Distinguishes `default: null` from an absent `default` key
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Parameter {
    pub fn required(name: impl Into<String>) -> Self {
        Self { name: name.into(), default: None, keyword_only: false }
    }

    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self { name: name.into(), default: Some(default.into()), keyword_only: false }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Declared parameter list of a callable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Callable name, used as the owner in qualified names
    pub name: String,
    #[serde(default)]
    pub params: Vec<Parameter>,
    /// Collector for surplus positional arguments (`*args`)
    #[serde(default)]
    pub var_positional: Option<String>,
    /// Collector for surplus keyword arguments (`**kwargs`)
    #[serde(default)]
    pub var_keyword: Option<String>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), params: Vec::new(), var_positional: None, var_keyword: None }
    }

    /// Add a required positional-or-keyword parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Parameter::required(name));
        self
    }

    /// Add a positional-or-keyword parameter with a default
    pub fn param_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Parameter::optional(name, default));
        self
    }

    /// Add a keyword-only parameter, optionally with a default
    pub fn keyword_only(mut self, name: impl Into<String>, default: Option<Value>) -> Self {
        self.params.push(Parameter { name: name.into(), default, keyword_only: true });
        self
    }

    pub fn var_positional(mut self, name: impl Into<String>) -> Self {
        self.var_positional = Some(name.into());
        self
    }

    pub fn var_keyword(mut self, name: impl Into<String>) -> Self {
        self.var_keyword = Some(name.into());
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether `name` can appear in a bound call
    pub fn binds(&self, name: &str) -> bool {
        self.var_keyword.is_some()
            || self.parameter(name).is_some()
            || self.var_positional.as_deref() == Some(name)
    }

    fn positional_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| !p.keyword_only)
    }

    /// Check the signature is well formed
    pub fn validate(&self) -> GuardResult<()> {
        if self.name.is_empty() {
            return Err(GuardError::config("callable name must not be empty"));
        }

        let mut seen = HashSet::new();
        let names = self
            .params
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.var_positional.as_deref())
            .chain(self.var_keyword.as_deref());
        for name in names {
            if !seen.insert(name) {
                return Err(GuardError::config(format!(
                    "duplicate parameter '{name}' in signature of '{}'",
                    self.name
                )));
            }
        }

        let mut default_seen = false;
        for param in self.positional_params() {
            if param.has_default() {
                default_seen = true;
            } else if default_seen {
                return Err(GuardError::config(format!(
                    "parameter '{}' without a default follows a parameter with a default in '{}'",
                    param.name, self.name
                )));
            }
        }

        Ok(())
    }
}

/// The actual arguments of one call, as the caller supplied them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// Build from a JSON array of positional arguments and a JSON object of keywords
    pub fn from_json(args: serde_json::Value, kwargs: serde_json::Value) -> GuardResult<Self> {
        let positional = match args {
            serde_json::Value::Null => Vec::new(),
            serde_json::Value::Array(items) => items.into_iter().map(Value::from).collect(),
            other => {
                return Err(GuardError::config(format!(
                    "positional arguments must be a JSON array, got {other}"
                )))
            }
        };
        let keyword = match kwargs {
            serde_json::Value::Null => Vec::new(),
            serde_json::Value::Object(entries) => {
                entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
            }
            other => {
                return Err(GuardError::config(format!(
                    "keyword arguments must be a JSON object, got {other}"
                )))
            }
        };
        Ok(Self { positional, keyword })
    }

    /// Value of a keyword argument as supplied by the caller
    pub fn keyword_value(&self, name: &str) -> Option<&Value> {
        self.keyword.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// Name-to-value view of a bound call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    /// Declared parameters in signature order, defaults applied
    named: Vec<(String, Value)>,
    var_positional_name: Option<String>,
    var_positional: Vec<Value>,
    var_keyword_name: Option<String>,
    /// Surplus keyword arguments in call order
    var_keyword: Vec<(String, Value)>,
}

impl BoundArguments {
    /// Value bound to a declared parameter
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Resolve any name a rule may target.
    ///
    /// Declared parameters come first, then surplus keyword arguments, then the
    /// collectors themselves (`args` as a list, `kwargs` as a map).
    pub fn lookup(&self, name: &str) -> Option<Cow<'_, Value>> {
        if let Some(value) = self.get(name) {
            return Some(Cow::Borrowed(value));
        }
        if let Some((_, value)) = self.var_keyword.iter().find(|(k, _)| k == name) {
            return Some(Cow::Borrowed(value));
        }
        if self.var_positional_name.as_deref() == Some(name) {
            return Some(Cow::Owned(Value::List(self.var_positional.clone())));
        }
        if self.var_keyword_name.as_deref() == Some(name) {
            let entries: BTreeMap<String, Value> = self.var_keyword.iter().cloned().collect();
            return Some(Cow::Owned(Value::Map(entries)));
        }
        None
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.named.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn extra_positional(&self) -> &[Value] {
        &self.var_positional
    }

    pub fn extra_keyword(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.var_keyword.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Bind a call's arguments to `signature`, applying defaults.
///
/// Fails with a binding error for surplus positional arguments, unknown or
/// repeated keywords, and missing required parameters.
pub fn bind(signature: &Signature, args: &CallArgs) -> GuardResult<BoundArguments> {
    let fail = |message: String| GuardError::binding(&signature.name, message);

    let mut slots: Vec<(&Parameter, Option<Value>)> =
        signature.params.iter().map(|p| (p, None)).collect();
    let mut bound = BoundArguments {
        var_positional_name: signature.var_positional.clone(),
        var_keyword_name: signature.var_keyword.clone(),
        ..Default::default()
    };

    let positional_slots: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, (param, _))| !param.keyword_only)
        .map(|(index, _)| index)
        .collect();

    for (position, value) in args.positional.iter().enumerate() {
        match positional_slots.get(position) {
            Some(&index) => slots[index].1 = Some(value.clone()),
            None if signature.var_positional.is_some() => bound.var_positional.push(value.clone()),
            None => {
                return Err(fail(format!(
                    "takes {} positional argument{} but {} were given",
                    positional_slots.len(),
                    if positional_slots.len() == 1 { "" } else { "s" },
                    args.positional.len()
                )))
            }
        }
    }

    for (name, value) in &args.keyword {
        if let Some(slot) = slots.iter_mut().find(|(param, _)| param.name == *name) {
            if slot.1.is_some() {
                return Err(fail(format!("got multiple values for argument '{name}'")));
            }
            slot.1 = Some(value.clone());
        } else if signature.var_keyword.is_some() {
            if bound.var_keyword.iter().any(|(existing, _)| existing == name) {
                return Err(fail(format!("got multiple values for keyword argument '{name}'")));
            }
            bound.var_keyword.push((name.clone(), value.clone()));
        } else {
            return Err(fail(format!("got an unexpected keyword argument '{name}'")));
        }
    }

    for (param, value) in slots {
        let value = match value.or_else(|| param.default.clone()) {
            Some(value) => value,
            None => return Err(fail(format!("missing required argument '{}'", param.name))),
        };
        bound.named.push((param.name.clone(), value));
    }

    tracing::debug!(
        "Bound call to '{}': {} named, {} extra positional, {} extra keyword",
        signature.name,
        bound.named.len(),
        bound.var_positional.len(),
        bound.var_keyword.len()
    );

    Ok(bound)
}
