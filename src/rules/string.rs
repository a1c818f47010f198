//! Structural rules: presence, string shape and length

use super::{violation, Rule};
use crate::domain::{GuardError, GuardResult, Value, Violation};
use regex::Regex;

lazy_static::lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9\.\+_-]+@[A-Za-z0-9\._-]+\.[a-zA-Z]*\n?$")
            .expect("built-in email pattern is valid");
}

/// Fails when the value is absent
#[derive(Debug, Clone, Copy, Default)]
pub struct NotNone;

impl Rule for NotNone {
    fn kind(&self) -> &'static str {
        "not_none"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        if value.is_none() {
            return Err(violation(self.kind(), key, "None value."));
        }
        Ok(())
    }
}

/// Fails unless the value is a string of exactly `length` chars
#[derive(Debug, Clone, Copy)]
pub struct StrLength {
    length: usize,
}

impl StrLength {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Rule for StrLength {
    fn kind(&self) -> &'static str {
        "str_length"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        let Some(text) = value.as_str() else {
            return Err(violation(self.kind(), key, "Not str type"));
        };
        let actual = text.chars().count();
        if actual != self.length {
            return Err(violation(
                self.kind(),
                key,
                format!("Invalid length {actual}, {} expected", self.length),
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("str_length({})", self.length)
    }
}

/// Fails unless the value's length is within `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct Length {
    min: usize,
    max: usize,
}

impl Length {
    pub fn new(min: usize, max: usize) -> GuardResult<Self> {
        if min > max {
            return Err(GuardError::config(format!(
                "length rule has min {min} greater than max {max}"
            )));
        }
        Ok(Self { min, max })
    }
}

impl Default for Length {
    fn default() -> Self {
        Self { min: 1, max: 100 }
    }
}

impl Rule for Length {
    fn kind(&self) -> &'static str {
        "length"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        let Some(actual) = value.length() else {
            return Err(violation(self.kind(), key, "Invalid value, sized value expected"));
        };
        if !(self.min..=self.max).contains(&actual) {
            return Err(violation(
                self.kind(),
                key,
                format!("Invalid length {actual}, {}-{} expected", self.min, self.max),
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("length({}, {})", self.min, self.max)
    }
}

/// Fails unless the string matches the pattern at its start
#[derive(Debug, Clone)]
pub struct StrRegex {
    pattern: String,
    anchored: Regex,
}

impl StrRegex {
    pub fn new(pattern: impl Into<String>) -> GuardResult<Self> {
        let pattern = pattern.into();
        // Anchor at the start only; trailing input is allowed.
        let anchored = Regex::new(&format!("^(?:{pattern})")).map_err(|e| {
            GuardError::config(format!("Invalid regex '{pattern}': {e}"))
        })?;
        Ok(Self { pattern, anchored })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl Rule for StrRegex {
    fn kind(&self) -> &'static str {
        "str_regex"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        let Some(text) = value.as_str() else {
            return Err(violation(self.kind(), key, "Not str type"));
        };
        if !self.anchored.is_match(text) {
            return Err(violation(
                self.kind(),
                key,
                format!("Invalid str value pattern, '{}' expected", self.pattern),
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("str_regex('{}')", self.pattern)
    }
}

/// Fails unless the string looks like `local@domain.tld`
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailFormat;

impl Rule for EmailFormat {
    fn kind(&self) -> &'static str {
        "email_format"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        let Some(text) = value.as_str() else {
            return Err(violation(self.kind(), key, "Not str type"));
        };
        if !EMAIL_PATTERN.is_match(text) {
            return Err(violation(self.kind(), key, "Invalid email format."));
        }
        Ok(())
    }
}
