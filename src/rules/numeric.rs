//! Numeric rules
//!
//! `IntBetween` and `IntGreater` require the value to already be an integer.
//! The rest coerce it first, so `"42"` satisfies `Greater::new(10.0)`.

use super::{violation, Rule};
use crate::domain::{GuardError, GuardResult, Value, Violation};
use std::collections::BTreeSet;

/// Fails unless the value, parsed as an integer, is in the allowed set
#[derive(Debug, Clone)]
pub struct InSet {
    allowed: BTreeSet<i64>,
}

impl InSet {
    pub fn new(allowed: impl IntoIterator<Item = i64>) -> Self {
        Self { allowed: allowed.into_iter().collect() }
    }

    fn render_allowed(&self) -> String {
        let items: Vec<String> = self.allowed.iter().map(i64::to_string).collect();
        format!("{{{}}}", items.join(", "))
    }
}

impl Rule for InSet {
    fn kind(&self) -> &'static str {
        "in_set"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        match value.to_int() {
            Some(number) if self.allowed.contains(&number) => Ok(()),
            _ => Err(violation(
                self.kind(),
                key,
                format!("Invalid value, {} expected", self.render_allowed()),
            )),
        }
    }

    fn describe(&self) -> String {
        format!("in_set({})", self.render_allowed())
    }
}

/// Fails unless the value can be parsed as a number
#[derive(Debug, Clone, Copy, Default)]
pub struct IsNumeric;

impl Rule for IsNumeric {
    fn kind(&self) -> &'static str {
        "is_numeric"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        if value.to_float().is_none() {
            return Err(violation(
                self.kind(),
                key,
                format!("Invalid value {value}, number expected"),
            ));
        }
        Ok(())
    }
}

fn ordered_bounds<T: PartialOrd + std::fmt::Display>(kind: &str, min: T, max: T) -> GuardResult<()> {
    // Also rejects NaN bounds, which compare false both ways.
    if !(min <= max) {
        return Err(GuardError::config(format!(
            "{kind} rule has invalid bounds {min}-{max}"
        )));
    }
    Ok(())
}

/// Fails unless the value, parsed as a number, is within `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct Between {
    min: f64,
    max: f64,
}

impl Between {
    pub fn new(min: f64, max: f64) -> GuardResult<Self> {
        ordered_bounds("between", min, max)?;
        Ok(Self { min, max })
    }
}

impl Rule for Between {
    fn kind(&self) -> &'static str {
        "between"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        match value.to_float() {
            Some(number) if self.min <= number && number <= self.max => Ok(()),
            _ => Err(violation(
                self.kind(),
                key,
                format!(
                    "Invalid value, {}-{} expected",
                    Value::Float(self.min),
                    Value::Float(self.max)
                ),
            )),
        }
    }

    fn describe(&self) -> String {
        format!("between({}, {})", Value::Float(self.min), Value::Float(self.max))
    }
}

/// Fails unless the value is an integer within `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct IntBetween {
    min: i64,
    max: i64,
}

impl IntBetween {
    pub fn new(min: i64, max: i64) -> GuardResult<Self> {
        ordered_bounds("int_between", min, max)?;
        Ok(Self { min, max })
    }
}

impl Rule for IntBetween {
    fn kind(&self) -> &'static str {
        "int_between"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        let Some(number) = value.as_int() else {
            return Err(violation(self.kind(), key, "Invalid value, int expected"));
        };
        if !(self.min..=self.max).contains(&number) {
            return Err(violation(
                self.kind(),
                key,
                format!("Invalid value {number}, {}-{} expected", self.min, self.max),
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("int_between({}, {})", self.min, self.max)
    }
}

/// Fails unless the value is an integer `>= min`
#[derive(Debug, Clone, Copy)]
pub struct IntGreater {
    min: i64,
}

impl IntGreater {
    pub fn new(min: i64) -> Self {
        Self { min }
    }
}

impl Rule for IntGreater {
    fn kind(&self) -> &'static str {
        "int_greater"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        let Some(number) = value.as_int() else {
            return Err(violation(self.kind(), key, "Invalid value, int expected"));
        };
        if number < self.min {
            return Err(violation(
                self.kind(),
                key,
                format!("Invalid value, >= {} expected", self.min),
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("int_greater({})", self.min)
    }
}

/// Fails unless the value, parsed as a number, is `>= min`
#[derive(Debug, Clone, Copy)]
pub struct Greater {
    min: f64,
}

impl Greater {
    pub fn new(min: f64) -> Self {
        Self { min }
    }
}

impl Rule for Greater {
    fn kind(&self) -> &'static str {
        "greater"
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), Violation> {
        let Some(number) = value.to_float() else {
            return Err(violation(self.kind(), key, "Invalid value, Numeric expected"));
        };
        // NaN compares false, so it is rejected here too.
        if !(number >= self.min) {
            return Err(violation(
                self.kind(),
                key,
                format!("Invalid value, >= {} expected", Value::Float(self.min)),
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("greater({})", Value::Float(self.min))
    }
}
