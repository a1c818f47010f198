//! Ordered, mergeable mapping from a field or parameter name to its rules

use crate::domain::{GuardResult, ValidationReport, Value};
use crate::rules::{Rule, SharedRule};
use std::fmt;
use std::sync::Arc;

/// Rules for every guarded name of one owner.
///
/// Names keep the order in which they were first declared. Declaring a name
/// again appends to its rule list; nothing is replaced or deduplicated.
#[derive(Clone, Default)]
pub struct RuleSet {
    entries: Vec<(String, Vec<SharedRule>)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one rule to `name`
    pub fn rule(mut self, name: impl Into<String>, rule: impl Rule + 'static) -> Self {
        self.push(name, vec![Arc::new(rule)]);
        self
    }

    /// Append an ordered list of rules to `name`
    pub fn rules(mut self, name: impl Into<String>, rules: Vec<SharedRule>) -> Self {
        self.push(name, rules);
        self
    }

    /// Extend the rule list of `name`, creating it if needed
    pub fn push(&mut self, name: impl Into<String>, rules: Vec<SharedRule>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => existing.extend(rules),
            None => self.entries.push((name, rules)),
        }
    }

    /// Merge a later declaration into this one, name by name
    pub fn merge(&mut self, other: RuleSet) {
        for (name, rules) in other.entries {
            self.push(name, rules);
        }
    }

    /// Rules registered for `name`, in evaluation order
    pub fn rules_for(&self, name: &str) -> &[SharedRule] {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    /// Guarded names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SharedRule])> {
        self.entries.iter().map(|(name, rules)| (name.as_str(), rules.as_slice()))
    }

    /// Number of guarded names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of rules across all names
    pub fn rule_count(&self) -> usize {
        self.entries.iter().map(|(_, rules)| rules.len()).sum()
    }

    /// Run the rules of `name` against `value`, stopping at the first failure
    pub fn check(&self, owner: &str, name: &str, value: &Value) -> GuardResult<()> {
        let rules = self.rules_for(name);
        if rules.is_empty() {
            return Ok(());
        }

        let qualified = qualify(owner, name);
        for rule in rules {
            tracing::trace!(
                "Checking {} ({}) with rule '{}'",
                qualified,
                value.type_name(),
                rule.describe()
            );
            rule.check(&qualified, value)?;
        }
        Ok(())
    }

    /// Check every guarded name that `lookup` can resolve, fail-fast across names
    pub fn check_present<'v, F>(&self, owner: &str, mut lookup: F) -> GuardResult<()>
    where
        F: FnMut(&str) -> Option<std::borrow::Cow<'v, Value>>,
    {
        for (name, _) in &self.entries {
            if let Some(value) = lookup(name.as_str()) {
                self.check(owner, name, &value)?;
            }
        }
        Ok(())
    }

    /// Collect every violation instead of stopping at the first one.
    ///
    /// Within a name, rules still run in order but every failure is kept.
    pub fn check_all<'v, F>(&self, owner: &str, mut lookup: F) -> ValidationReport
    where
        F: FnMut(&str) -> Option<std::borrow::Cow<'v, Value>>,
    {
        let mut report = ValidationReport::new(owner);

        for (name, rules) in &self.entries {
            let Some(value) = lookup(name.as_str()) else {
                continue;
            };

            let qualified = qualify(owner, name);
            let mut failed = false;
            report.summary.names_checked += 1;
            for rule in rules {
                report.summary.rules_evaluated += 1;
                if let Err(violation) = rule.check(&qualified, &value) {
                    failed = true;
                    report.add_violation(violation);
                }
            }
            if failed {
                report.summary.names_failed += 1;
            }
        }

        report
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, rules) in &self.entries {
            let described: Vec<String> = rules.iter().map(|r| r.describe()).collect();
            map.entry(name, &described);
        }
        map.finish()
    }
}

/// `Owner.name`, or just `name` for an anonymous owner
pub fn qualify(owner: &str, name: &str) -> String {
    if owner.is_empty() {
        name.to_string()
    } else {
        format!("{owner}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Violation;
    use crate::rules;
    use crate::rules::{EmailFormat, NotNone, StrLength};
    use std::borrow::Cow;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test double counting how often it runs
    #[derive(Debug, Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Rule for Counting {
        fn kind(&self) -> &'static str {
            "counting"
        }

        fn check(&self, _key: &str, _value: &Value) -> Result<(), Violation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn kinds(set: &RuleSet, name: &str) -> Vec<&'static str> {
        set.rules_for(name).iter().map(|r| r.kind()).collect()
    }

    #[test]
    fn test_merge_appends_in_declaration_order() {
        let mut set = RuleSet::new().rule("email", EmailFormat);
        set.merge(RuleSet::new().rule("email", NotNone));

        assert_eq!(kinds(&set, "email"), ["email_format", "not_none"]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.rule_count(), 2);
    }

    #[test]
    fn test_merge_does_not_deduplicate() {
        let mut set = RuleSet::new().rule("phone", NotNone);
        set.merge(RuleSet::new().rule("phone", NotNone));
        assert_eq!(kinds(&set, "phone"), ["not_none", "not_none"]);
    }

    #[test]
    fn test_names_keep_first_declaration_order() {
        let mut set = RuleSet::new().rule("phone", NotNone).rule("email", EmailFormat);
        set.merge(RuleSet::new().rule("age", NotNone).rule("phone", StrLength::new(11)));

        let names: Vec<_> = set.names().collect();
        assert_eq!(names, ["phone", "email", "age"]);
        assert_eq!(kinds(&set, "phone"), ["not_none", "str_length"]);
    }

    #[test]
    fn test_unguarded_name_passes() {
        let set = RuleSet::new().rule("phone", NotNone);
        assert!(set.rules_for("email").is_empty());
        assert!(set.check("Contact", "email", &Value::None).is_ok());
    }

    #[test]
    fn test_check_fails_fast() {
        let counter = Arc::new(Counting::default());
        let set = RuleSet::new().rules(
            "phone",
            vec![Arc::new(NotNone) as SharedRule, counter.clone() as SharedRule],
        );

        let err = set.check("Contact", "phone", &Value::None).unwrap_err();
        assert_eq!(err.to_string(), "<Contact.phone> None value.");
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);

        set.check("Contact", "phone", &Value::from("1")).unwrap();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_check_present_skips_missing_names() {
        let set = RuleSet::new().rule("phone", NotNone).rule("email", EmailFormat);
        let values: BTreeMap<&str, Value> = [("email", Value::from("12345@"))].into();

        let err = set
            .check_present("f", |name| values.get(name).map(Cow::Borrowed))
            .unwrap_err();
        assert_eq!(err.as_violation().unwrap().qualified_name, "f.email");
    }

    #[test]
    fn test_check_all_collects_every_violation() {
        let set = RuleSet::new()
            .rules("phone", rules![NotNone, StrLength::new(11)])
            .rule("email", EmailFormat);
        let values: BTreeMap<&str, Value> =
            [("phone", Value::None), ("email", Value::from("bad"))].into();

        let report = set.check_all("Contact", |name| values.get(name).map(Cow::Borrowed));

        let found: Vec<_> = report.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(found, ["not_none", "str_length", "email_format"]);
        assert_eq!(report.summary.names_checked, 2);
        assert_eq!(report.summary.rules_evaluated, 3);
        assert_eq!(report.summary.names_failed, 2);
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("Contact", "phone"), "Contact.phone");
        assert_eq!(qualify("", "phone"), "phone");
    }

    #[test]
    fn test_debug_lists_rules() {
        let set = RuleSet::new().rules("phone", rules![NotNone, StrLength::new(11)]);
        assert_eq!(format!("{set:?}"), r#"{"phone": ["not_none", "str_length(11)"]}"#);
    }
}
