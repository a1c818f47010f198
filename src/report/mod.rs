//! Report generation for guard outcomes
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ValidationReport (domain) is converted to human-readable text or JSON
//! - Fail-fast outcomes are wrapped in a one-violation report before formatting

use crate::domain::{GuardError, GuardResult, ValidationReport, Violation};
use std::io::Write;

#[cfg(feature = "colors")]
use colored::Colorize;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Human,
    /// JSON for programmatic consumption
    Json,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true, max_violations: None }
    }
}

/// Formats validation reports
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Report for a single fail-fast outcome
    pub fn report_from_outcome(owner: &str, outcome: &GuardResult<()>) -> Option<ValidationReport> {
        let mut report = ValidationReport::new(owner);
        match outcome {
            Ok(()) => {}
            Err(GuardError::Violation(violation)) => report.add_violation(violation.clone()),
            Err(_) => return None,
        }
        Some(report)
    }

    /// Format a validation report in the specified format
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardResult<String> {
        let violations = self.limit(&report.violations);
        match format {
            OutputFormat::Human => Ok(self.format_human(report, violations)),
            OutputFormat::Json => self.format_json(report, violations),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> GuardResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn limit<'a>(&self, violations: &'a [Violation]) -> &'a [Violation] {
        match self.options.max_violations {
            Some(max) if max < violations.len() => &violations[..max],
            _ => violations,
        }
    }

    fn format_human(&self, report: &ValidationReport, violations: &[Violation]) -> String {
        let mut output = String::new();

        if violations.is_empty() {
            output.push_str(&self.paint_ok(&format!("No violations for {}", report.owner)));
            output.push('\n');
            return output;
        }

        output.push_str(&self.paint_error(&format!("Violations for {}", report.owner)));
        output.push_str("\n\n");
        for violation in violations {
            output.push_str(&format!("  {}\n", violation.format_display()));
        }

        let hidden = report.violations.len() - violations.len();
        if hidden > 0 {
            output.push_str(&format!("  ... and {hidden} more\n"));
        }

        if report.summary.names_checked > 0 {
            output.push_str(&format!(
                "\nSummary: {} of {} names failed, {} rules evaluated\n",
                report.summary.names_failed,
                report.summary.names_checked,
                report.summary.rules_evaluated
            ));
        }
        output
    }

    fn format_json(&self, report: &ValidationReport, violations: &[Violation]) -> GuardResult<String> {
        let value = serde_json::json!({
            "owner": report.owner,
            "valid": report.violations.is_empty(),
            "violations": violations,
            "summary": report.summary,
        });
        serde_json::to_string_pretty(&value)
            .map_err(|e| GuardError::config(format!("Failed to serialize report: {e}")))
    }

    #[cfg(feature = "colors")]
    fn paint_ok(&self, text: &str) -> String {
        if self.options.use_colors { text.green().to_string() } else { text.to_string() }
    }

    #[cfg(not(feature = "colors"))]
    fn paint_ok(&self, text: &str) -> String {
        text.to_string()
    }

    #[cfg(feature = "colors")]
    fn paint_error(&self, text: &str) -> String {
        if self.options.use_colors { text.red().bold().to_string() } else { text.to_string() }
    }

    #[cfg(not(feature = "colors"))]
    fn paint_error(&self, text: &str) -> String {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;

    fn plain() -> ReportFormatter {
        ReportFormatter::new(ReportOptions { use_colors: false, ..Default::default() })
    }

    fn create_test_report() -> ValidationReport {
        let mut report = ValidationReport::new("TestClass");
        report.add_violation(Violation::new(
            "str_length",
            "TestClass.phone",
            "<TestClass.phone> Invalid length 3, 11 expected",
        ));
        report.add_violation(Violation::new(
            "email_format",
            "TestClass.email",
            "<TestClass.email> Invalid email format.",
        ));
        report.summary.names_checked = 2;
        report.summary.names_failed = 2;
        report.summary.rules_evaluated = 3;
        report
    }

    #[test]
    fn test_human_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::Human).unwrap();

        assert!(output.contains("Violations for TestClass"));
        assert!(output.contains("TestClass.phone [str_length]"));
        assert!(output.contains("Summary: 2 of 2 names failed, 3 rules evaluated"));
    }

    #[test]
    fn test_json_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::Json).unwrap();

        let json: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["violations"].as_array().unwrap().len(), 2);
        assert_eq!(json["violations"][0]["qualified_name"], "TestClass.phone");
        assert_eq!(json["summary"]["rules_evaluated"], 3);
    }

    #[test]
    fn test_empty_report() {
        let output = plain().format_report(&ValidationReport::new("T"), OutputFormat::Human).unwrap();
        assert!(output.contains("No violations for T"));
    }

    #[test]
    fn test_max_violations() {
        let formatter =
            ReportFormatter::new(ReportOptions { use_colors: false, max_violations: Some(1) });
        let output = formatter.format_report(&create_test_report(), OutputFormat::Human).unwrap();

        assert!(output.contains("TestClass.phone"));
        assert!(!output.contains("TestClass.email"));
        assert!(output.contains("and 1 more"));
    }

    #[test]
    fn test_report_from_outcome() {
        let ok = ReportFormatter::report_from_outcome("T", &Ok(())).unwrap();
        assert!(!ok.has_violations());

        let failed: GuardResult<()> = Err(Violation::new("not_none", "T.a", "<T.a> None value.").into());
        let report = ReportFormatter::report_from_outcome("T", &failed).unwrap();
        assert_eq!(report.violations.len(), 1);

        let binding: GuardResult<()> = Err(GuardError::binding("f", "x"));
        assert!(ReportFormatter::report_from_outcome("f", &binding).is_none());
    }

    #[test]
    fn test_write_report() {
        let mut buffer = Vec::new();
        plain().write_report(&create_test_report(), OutputFormat::Json, &mut buffer).unwrap();
        assert!(String::from_utf8(buffer).unwrap().contains("\"owner\": \"TestClass\""));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("xml"), None);
        assert_eq!(OutputFormat::all_formats().len(), 2);
    }
}
