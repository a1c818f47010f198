//! Rule Guard CLI - Command-line interface for declarative guard configurations
//!
//! Architecture: Application Layer - CLI coordinates user interactions with guard services
//! - Loads YAML declarations into a fresh registry for every command
//! - Runs the attribute and call guard paths against JSON input
//! - Maps violations, binding errors and configuration errors to exit code 1

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rule_guard::rules::{rule_info, BUILTIN_RULES};
use rule_guard::{
    CallArgs, GuardConfig, GuardResult, OutputFormat, ReportFormatter, ReportOptions, RuleRegistry,
    ValidationReport, Value,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Rule Guard - Declarative validation rules for fields and call arguments
#[derive(Parser)]
#[command(name = "rule-guard")]
#[command(version)]
#[command(about = "Check values and calls against declarative validation rules")]
#[command(long_about = "Rule Guard loads field and parameter rules from a YAML file and checks assignments or calls against them, failing on the first violated rule.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// List the built-in rule kinds
    Rules,

    /// List the owners declared by a configuration file
    Owners,

    /// Explain what a rule kind checks
    Explain {
        /// Rule kind, e.g. `str_length`
        kind: String,
    },

    /// Check a field assignment against the rules of a type
    Check {
        /// Type whose field rules apply
        #[arg(long)]
        owner: String,

        /// Field being assigned
        #[arg(long, required_unless_present = "all")]
        field: Option<String>,

        /// Assigned value as JSON
        #[arg(long, required_unless_present = "all")]
        value: Option<String>,

        /// Check several fields and report every violation
        #[arg(long, requires = "values")]
        all: bool,

        /// Field values as a JSON object (with --all)
        #[arg(long)]
        values: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Bind and check a call against a callable's signature and rules
    Call {
        /// Callable whose parameter rules apply
        #[arg(long)]
        callable: String,

        /// Positional arguments as a JSON array
        #[arg(long, default_value = "[]")]
        args: String,

        /// Keyword arguments as a JSON object
        #[arg(long, default_value = "{}")]
        kwargs: String,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args, Clone)]
struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormatArg,

    /// Maximum number of violations to report
    #[arg(long)]
    max_violations: Option<usize>,
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

fn run_command(cli: Cli) -> Result<i32> {
    let use_colors = !cli.no_color;
    match cli.command {
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
        Commands::Rules => run_list_rules(),
        Commands::Owners => run_list_owners(cli.config.as_deref()),
        Commands::Explain { kind } => run_explain(&kind),
        Commands::Check { owner, field, value, all, values, output } => {
            let registry = load_registry(cli.config.as_deref())?;
            let report = if all {
                let values = values.context("--all requires --values")?;
                check_fields(&registry, &owner, &values)?
            } else {
                let field = field.context("--field is required")?;
                let value = value.context("--value is required")?;
                check_field(&registry, &owner, &field, &value)?
            };
            emit(&report, &output, use_colors)
        }
        Commands::Call { callable, args, kwargs, output } => {
            let registry = load_registry(cli.config.as_deref())?;
            let report = check_call(&registry, &callable, &args, &kwargs)?;
            emit(&report, &output, use_colors)
        }
    }
}

/// Load a configuration file into a fresh registry
fn load_registry(config_path: Option<&Path>) -> Result<RuleRegistry> {
    let path = config_path.context("a configuration file is required (--config <file>)")?;
    let config = GuardConfig::load_from_file(path)?;

    let registry = RuleRegistry::new();
    config.apply(&registry)?;
    Ok(registry)
}

fn parse_json(label: &str, input: &str) -> Result<serde_json::Value> {
    serde_json::from_str(input).with_context(|| format!("{label} is not valid JSON: {input}"))
}

fn check_field(registry: &RuleRegistry, owner: &str, field: &str, value: &str) -> Result<ValidationReport> {
    let guard = registry.guard_type(owner)?;
    let value = Value::from(parse_json("--value", value)?);

    let outcome = guard.check(field, &value);
    into_report(owner, outcome)
}

fn check_fields(registry: &RuleRegistry, owner: &str, values: &str) -> Result<ValidationReport> {
    let guard = registry.guard_type(owner)?;
    let values: BTreeMap<String, Value> = match parse_json("--values", values)? {
        serde_json::Value::Object(entries) => {
            entries.into_iter().map(|(name, value)| (name, Value::from(value))).collect()
        }
        other => anyhow::bail!("--values must be a JSON object, got {other}"),
    };

    Ok(guard.check_all(&values))
}

fn check_call(registry: &RuleRegistry, callable: &str, args: &str, kwargs: &str) -> Result<ValidationReport> {
    let guard = registry.guard_callable(callable, |_args: CallArgs| ())?;
    let args = CallArgs::from_json(parse_json("--args", args)?, parse_json("--kwargs", kwargs)?)?;

    let outcome = guard.check(&args).map(|bound| {
        for (name, value) in bound.named() {
            tracing::debug!("{} = {}", name, value);
        }
    });
    into_report(callable, outcome)
}

/// Turn a fail-fast outcome into a report; anything but a violation is an error
fn into_report(owner: &str, outcome: GuardResult<()>) -> Result<ValidationReport> {
    match ReportFormatter::report_from_outcome(owner, &outcome) {
        Some(report) => Ok(report),
        None => Err(outcome.map_or_else(anyhow::Error::from, |()| {
            anyhow::anyhow!("guard for '{owner}' produced no report")
        })),
    }
}

fn emit(report: &ValidationReport, output: &OutputArgs, use_colors: bool) -> Result<i32> {
    let formatter = ReportFormatter::new(ReportOptions {
        use_colors,
        max_violations: output.max_violations,
    });
    let formatted = formatter.format_report(report, output.format.into())?;
    println!("{formatted}");

    Ok(if report.has_violations() { 1 } else { 0 })
}

fn run_validate_config(config_path: Option<PathBuf>) -> Result<i32> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from("rule_guard.yaml"));

    println!("Validating configuration: {}", config_path.display());

    match GuardConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("Configuration summary:");
            println!("  Types: {}", config.types.len());
            println!("  Callables: {}", config.callables.len());
            println!("  Rules: {}", config.rule_count());
            Ok(0)
        }
        Err(e) => {
            eprintln!("Configuration validation failed: {e}");
            Ok(1)
        }
    }
}

fn run_explain(kind: &str) -> Result<i32> {
    if let Some(info) = rule_info(kind) {
        println!("Rule: {}", info.kind);
        if !info.parameters.is_empty() {
            println!("Parameters: {}", info.parameters);
        }
        println!("Coerces value: {}", if info.coercing { "yes" } else { "no" });
        println!();
        println!("  {}", info.description);
        return Ok(0);
    }

    eprintln!("Rule '{kind}' not found");
    println!();
    println!("Available rules:");
    for info in BUILTIN_RULES {
        println!("  - {}", info.kind);
    }
    Ok(1)
}

fn run_list_rules() -> Result<i32> {
    println!("Available Rules\n");
    for info in BUILTIN_RULES {
        if info.parameters.is_empty() {
            println!("  {} - {}", info.kind, info.description);
        } else {
            println!("  {}({}) - {}", info.kind, info.parameters, info.description);
        }
    }
    Ok(0)
}

fn run_list_owners(config_path: Option<&Path>) -> Result<i32> {
    let registry = load_registry(config_path)?;
    let owners = registry.owners()?;

    println!("Declared Owners\n");
    for owner in &owners {
        println!(
            "  {} ({}) - {} names, {} rules",
            owner.name,
            owner.kind.as_str(),
            owner.names,
            owner.rules
        );
    }
    if owners.is_empty() {
        println!("  (none)");
    }
    Ok(0)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = if verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
version: "1.0"
types:
  - name: TestClass
    fields:
      phone:
        - rule: not_none
        - rule: str_length
          length: 11
      email:
        rule: email_format
callables:
  - name: test_func
    params:
      - name: phone
      - name: email
        default: null
    var_positional: args
    var_keyword: kwargs
    rules:
      phone:
        rule: str_length
        length: 11
      email:
        - rule: not_none
        - rule: email_format
"#;

    fn registry() -> (TempDir, RuleRegistry) {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("rule_guard.yaml");
        fs::write(&config_file, CONFIG).unwrap();
        let registry = load_registry(Some(config_file.as_path())).unwrap();
        (temp_dir, registry)
    }

    fn plain(format: OutputFormatArg) -> OutputArgs {
        OutputArgs { format, max_violations: None }
    }

    #[test]
    fn test_check_field() {
        let (_dir, registry) = registry();

        let report = check_field(&registry, "TestClass", "phone", "\"11111111111\"").unwrap();
        assert!(!report.has_violations());

        let report = check_field(&registry, "TestClass", "phone", "null").unwrap();
        assert_eq!(report.violations[0].message, "<TestClass.phone> None value.");
        assert_eq!(emit(&report, &plain(OutputFormatArg::Json), false).unwrap(), 1);
    }

    #[test]
    fn test_check_unknown_owner() {
        let (_dir, registry) = registry();
        assert!(check_field(&registry, "Missing", "phone", "1").is_err());
        assert!(check_field(&registry, "TestClass", "phone", "not json").is_err());
    }

    #[test]
    fn test_check_all_fields() {
        let (_dir, registry) = registry();

        let report =
            check_fields(&registry, "TestClass", r#"{"phone": "123", "email": "12345@"}"#).unwrap();
        assert_eq!(report.violations.len(), 2);
        assert_eq!(report.summary.names_failed, 2);
        assert!(check_fields(&registry, "TestClass", "[1, 2]").is_err());
    }

    #[test]
    fn test_call_reports_first_violation() {
        let (_dir, registry) = registry();

        let report = check_call(
            &registry,
            "test_func",
            r#"["11111111111"]"#,
            r#"{"email": "12345@", "we": "we"}"#,
        )
        .unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].message, "<test_func.email> Invalid email format.");
        assert_eq!(emit(&report, &plain(OutputFormatArg::Human), false).unwrap(), 1);
    }

    #[test]
    fn test_call_binding_error() {
        let (_dir, registry) = registry();

        let err = check_call(&registry, "test_func", "[]", "{}").unwrap_err();
        assert!(err.to_string().contains("missing required argument 'phone'"));
    }

    #[test]
    fn test_call_passes() {
        let (_dir, registry) = registry();

        let report = check_call(
            &registry,
            "test_func",
            r#"["11111111111"]"#,
            r#"{"email": "12345@gmail.com"}"#,
        )
        .unwrap();
        assert_eq!(emit(&report, &plain(OutputFormatArg::Human), false).unwrap(), 0);
    }

    #[test]
    fn test_validate_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("rule_guard.yaml");
        fs::write(&config_file, CONFIG).unwrap();
        assert_eq!(run_validate_config(Some(config_file)).unwrap(), 0);

        let broken = temp_dir.path().join("broken.yaml");
        fs::write(&broken, "version: \"2.0\"\n").unwrap();
        assert_eq!(run_validate_config(Some(broken)).unwrap(), 1);
    }

    #[test]
    fn test_explain_rule() {
        assert_eq!(run_explain("str_length").unwrap(), 0);
        assert_eq!(run_explain("nonexistent_rule").unwrap(), 1);
    }

    #[test]
    fn test_list_owners() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("rule_guard.yaml");
        fs::write(&config_file, CONFIG).unwrap();
        assert_eq!(run_list_owners(Some(config_file.as_path())).unwrap(), 0);

        let empty = temp_dir.path().join("empty.yaml");
        fs::write(&empty, "version: \"1.0\"\n").unwrap();
        assert_eq!(run_list_owners(Some(empty.as_path())).unwrap(), 0);
        assert!(run_list_owners(None).is_err());
    }

    #[test]
    fn test_list_rules() {
        assert_eq!(run_list_rules().unwrap(), 0);
    }

    #[test]
    fn test_cli_parses_check_all() {
        let cli = Cli::try_parse_from([
            "rule-guard",
            "--config",
            "guards.yaml",
            "check",
            "--owner",
            "TestClass",
            "--all",
            "--values",
            "{}",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Check { all: true, .. }));

        assert!(Cli::try_parse_from(["rule-guard", "check", "--owner", "TestClass"]).is_err());
    }
}
