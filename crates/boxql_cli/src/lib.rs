//! Command-line interface for boxql.
//!
//! # Usage
//!
//! ```bash
//! # Validate documents against a schema
//! boxql check --schema schema.graphql query.graphql other.graphql
//!
//! # Print the rewritten document as JSON
//! boxql ir --schema schema.graphql query.graphql
//!
//! # Execute a query against a JSON root value
//! boxql run --schema schema.graphql --query query.graphql --root data.json
//!
//! # Re-print a schema as SDL
//! boxql print-schema schema.graphql
//! ```

use boxql_core::{Diagnostic, DiagnosticSeverity};
use boxql_runtime::{Context, Executor, ExecutorConfig, ResolverMap};
use boxql_schema::{print_schema, Schema, SchemaError};
use boxql_validation::{IrDocument, Validator, ValidatorConfig, Variables};
use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{GraphicalReportHandler, GraphicalTheme, LabeledSpan, NamedSource, SourceCode};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value as Json;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

type CliResult = Result<i32, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "boxql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON file with `validation` and `execution` settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate documents against a schema
    Check {
        /// Schema file (SDL)
        #[arg(short, long)]
        schema: PathBuf,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the rewritten document as JSON
    Ir {
        /// Schema file (SDL)
        #[arg(short, long)]
        schema: PathBuf,

        file: PathBuf,
    },

    /// Execute a document against a JSON root value
    Run {
        /// Schema file (SDL)
        #[arg(short, long)]
        schema: PathBuf,

        /// Document to execute
        #[arg(long)]
        query: PathBuf,

        /// JSON file used as the root value
        #[arg(long)]
        root: Option<PathBuf>,

        /// JSON object with variable values
        #[arg(long)]
        variables: Option<PathBuf>,

        /// Operation to run when the document has several
        #[arg(long)]
        operation: Option<String>,
    },

    /// Print a schema as SDL
    PrintSchema { schema: PathBuf },

    /// Print version information
    Version,
}

/// Settings read from `--config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub validation: ValidatorConfig,
    pub execution: ExecutorConfig,
}

impl Config {
    /// Reads the config file, or returns the defaults when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
            None => Ok(Self::default()),
        }
    }
}

pub async fn run(cli: Cli) -> CliResult {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match &cli.command {
        Commands::Check { schema, files } => check_files(&schema, &files, &config, &cli),
        Commands::Ir { schema, file } => print_ir(&schema, &file, &config),
        Commands::Run {
            schema,
            query,
            root,
            variables,
            operation,
        } => {
            run_query(
                &schema,
                &query,
                root.as_deref(),
                variables.as_deref(),
                operation.as_deref(),
                &config,
            )
            .await
        }
        Commands::PrintSchema { schema } => {
            let schema = load_schema(&schema)?;
            print!("{}", print_schema(&schema)?);
            Ok(0)
        }
        Commands::Version => {
            println!("boxql {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

/// Outcome of validating one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub errors: usize,
    /// Rendered diagnostics, empty when the file is valid.
    pub rendered: String,
}

fn check_files(schema_path: &Path, files: &[PathBuf], config: &Config, cli: &Cli) -> CliResult {
    let schema = load_schema(schema_path)?;
    let validator = Validator::new(&schema).with_config(config.validation.clone());
    tracing::debug!(files = files.len(), "checking documents");

    let reports = files
        .par_iter()
        .map(|file| {
            let source = std::fs::read_to_string(file)?;
            Ok(check_source(&validator, file, &source))
        })
        .collect::<Result<Vec<FileReport>, std::io::Error>>()?;

    let mut has_errors = false;
    for report in &reports {
        if cli.verbose {
            println!("{} {}", "Checking".blue(), report.path.display());
        }
        if report.errors > 0 {
            has_errors = true;
            eprintln!(
                "{} {} ({} error(s))",
                "Error".red().bold(),
                report.path.display(),
                report.errors
            );
            eprint!("{}", report.rendered);
        } else if cli.verbose {
            println!("{} {}", "OK".green(), report.path.display());
        }
    }

    if has_errors {
        Ok(1)
    } else {
        if !cli.quiet {
            println!(
                "{} {} file(s) checked",
                "Success:".green().bold(),
                reports.len()
            );
        }
        Ok(0)
    }
}

/// Validates one document and renders its diagnostics.
pub fn check_source(validator: &Validator<'_>, path: &Path, source: &str) -> FileReport {
    match validator.validate_source(source) {
        Ok(result) => FileReport {
            path: path.to_path_buf(),
            errors: result
                .errors
                .iter()
                .filter(|d| d.severity == DiagnosticSeverity::Error)
                .count(),
            rendered: render(path, source, &result.errors),
        },
        Err(error) => FileReport {
            path: path.to_path_buf(),
            errors: 1,
            rendered: format!("{error}\n"),
        },
    }
}

/// Validates one document and returns its rewritten form, or the report
/// describing why it is invalid.
pub fn rewrite_source(
    validator: &Validator<'_>,
    path: &Path,
    source: &str,
) -> Result<IrDocument, FileReport> {
    let report = |errors, rendered| FileReport {
        path: path.to_path_buf(),
        errors,
        rendered,
    };
    match validator.validate_source(source) {
        Ok(result) => match result.internal_representation {
            Some(ir) if result.is_valid() => Ok(ir),
            _ => Err(report(
                result.errors.len().max(1),
                render(path, source, &result.errors),
            )),
        },
        Err(error) => Err(report(1, format!("{error}\n"))),
    }
}

fn print_ir(schema_path: &Path, file: &Path, config: &Config) -> CliResult {
    let schema = load_schema(schema_path)?;
    let validator = Validator::new(&schema).with_config(config.validation.clone());
    let source = std::fs::read_to_string(file)?;

    match rewrite_source(&validator, file, &source) {
        Ok(ir) => {
            println!("{}", serde_json::to_string_pretty(&ir)?);
            Ok(0)
        }
        Err(report) => {
            eprint!("{}", report.rendered);
            Ok(1)
        }
    }
}

async fn run_query(
    schema_path: &Path,
    query: &Path,
    root: Option<&Path>,
    variables: Option<&Path>,
    operation: Option<&str>,
    config: &Config,
) -> CliResult {
    let schema = load_schema(schema_path)?;
    let validator = Validator::new(&schema).with_config(config.validation.clone());
    let source = std::fs::read_to_string(query)?;
    let ir = match rewrite_source(&validator, query, &source) {
        Ok(ir) => ir,
        Err(report) => {
            eprint!("{}", report.rendered);
            return Ok(1);
        }
    };

    let root = match root {
        Some(path) => read_json(path)?,
        None => Json::Object(serde_json::Map::new()),
    };
    let variables: Variables = match variables.map(read_json).transpose()? {
        Some(Json::Object(variables)) => variables,
        Some(_) => return Err("variables must be a JSON object".into()),
        None => Variables::new(),
    };

    let response = Executor::new(&schema)
        .with_resolvers(ResolverMap::new())
        .with_config(config.execution.clone())
        .execute(&ir, operation, variables, root, &Context::new())
        .await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(i32::from(response.has_errors()))
}

fn read_json(path: &Path) -> Result<Json, Box<dyn Error>> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

fn load_schema(path: &Path) -> Result<Schema, Box<dyn Error>> {
    let source = std::fs::read_to_string(path)?;
    match Schema::from_sdl(&source) {
        Ok(schema) => Ok(schema),
        Err(SchemaError::Syntax(diagnostics)) => {
            eprint!("{}", render(path, &source, &diagnostics));
            Err(format!("{} is not valid SDL", path.display()).into())
        }
        Err(error) => Err(error.into()),
    }
}

/// Renders diagnostics with source snippets.
pub fn render(path: &Path, source: &str, diagnostics: &[Diagnostic]) -> String {
    let named = NamedSource::new(path.display().to_string(), source.to_string());
    let theme = if colored::control::SHOULD_COLORIZE.should_colorize() {
        GraphicalTheme::unicode()
    } else {
        GraphicalTheme::unicode_nocolor()
    };
    let handler = GraphicalReportHandler::new_themed(theme);

    let mut out = String::new();
    for diagnostic in diagnostics {
        let snippet = Snippet {
            diagnostic,
            source: &named,
        };
        if handler.render_report(&mut out, &snippet).is_err() {
            out.push_str(&format!("{}: {diagnostic}\n", diagnostic.code));
        }
    }
    out
}

/// A diagnostic paired with the document it points into.
#[derive(Debug)]
struct Snippet<'a> {
    diagnostic: &'a Diagnostic,
    source: &'a NamedSource<String>,
}

impl fmt::Display for Snippet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.diagnostic, f)
    }
}

impl Error for Snippet<'_> {}

impl miette::Diagnostic for Snippet<'_> {
    fn code<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        Some(Box::new(self.diagnostic.code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diagnostic.severity {
            DiagnosticSeverity::Error => miette::Severity::Error,
            DiagnosticSeverity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        self.diagnostic
            .message
            .as_ref()
            .map(|message| Box::new(message) as Box<dyn fmt::Display + 'b>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(self.source)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if self.diagnostic.labels.is_empty() {
            return None;
        }
        Some(Box::new(self.diagnostic.labels.iter().map(|label| {
            let text = (!label.message.is_empty()).then(|| label.message.clone());
            LabeledSpan::new_with_span(text, label.span)
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "type Query { dog: Dog } type Dog { name: String barkVolume: Int }";

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_sections() {
        let config: Config = serde_json::from_str(
            r#"{"validation": {"max_depth": 3}, "execution": {"max_lazy_depth": 8}}"#,
        )
        .unwrap();
        assert_eq!(config.validation.max_depth, Some(3));
        assert_eq!(config.validation.max_nodes, None);
        assert_eq!(config.execution.max_lazy_depth, 8);

        let empty: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.execution, ExecutorConfig::default());
    }

    #[test]
    fn test_check_source_renders_conflicts() {
        colored::control::set_override(false);
        let schema = Schema::from_sdl(SCHEMA).unwrap();
        let validator = Validator::new(&schema);
        let path = Path::new("query.graphql");

        let report = check_source(&validator, path, "{ dog { name: barkVolume name } }");
        assert_eq!(report.errors, 1);
        assert!(report.rendered.contains("query.graphql"));
        assert!(report.rendered.contains("name"));

        let report = check_source(&validator, path, "{ dog { name } }");
        assert_eq!(report.errors, 0);
        assert!(report.rendered.is_empty());
    }

    #[test]
    fn test_rewrite_source() {
        let schema = Schema::from_sdl(SCHEMA).unwrap();
        let validator = Validator::new(&schema);
        let path = Path::new("query.graphql");

        let ir = rewrite_source(&validator, path, "query Q { dog { name } }").unwrap();
        assert!(ir.operation(Some("Q")).is_some());

        let report = rewrite_source(&validator, path, "{ cat }").unwrap_err();
        assert_eq!(report.errors, 1);
    }
}
