use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use flowexpr::{
    EngineConfig, ExpressionText, ImportHints, ImportSettings, RecompileOutcome, RecompileRequest, Recompiler, TypeId,
    TypeUniverse,
};
use flowexpr_lite::binder::expand_alias;
use flowexpr_lite::{LANGUAGE, LiteCompiler, Schema};
use miette::{IntoDiagnostic, miette};
use serde::Serialize;

/// Recompile a Lite expression and print its type and import closure
#[derive(Parser, Debug)]
#[command(name = "flowexpr-lite", version)]
struct Cli {
    /// Expression text
    expression: String,

    /// TOML schema declaring assemblies, types and variables
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// TOML engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compile as an assignable location instead of a value
    #[arg(short, long)]
    reference: bool,

    /// Result type the expression must produce
    #[arg(short, long)]
    target: Option<String>,

    /// Namespace import hint (repeatable)
    #[arg(short, long = "namespace")]
    namespaces: Vec<String>,

    /// Assembly reference hint, as a display name (repeatable)
    #[arg(short, long = "assembly")]
    assemblies: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Report<'a> {
    resolved_type: String,
    #[serde(flatten)]
    imports: &'a ImportSettings,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("flowexpr=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    Cli::parse().run()
}

impl Cli {
    fn run(&self) -> miette::Result<()> {
        let schema = match &self.schema {
            Some(path) => Schema::from_file(path).into_diagnostic()?,
            None => Schema::default(),
        };
        let config = match &self.config {
            Some(path) => EngineConfig::from_file(path).into_diagnostic()?,
            None => EngineConfig::default(),
        };

        let universe = Arc::new(schema.universe);
        let target = self.target.as_deref().map(|name| self.resolve_target(&universe, name)).transpose()?;
        let recompiler = Recompiler::new(LiteCompiler::new(Arc::clone(&universe)), Arc::clone(&universe), &config);

        let hints = ImportHints::from_lists(
            self.namespaces.iter().map(Some),
            self.assemblies.iter().map(Some),
        );
        let text = ExpressionText::new(self.expression.as_str(), LANGUAGE);
        let request = if self.reference {
            RecompileRequest::reference(text, &schema.environment)
        } else {
            RecompileRequest::value(text, &schema.environment)
        }
        .with_hints(hints)
        .with_target(target);

        match recompiler.recompile(&request)? {
            RecompileOutcome::Compiled {
                resolved_type, imports, ..
            } => {
                self.print(&universe, resolved_type, &imports)?;
                Ok(())
            }
            RecompileOutcome::CompileFailed { diagnostic, .. } => Err(diagnostic.into()),
        }
    }

    fn resolve_target(&self, universe: &TypeUniverse, name: &str) -> miette::Result<TypeId> {
        let namespaces = self.namespaces.iter().map(String::as_str).chain(["System"]);
        universe
            .resolve_type_name(expand_alias(name), namespaces)
            .ok_or_else(|| miette!("Unknown target type `{name}`"))
    }

    fn print(&self, universe: &TypeUniverse, resolved_type: TypeId, imports: &ImportSettings) -> miette::Result<()> {
        if self.json {
            let report = Report {
                resolved_type: universe.full_name(resolved_type),
                imports,
            };
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            return Ok(());
        }

        println!("{} {}", "type:".bold(), universe.full_name(resolved_type).green());
        if imports.is_empty() {
            println!("{}", "no imports".dimmed());
        }
        for record in imports.records() {
            match &record.namespace {
                Some(namespace) => println!("  {} {}", record.assembly.cyan(), namespace),
                None => println!("  {}", record.assembly.cyan()),
            }
        }
        Ok(())
    }
}
