//! # Model CLI
//!
//! Inspect persisted model documents from the terminal.
//!
//! ```text
//! model_cli inspect beam.json --type oM.Structure.SteelSection
//! model_cli types
//! ```
//!
//! `inspect` prints the materialized graph as JSON followed by every
//! diagnostic, and exits non-zero when an Error was recorded.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use model_core::diagnostics::DiagnosticLog;
use model_core::io::{load_settings, read_document};
use model_core::models::catalog_for;
use model_core::types::TypeDescriptor;
use model_core::{Deserializer, DeserializerSettings, Severity};

#[derive(Parser)]
#[command(name = "model_cli", version, about = "Inspect persisted model documents")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON settings file
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Materialize a document and report diagnostics
    Inspect {
        file: PathBuf,

        /// Target type; defaults to the document's own `_t`
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,

        /// Schema version the document was written with
        #[arg(long = "schema-version")]
        schema_version: Option<String>,
    },
    /// List registered types
    Types,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn settings(path: Option<&PathBuf>) -> Result<DeserializerSettings> {
    match path {
        Some(path) => load_settings(path).with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(DeserializerSettings::default()),
    }
}

fn inspect(
    deserializer: &Deserializer,
    file: &Path,
    type_name: Option<&str>,
    schema_version: Option<&str>,
) -> Result<bool> {
    let node = read_document(file)?;
    let log = DiagnosticLog::new();
    let version = schema_version.unwrap_or(&deserializer.settings().current_version);

    let target = match type_name {
        Some(name) => deserializer.resolve(name, &log)?,
        None => TypeDescriptor::dynamic(),
    };
    debug!(type_name = target.name(), version, "materializing");
    let instance = deserializer.materialize(&node, &target, None, version, false, &log);

    println!("{}", serde_json::to_string_pretty(&instance.to_json())?);

    let diagnostics = log.take();
    if !diagnostics.is_empty() {
        println!();
        println!("Diagnostics:");
        for diagnostic in &diagnostics {
            println!("  {}", diagnostic);
        }
    }
    info!(count = diagnostics.len(), "inspection finished");
    Ok(diagnostics.iter().any(|d| d.severity == Severity::Error))
}

fn list_types(deserializer: &Deserializer) {
    for entry in deserializer.catalog().entries() {
        println!(
            "{:<48} {:<22} {}",
            entry.descriptor.name(),
            entry.descriptor.category().label(),
            entry.assembly
        );
    }
}

fn run(cli: Cli) -> Result<bool> {
    let settings = settings(cli.settings.as_ref())?;
    let deserializer = Deserializer::new(catalog_for(&settings)).with_settings(settings);

    match cli.command {
        Command::Inspect {
            file,
            type_name,
            schema_version,
        } => inspect(&deserializer, &file, type_name.as_deref(), schema_version.as_deref()),
        Command::Types => {
            list_types(&deserializer);
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
