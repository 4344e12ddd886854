//! smith — resolve and inspect agent definitions.
//!
//! Thin glue over `smith-adl-resolve`: reads `*.adl` documents from a
//! directory, applies `--var` / `--var-file` / `SMITH_VAR_*` overrides,
//! and either validates or prints the resolved configuration. All the
//! actual work happens in the library; this binary only does I/O.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use smith_adl_resolve::{Error, Loader};
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "smith")]
#[command(about = "Resolve agent definitions written in ADL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a configuration directory and report every problem found.
    Validate {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Resolve a configuration directory and print it as JSON.
    Show {
        #[command(flatten)]
        config: ConfigArgs,
        /// Print sensitive variable values instead of redacting them.
        #[arg(long)]
        reveal_sensitive: bool,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Directory containing *.adl documents.
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Set a variable (repeatable): --var name=value
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Load variable overrides from a file (repeatable).
    #[arg(long = "var-file", value_name = "PATH")]
    var_files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smith=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { config } => match load_and_resolve(&config) {
            Ok(_) => {
                println!("configuration is valid");
                ExitCode::SUCCESS
            }
            Err(code) => code,
        },
        Command::Show {
            config,
            reveal_sensitive,
        } => match load_and_resolve(&config) {
            Ok(resolved) => {
                let json = resolved.to_json(!reveal_sensitive);
                match serde_json::to_string_pretty(&json) {
                    Ok(rendered) => {
                        println!("{}", rendered);
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        error!("failed to render configuration: {}", e);
                        ExitCode::FAILURE
                    }
                }
            }
            Err(code) => code,
        },
    }
}

/// Build a loader from CLI arguments and run the resolution pass.
fn load_and_resolve(args: &ConfigArgs) -> Result<smith_adl_resolve::ResolvedConfig, ExitCode> {
    let mut loader = Loader::with_agent_defaults();

    for path in document_paths(&args.dir)? {
        let text = read_file(&path)?;
        let name = display_name(&path);
        debug!(file = %name, "loading document");
        if let Err(errors) = loader.add_source(name, text) {
            return Err(report(&errors));
        }
    }

    for path in &args.var_files {
        let text = read_file(path)?;
        if let Err(errors) = loader.add_var_file(display_name(path), text) {
            return Err(report(&errors));
        }
    }

    loader.load_env(std::env::vars());

    for assignment in &args.vars {
        if let Err(e) = loader.add_var_assignment(assignment) {
            return Err(report(std::slice::from_ref(&e)));
        }
    }

    loader.resolve().map_err(|errors| report(&errors))
}

/// All `*.adl` documents in a directory, sorted by name. Override files
/// (`*.vars.adl`) are skipped; they only apply via --var-file.
fn document_paths(dir: &Path) -> Result<Vec<PathBuf>, ExitCode> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("cannot read directory {}: {}", dir.display(), e);
            return Err(ExitCode::FAILURE);
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.ends_with(".adl") && !name.ends_with(".vars.adl")
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        error!("no *.adl documents found in {}", dir.display());
        return Err(ExitCode::FAILURE);
    }
    Ok(paths)
}

fn read_file(path: &Path) -> Result<String, ExitCode> {
    std::fs::read_to_string(path).map_err(|e| {
        error!("cannot read {}: {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Print every error and return the failure exit code.
fn report(errors: &[Error]) -> ExitCode {
    for e in errors {
        error!("{}", e);
    }
    ExitCode::FAILURE
}
