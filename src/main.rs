//! Arazzo CLI - validate, walk and re-serialize Arazzo documents

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use arazzo::{marshal, unmarshal, walk, ArazzoError, FixSuggestion, Options, ValidationResult, Validator};

const DOCUMENT_SUFFIXES: [&str; 3] = [".arazzo.yaml", ".arazzo.yml", ".arazzo.json"];

#[derive(Parser)]
#[command(name = "arazzo")]
#[command(about = "Validate and inspect Arazzo workflow documents")]
#[command(version)]
struct Cli {
    /// Log decode and validation progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate documents; directories are searched for *.arazzo.{yaml,yml,json}
    Validate {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only report findings from decoding the document shape
        #[arg(long)]
        skip_validation: bool,
    },

    /// List every object of a document as a JSON pointer
    Walk { file: PathBuf },

    /// Re-serialize a document to stdout
    Fmt {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate { paths, skip_validation } => validate(&paths, skip_validation),
        Commands::Walk { file } => walk_document(&file).map(|()| true),
        Commands::Fmt { file, format } => fmt_document(&file, format).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.downcast_ref::<ArazzoError>().and_then(|e| e.fix_suggestion()) {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            ExitCode::FAILURE
        }
    }
}

/// Files named by `paths`, with directories expanded to the documents they contain
fn collect_documents(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy();
                DOCUMENT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
            })
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }
    files
}

fn validate(paths: &[PathBuf], skip_validation: bool) -> Result<bool> {
    let files = collect_documents(paths);
    if files.is_empty() {
        anyhow::bail!("no Arazzo documents found");
    }

    let validator = Validator::new(Options::new().skip_validation(skip_validation));
    let mut all_valid = true;
    for file in &files {
        let result = validator.validate_file(file)?;
        all_valid &= result.is_valid();
        report(&result);
    }
    Ok(all_valid)
}

fn report(result: &ValidationResult) {
    if result.is_valid() {
        println!(
            "{} {} ({} workflows, {} steps)",
            "✓".green(),
            result.file_path,
            result.workflow_count,
            result.step_count
        );
        return;
    }

    for error in &result.errors {
        println!(
            "{}:{}:{}: {}",
            result.file_path.bold(),
            error.line,
            error.column,
            error.message
        );
    }
    println!(
        "{} {} has {} finding(s)",
        "✗".red(),
        result.file_path,
        result.errors.len()
    );
}

fn load(file: &Path) -> Result<arazzo::Arazzo> {
    let source = std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let (document, _) = unmarshal(&source, &Options::new().skip_validation(true))
        .with_context(|| format!("Failed to parse {:?}", file))?;
    Ok(document)
}

fn walk_document(file: &Path) -> Result<()> {
    let document = load(file)?;
    for item in walk(&document) {
        println!("{} {}", item.pointer(), item.node.kind().dimmed());
    }
    Ok(())
}

fn fmt_document(file: &Path, format: Format) -> Result<()> {
    let document = load(file)?;
    let out = match format {
        Format::Yaml => marshal::to_yaml(&document)?,
        Format::Json => marshal::to_json(&document)?,
    };
    print!("{out}");
    if !out.ends_with('\n') {
        println!();
    }
    Ok(())
}
