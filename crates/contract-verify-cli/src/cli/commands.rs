//! CLI command definitions for contract-verify
//!
//! Clap-based commands for running contracts against a service, checking
//! contract files, and generating contracts from an OpenAPI document.

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use contract_verify_core::{contracts_from_openapi, loader, Contract, LoadedContract};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::output::{emit, OutputFormat, RunReport};
use super::ExitCode;
use crate::config::{RunnerConfig, ENV_BASE_URL};
use crate::error::VerifyError;
use crate::runner::{RunSummary, Runner, TestOutcome};

/// contract-verify CLI
///
/// Verify that a live HTTP service honors declarative request/response contracts.
#[derive(Parser, Debug)]
#[command(name = "contract-verify")]
#[command(
    about = "Contract Verify - check a live HTTP service against YAML contracts",
    long_about = None
)]
#[command(version)]
pub struct VerifyCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: VerifyCommands,
}

/// Log line formats
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum VerifyCommands {
    /// Run contracts against a live service
    ///
    /// Discovers every .yaml/.yml contract under the directory, sends each
    /// request to the base URL and validates the response. Settings not given
    /// as flags are read from CONTRACT_VERIFY_* environment variables.
    Run {
        /// Directory containing contract files
        #[arg(short, long)]
        contracts: PathBuf,

        /// Base URL of the service under test
        #[arg(short, long, env = ENV_BASE_URL)]
        base_url: String,

        /// Per-request timeout in milliseconds [default: 5000]
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Maximum number of contracts executed at once [default: 8]
        #[arg(long)]
        concurrency: Option<usize>,

        /// Output format for results
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Match expected header names ignoring case
        ///
        /// Received header names arrive lowercase; without this flag,
        /// declare expected headers in lowercase.
        #[arg(long)]
        ignore_header_case: bool,
    },

    /// Parse contract files and report malformed ones
    Check {
        /// Directory containing contract files
        #[arg(short, long)]
        contracts: PathBuf,

        /// Output format for results
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate contracts from an OpenAPI 3 or Swagger 2 document
    Generate {
        /// Path to the OpenAPI document (JSON or YAML)
        #[arg(short, long)]
        spec: PathBuf,

        /// Directory the contract files are written to
        #[arg(short, long)]
        out: PathBuf,

        /// Overwrite existing contract files
        #[arg(long)]
        force: bool,
    },
}

/// Execute the run command
pub async fn execute_run(
    contracts: PathBuf,
    config: RunnerConfig,
    format: Option<OutputFormat>,
    output: Option<PathBuf>,
) -> Result<ExitCode, VerifyError> {
    config.validate()?;
    let loaded = load_directory(&contracts)?;

    let runner = Runner::new(config).map_err(|e| VerifyError::invalid_input(e.to_string()))?;
    let summary = runner.run(loaded).await;

    write_report(&summary, format, output.as_deref())?;
    Ok(ExitCode::from_run(summary.is_success()))
}

/// Execute the check command
pub fn execute_check(
    contracts: PathBuf,
    format: Option<OutputFormat>,
    output: Option<PathBuf>,
) -> Result<ExitCode, VerifyError> {
    let start = Instant::now();
    let loaded = load_directory(&contracts)?;

    let outcomes = loaded
        .into_iter()
        .map(|entry| match entry.contract {
            Ok(_) => TestOutcome::pass(entry.name, 0),
            Err(err) => TestOutcome::fail(entry.name, vec![err.to_string()], 0),
        })
        .collect();
    let summary = RunSummary::from_outcomes(outcomes, start.elapsed().as_millis() as u64);

    write_report(&summary, format, output.as_deref())?;
    Ok(ExitCode::from_run(summary.is_success()))
}

/// Execute the generate command
pub fn execute_generate(
    spec: PathBuf,
    out: PathBuf,
    force: bool,
    quiet: bool,
) -> Result<ExitCode, VerifyError> {
    let content = std::fs::read_to_string(&spec).map_err(|e| {
        VerifyError::file_error(format!(
            "Failed to read OpenAPI document '{}': {}",
            spec.display(),
            e
        ))
    })?;
    let document = parse_document(&spec, &content)?;
    let contracts = contracts_from_openapi(&document)?;

    std::fs::create_dir_all(&out).map_err(|e| {
        VerifyError::file_error(format!("Failed to create '{}': {}", out.display(), e))
    })?;

    let targets = contract_files(&out, &contracts);
    if !force {
        if let Some(existing) = targets.iter().find(|path| path.exists()) {
            return Err(VerifyError::file_error(format!(
                "'{}' already exists (use --force to overwrite)",
                existing.display()
            )));
        }
    }

    for (contract, path) in contracts.iter().zip(&targets) {
        let yaml = serde_yaml::to_string(&contract.to_document())
            .map_err(|e| VerifyError::SerializationError(e.to_string()))?;
        std::fs::write(path, yaml).map_err(|e| {
            VerifyError::file_error(format!("Failed to write '{}': {}", path.display(), e))
        })?;
        tracing::debug!(contract = %contract.name, path = %path.display(), "contract written");
    }

    tracing::info!(count = contracts.len(), out = %out.display(), "contracts generated");
    if !quiet {
        println!(
            "{} Generated {} contract(s) in {}",
            "+".green(),
            contracts.len(),
            out.display()
        );
    }
    Ok(ExitCode::Success)
}

fn load_directory(contracts: &Path) -> Result<Vec<LoadedContract>, VerifyError> {
    if !contracts.is_dir() {
        return Err(VerifyError::file_error(format!(
            "Contracts directory '{}' does not exist or is not a directory",
            contracts.display()
        )));
    }
    let loaded = loader::load_contracts(contracts)?;
    if loaded.is_empty() {
        tracing::warn!(dir = %contracts.display(), "no contract files found");
    }
    Ok(loaded)
}

fn write_report(
    summary: &RunSummary,
    format: Option<OutputFormat>,
    output: Option<&Path>,
) -> Result<(), VerifyError> {
    if output.is_some() {
        colored::control::set_override(false);
    }
    let rendered = RunReport::from_summary(summary).render(format.unwrap_or_default())?;
    emit(&rendered, output)
}

/// Parse an OpenAPI document; anything that is not `.json` is read as YAML
fn parse_document(path: &Path, content: &str) -> Result<serde_json::Value, VerifyError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if extension == "json" {
        return serde_json::from_str(content)
            .map_err(|e| VerifyError::parse_error(format!("Invalid JSON: {}", e)));
    }

    // Going through the YAML tree keeps numeric keys such as `200:` as strings
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| VerifyError::parse_error(format!("Invalid YAML: {}", e)))?;
    serde_json::to_value(yaml)
        .map_err(|e| VerifyError::parse_error(format!("Unsupported YAML: {}", e)))
}

/// One output file per contract, unique after the names are made portable
///
/// A stem already taken gets a numeric suffix, compared ignoring case.
fn contract_files(out: &Path, contracts: &[Contract]) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    contracts
        .iter()
        .map(|contract| {
            let base = file_stem(&contract.name);
            let mut stem = base.clone();
            let mut n = 2;
            while !taken.insert(stem.to_lowercase()) {
                stem = format!("{}_{}", base, n);
                n += 1;
            }
            out.join(format!("{}.yaml", stem))
        })
        .collect()
}

/// File name for a contract, keeping only portable characters
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
