//! CLI module for contract-verify
//!
//! Command-line interface for running contracts against a live service,
//! checking contract files, and generating contracts from OpenAPI documents.

pub mod commands;
pub mod output;

pub use commands::{LogFormat, VerifyCli, VerifyCommands};
pub use output::{OutputFormat, RunReport};

use crate::config::RunnerConfig;
use crate::error::VerifyError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every contract passed
    Success = 0,
    /// At least one contract failed
    VerificationFailed = 1,
    /// Invalid input, arguments or documents
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Determine exit code from a run result
    pub fn from_run(success: bool) -> Self {
        if success {
            ExitCode::Success
        } else {
            ExitCode::VerificationFailed
        }
    }

    /// Determine exit code for an error that aborted the command
    pub fn from_error(err: &VerifyError) -> Self {
        if err.is_file_error() {
            ExitCode::FileError
        } else if err.is_user_error() {
            ExitCode::InvalidInput
        } else {
            ExitCode::InternalError
        }
    }
}

/// Run the CLI with the given arguments and return the exit code
pub async fn run(cli: VerifyCli) -> Result<ExitCode, VerifyError> {
    match cli.command {
        VerifyCommands::Run {
            contracts,
            base_url,
            timeout_ms,
            concurrency,
            format,
            output,
            ignore_header_case,
        } => {
            let config = run_config(
                RunnerConfig::from_env(),
                base_url,
                timeout_ms,
                concurrency,
                ignore_header_case,
            );
            commands::execute_run(contracts, config, format, output).await
        }
        VerifyCommands::Check {
            contracts,
            format,
            output,
        } => commands::execute_check(contracts, format, output),
        VerifyCommands::Generate { spec, out, force } => {
            commands::execute_generate(spec, out, force, cli.quiet)
        }
    }
}

/// Layer command-line values over settings read from the environment
fn run_config(
    env: RunnerConfig,
    base_url: String,
    timeout_ms: Option<u64>,
    concurrency: Option<usize>,
    ignore_header_case: bool,
) -> RunnerConfig {
    RunnerConfig::builder()
        .base_url(base_url)
        .timeout_ms(timeout_ms.unwrap_or(env.timeout_ms))
        .concurrency(concurrency.unwrap_or(env.concurrency))
        .ignore_header_case(ignore_header_case || env.ignore_header_case)
        .build()
}
