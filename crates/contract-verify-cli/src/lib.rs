//! Contract Verify CLI
//!
//! Runs declarative HTTP contracts against a live service and reports the
//! outcome of each one.
//!
//! ## Architecture
//!
//! 1. **CLI** (`cli/`): Commands, exit codes and report rendering.
//!
//! 2. **Client** (`client/`): HTTP executor turning a contract request into an
//!    observed response.
//!
//! 3. **Runner** (`runner`): Concurrent execution and validation of contracts.
//!
//! 4. **Config** (`config`): Runner settings from flags or environment.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Run every contract under ./contracts against a local service
//! contract-verify run --contracts contracts --base-url http://localhost:3000
//!
//! # Only parse the contract files
//! contract-verify check --contracts contracts
//!
//! # Derive contracts from an OpenAPI document
//! contract-verify generate --spec openapi.yaml --out contracts
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod runner;

pub use cli::{ExitCode, LogFormat, OutputFormat, RunReport, VerifyCli, VerifyCommands};
pub use client::{ExecutorError, HttpExecutor};
pub use config::{RunnerConfig, RunnerConfigBuilder};
pub use error::VerifyError;
pub use runner::{RunSummary, Runner, TestOutcome, TestResult};

/// Run the CLI application and map errors to exit codes
pub async fn run_cli(cli: VerifyCli) -> ExitCode {
    match cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
