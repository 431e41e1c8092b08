//! contract-verify CLI
//!
//! # Exit Codes
//!
//! - 0: Success - every contract passed
//! - 1: At least one contract failed
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 10: Internal error

use clap::Parser;
use contract_verify_cli::{run_cli, LogFormat, VerifyCli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = VerifyCli::parse();
    init_tracing(cli.verbose, cli.quiet, cli.log_format)?;

    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}

/// RUST_LOG overrides the level picked from -v/-q
fn init_tracing(verbose: u8, quiet: bool, format: LogFormat) -> anyhow::Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
        }))
        .try_init()?;
    Ok(())
}
