//! Storymap CLI binary.

use std::process::ExitCode;
use storymap::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the storymap CLI.
///
/// Uses tokio's current_thread runtime: every command is a sequence of
/// dependent tracker calls.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Environment overrides may live in a local .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so `--json` output on stdout stays parseable.
    // Example: RUST_LOG=storymap=debug,storymap_store=trace storymap sync
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storymap=info,storymap_store=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting storymap CLI");

    let cli = Cli::parse_args();
    cli.run().await
}
