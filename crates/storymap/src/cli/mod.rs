//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for storymap using clap's
//! derive API.
//!
//! # Commands
//!
//! - `init`: Initialize a new storymap repository
//! - `sync`: Detect remote changes and rebuild the project map
//! - `map`: Rebuild the project map unconditionally
//! - `plan`: Turn a feature description into local placeholder issues
//! - `upload`: Create the planned issues in the tracker
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! storymap init
//! storymap sync --check
//! storymap plan "Single sign-on" --proposal proposal.yaml
//! storymap --json upload
//! ```

mod args;
mod execute;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

pub use args::{InitArgs, MapArgs, PlanArgs, SyncArgs, UploadArgs};

pub use validators::{MAX_DESCRIPTION_LENGTH, validate_description};

use crate::output::OutputMode;

/// Storymap - a local story map kept in sync with GitLab
///
/// Mirrors GitLab issues into a Backbone → Epic → Story file tree with a
/// project map of containment and blocking links, and uploads locally
/// planned issues back to the tracker.
#[derive(Parser, Debug)]
#[command(name = "storymap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new storymap repository
    ///
    /// Creates `.storymap/config.yaml` with commented defaults and a
    /// `.gitignore` for the cache and `.env`.
    Init(InitArgs),

    /// Sync local state with the tracker
    ///
    /// Reports issues changed since the last sync and rebuilds the project
    /// map when anything changed.
    Sync(SyncArgs),

    /// Rebuild the project map from the tracker
    Map(MapArgs),

    /// Plan new issues for a feature description
    ///
    /// Reads a proposal document, shows it for approval, and writes the
    /// approved issues as local placeholder files and map nodes.
    Plan(PlanArgs),

    /// Upload planned issues to the tracker
    ///
    /// Creates labels, issues, dependency notes and links. Any failure rolls
    /// back what was created.
    Upload(UploadArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the command and render any error; returns the process exit
    /// code.
    pub async fn run(&self) -> ExitCode {
        match self.execute().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::debug!(error = ?e, "Command failed");
                execute::report_error(&e, self.output_mode());
                ExitCode::FAILURE
            }
        }
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;

        let output_mode = self.output_mode();

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(args, output_mode).await,
            Some(Commands::Sync(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_sync(&app, args, output_mode).await
            }
            Some(Commands::Map(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_map(&app, args, output_mode).await
            }
            Some(Commands::Plan(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_plan(&app, args, output_mode).await
            }
            Some(Commands::Upload(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_upload(&app, args, output_mode).await
            }
            None => {
                println!("Storymap story map sync");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }

    fn output_mode(&self) -> OutputMode {
        OutputMode::from_json_flag(self.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_command() {
        let cli = Cli::try_parse_from(["storymap"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_global_json_flag_after_command() {
        let cli = Cli::try_parse_from(["storymap", "upload", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Upload(_))));
    }

    #[test]
    fn test_parse_init_quiet() {
        let cli = Cli::try_parse_from(["storymap", "init", "-q"]).unwrap();
        match cli.command {
            Some(Commands::Init(args)) => assert!(args.quiet),
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from(["storymap", "sync", "--check"]).unwrap();
        match cli.command {
            Some(Commands::Sync(args)) => {
                assert!(args.check);
                assert!(!args.force);
            }
            _ => panic!("Expected Sync command"),
        }
    }

    #[test]
    fn test_parse_sync_check_conflicts_with_force() {
        let result = Cli::try_parse_from(["storymap", "sync", "--check", "--force"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_map() {
        let cli = Cli::try_parse_from(["storymap", "map"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Map(_))));
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from([
            "storymap",
            "plan",
            "  Single sign-on ",
            "--proposal",
            "plan.yaml",
            "--yes",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Plan(args)) => {
                assert_eq!(args.description, "Single sign-on");
                assert_eq!(args.proposal, std::path::PathBuf::from("plan.yaml"));
                assert!(args.yes);
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_parse_plan_requires_proposal() {
        let result = Cli::try_parse_from(["storymap", "plan", "Single sign-on"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_plan_rejects_blank_description() {
        let result = Cli::try_parse_from(["storymap", "plan", "  ", "-p", "plan.yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_unknown_command_fails() {
        assert!(Cli::try_parse_from(["storymap", "frobnicate"]).is_err());
    }
}
