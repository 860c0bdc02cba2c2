//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use clap::Parser;
use std::path::PathBuf;

use super::validators::validate_description;

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `sync` command
#[derive(Parser, Debug, Clone)]
pub struct SyncArgs {
    /// Only report what changed since the last sync
    ///
    /// Neither the timestamp cache nor the project map is written.
    #[arg(long)]
    pub check: bool,

    /// Rebuild the project map even when nothing changed, discarding proposed
    /// issues that were not uploaded
    #[arg(short, long, conflicts_with = "check")]
    pub force: bool,
}

/// Arguments for the `map` command
#[derive(Parser, Debug, Clone)]
pub struct MapArgs {}

/// Arguments for the `plan` command
#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    /// Feature description to plan issues for
    #[arg(value_parser = validate_description)]
    pub description: String,

    /// Proposal document (YAML, or JSON with a `.json` extension)
    #[arg(short, long, value_name = "FILE")]
    pub proposal: PathBuf,

    /// Apply the plan without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the `upload` command
#[derive(Parser, Debug, Clone)]
pub struct UploadArgs {}
