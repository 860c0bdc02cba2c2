//! Output formatting for CLI commands.
//!
//! Every command prints either human-readable text or, with `--json`, one
//! JSON document on stdout. Logs go to stderr so the JSON stays parseable.

pub mod color;

use crate::domain::LabelScheme;
use crate::plan::ProposedIssueSet;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, info, success, warning};

use color::{bold, dimmed, kind_tag};

/// Output mode for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text output
    Text,
    /// JSON output for programmatic use
    Json,
}

impl OutputMode {
    /// Mode selected by the global `--json` flag.
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// Settings controlling text rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with explicit values.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `STORYMAP_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        // Respect NO_COLOR standard (https://no-color.org/)
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("STORYMAP_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self::new(use_colors)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

/// Successful command result, rendered as `{"status": "success", ...}`.
#[derive(Debug, Serialize)]
struct Success<'a, T: Serialize> {
    status: &'static str,
    #[serde(flatten)]
    result: &'a T,
}

/// Failed command result, rendered as `{"status": "error", "message": ...}`.
#[derive(Debug, Serialize)]
struct Failure<'a> {
    status: &'static str,
    message: &'a str,
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

fn write_json<W: Write, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

/// Print a successful result; `result` must serialize to a JSON object.
pub fn print_success_json<T: Serialize>(result: &T) -> io::Result<()> {
    print_json(&Success {
        status: "success",
        result,
    })
}

/// Print an error result.
pub fn print_error_json(message: &str) -> io::Result<()> {
    print_json(&Failure {
        status: "error",
        message,
    })
}

/// Render a plan for review, one line per proposed issue plus its
/// dependencies.
pub fn write_plan<W: Write>(
    w: &mut W,
    plan: &ProposedIssueSet,
    scheme: &LabelScheme,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{}",
        bold(
            &format!("Proposed issues ({}):", plan.proposed_issues.len()),
            config
        )
    )?;
    for issue in &plan.proposed_issues {
        writeln!(
            w,
            "  {} {} {}",
            info(&issue.id, config),
            kind_tag(scheme.kind(&issue.labels), config),
            issue.title
        )?;
        if !issue.labels.is_empty() {
            writeln!(w, "      {}", dimmed(&issue.labels.join(", "), config))?;
        }
        if let Some(deps) = &issue.dependencies {
            for target in &deps.blocks {
                writeln!(w, "      {} {target}", dimmed("blocks", config))?;
            }
            for source in &deps.is_blocked_by {
                writeln!(w, "      {} {source}", dimmed("blocked by", config))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Dependencies, ProposedIssue};

    #[test]
    fn success_wrapper_flattens_result() {
        #[derive(Serialize)]
        struct Report {
            issues_created: usize,
        }
        let mut buf = Vec::new();

        write_json(
            &mut buf,
            &Success {
                status: "success",
                result: &Report { issues_created: 2 },
            },
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"status": "success", "issues_created": 2})
        );
    }

    #[test]
    fn failure_carries_message() {
        let mut buf = Vec::new();

        write_json(
            &mut buf,
            &Failure {
                status: "error",
                message: "boom",
            },
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "boom");
    }

    #[test]
    fn plan_lists_issues_and_dependencies() {
        let plan = ProposedIssueSet {
            proposed_issues: vec![ProposedIssue {
                id: "NEW_1".to_string(),
                title: "Login".to_string(),
                description: String::new(),
                labels: vec!["Type::Epic".to_string()],
                dependencies: Some(Dependencies {
                    blocks: vec!["NEW_2".into()],
                    is_blocked_by: vec![7_u64.into()],
                }),
            }],
        };
        let mut buf = Vec::new();

        write_plan(
            &mut buf,
            &plan,
            &LabelScheme::default(),
            &OutputConfig::new(false),
        )
        .unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Proposed issues (1):\n"));
        assert!(text.contains("  NEW_1 [epic] Login\n"));
        assert!(text.contains("blocks NEW_2"));
        assert!(text.contains("blocked by 7"));
    }
}
