//! Command execution logic.
//!
//! Runs the command implementations and renders their results.

use anyhow::Result;
use std::io::{self, Write};

use super::args::{InitArgs, MapArgs, PlanArgs, SyncArgs, UploadArgs};
use crate::app::App;
use crate::commands::plan::PlanOutcome;
use crate::commands::sync::SyncOptions;
use crate::output::{self, OutputConfig, OutputMode};
use crate::plan::FilePlanner;

/// Execute the init command
pub async fn execute_init(args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir).await?;

    match output_mode {
        OutputMode::Json => output::print_success_json(&result)?,
        OutputMode::Text if !args.quiet => {
            let config = OutputConfig::from_env();
            println!(
                "{} {}",
                output::success("Initialized storymap in", &config),
                result.storymap_dir.display()
            );
            println!("  Config: {}", result.config_file.display());
            if let Some(gitignore) = &result.gitignore_file {
                println!("  Ignore: {}", gitignore.display());
            }
            println!();
            println!("Set gitlab.project-id in the config and STORYMAP_GITLAB_TOKEN in .env,");
            println!("then run 'storymap sync'.");
        }
        OutputMode::Text => {}
    }
    Ok(())
}

/// Execute the sync command
pub async fn execute_sync(app: &App, args: &SyncArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::sync;

    let tracker = app.connect()?;
    let options = SyncOptions {
        check: args.check,
        force: args.force,
    };
    let outcome = sync::sync(app, tracker.as_ref(), options).await?;

    match output_mode {
        OutputMode::Json => output::print_success_json(&outcome)?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            let report = &outcome.report;
            if report.is_unchanged() {
                println!("No changes ({} issues)", report.total_issues);
            } else {
                println!(
                    "{} of {} issues changed:",
                    report.updated_count, report.total_issues
                );
                for issue in &report.updated_issues {
                    println!(
                        "  {} {}",
                        output::info(&format!("#{}", issue.iid), &config),
                        issue.title
                    );
                }
            }
            if let Some(map) = outcome.map {
                println!(
                    "{} ({} nodes, {} links)",
                    output::success("Project map rebuilt", &config),
                    map.nodes,
                    map.links
                );
            }
        }
    }
    Ok(())
}

/// Execute the map command
pub async fn execute_map(app: &App, _args: &MapArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::sync;

    let tracker = app.connect()?;
    let summary = sync::map(app, tracker.as_ref()).await?;

    match output_mode {
        OutputMode::Json => output::print_success_json(&summary)?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            println!(
                "{} {} ({} nodes, {} links)",
                output::success("Wrote", &config),
                app.workspace().map_path().display(),
                summary.nodes,
                summary.links
            );
        }
    }
    Ok(())
}

/// Execute the plan command
pub async fn execute_plan(app: &App, args: &PlanArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::plan;

    let config = OutputConfig::from_env();
    let planner = FilePlanner::new(&args.proposal);
    let scheme = &app.config().labels;

    let outcome = plan::plan(app, &planner, &args.description, |proposed| {
        if args.yes {
            return true;
        }
        let mut stderr = io::stderr();
        if output::write_plan(&mut stderr, proposed, scheme, &config).is_err() {
            return false;
        }
        confirm("Apply this plan? [y/N]: ")
    })
    .await?;

    match output_mode {
        OutputMode::Json => output::print_success_json(&outcome)?,
        OutputMode::Text => match &outcome {
            PlanOutcome::Unavailable { reason } => {
                println!("{} {reason}", output::warning("No plan available:", &config));
            }
            PlanOutcome::NothingNew => println!("Nothing new to create."),
            PlanOutcome::Declined { .. } => {
                println!("{}", output::warning("Plan discarded.", &config));
            }
            PlanOutcome::Materialized { plan: applied, report } => {
                if args.yes {
                    output::write_plan(&mut io::stdout(), applied, scheme, &config)?;
                }
                println!(
                    "{} {} issue(s), {} link(s)",
                    output::success("Added", &config),
                    report.nodes_added,
                    report.links_added
                );
                for title in &report.skipped {
                    println!("  {} {title}", output::warning("skipped existing", &config));
                }
                println!("Review the files, then run 'storymap upload'.");
            }
        },
    }
    Ok(())
}

/// Execute the upload command
pub async fn execute_upload(app: &App, _args: &UploadArgs, output_mode: OutputMode) -> Result<()> {
    let tracker = app.connect()?;
    let report = app.upload_transaction(tracker.as_ref()).run().await?;

    match output_mode {
        OutputMode::Json => output::print_success_json(&report)?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            if report.id_map.is_empty() {
                println!("Nothing to upload.");
                return Ok(());
            }
            println!(
                "{} {} issue(s), {} label(s), {} link(s), {} note(s)",
                output::success("Created", &config),
                report.issues_created,
                report.labels_created,
                report.links_created,
                report.notes_created
            );
            for (placeholder, iid) in &report.id_map {
                println!(
                    "  {placeholder} -> {}",
                    output::info(&format!("#{iid}"), &config)
                );
            }
            if report.issues_reordered > 0 {
                println!("Reordered {} issue(s) on the board", report.issues_reordered);
            }
        }
    }
    Ok(())
}

/// Render an error for the selected output mode.
pub fn report_error(error: &anyhow::Error, output_mode: OutputMode) {
    let message = format!("{error:#}");
    match output_mode {
        OutputMode::Json => {
            if output::print_error_json(&message).is_err() {
                eprintln!("Error: {message}");
            }
        }
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            eprintln!("{} {message}", output::error("Error:", &config));
        }
    }
}

fn confirm(prompt: &str) -> bool {
    eprint!("{prompt}");
    if io::stderr().flush().is_err() {
        return false;
    }
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    let response = input.trim().to_lowercase();
    response == "y" || response == "yes"
}
