//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

const STORYMAP_ENV_VARS: [&str; 5] = [
    "STORYMAP_GITLAB_URL",
    "STORYMAP_GITLAB_TOKEN",
    "STORYMAP_PROJECT_ID",
    "STORYMAP_BOARD_ID",
    "STORYMAP_DATA_DIR",
];

/// Run the storymap binary in `dir` with a clean storymap environment.
pub fn run_storymap_in_dir(dir: &Path, args: &[&str]) -> Output {
    storymap_command(dir)
        .args(args)
        .output()
        .expect("Failed to execute storymap binary")
}

/// Command for the storymap binary in `dir`, without inherited overrides.
pub fn storymap_command(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_storymap"));
    command
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    for var in STORYMAP_ENV_VARS {
        command.env_remove(var);
    }
    command
}

/// Stdout of a finished command as text.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of a finished command as text.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
