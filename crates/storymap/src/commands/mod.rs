//! Command implementations shared by the CLI and integration tests.
//!
//! Each command returns a plain value; rendering lives in `cli::execute`.

pub mod init;
pub mod plan;
pub mod sync;
