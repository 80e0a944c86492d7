//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the porter binary.

mod commands;
mod run;
mod status;

pub use commands::{Cli, Commands};
pub use run::run_migration;
pub use status::{print_directives, show_quota};
