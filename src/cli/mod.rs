//! Command-line interface
//!
//! clap argument definitions and the dispatch from parsed subcommands to the
//! controller inspection and mirroring workflows.

pub mod args;
pub mod commands;

pub use args::{parse_args, Args, Command};
pub use commands::execute_command;
