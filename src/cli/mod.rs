//! CLI module for policy-adapter
//!
//! Provides command-line access to a rule collection:
//! - list / export: read rules
//! - add / remove / remove-filtered / update: incremental changes
//! - import: replace the collection from a policy CSV

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    export, format_policy_line, import, list, parse_policy_csv, parse_policy_line, run_command,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_json, write_line, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(&cli.config, cli.command)
}
