//! CLI argument definitions using clap
//!
//! Commands:
//! - policy-adapter list [--ptype P]... [--v0 X]... [--raw JSON]
//! - policy-adapter add <ptype> <fields>...
//! - policy-adapter remove <ptype> <fields>...
//! - policy-adapter remove-filtered <ptype> <index> [values]...
//! - policy-adapter update <ptype> --old a,b --new a,c
//! - policy-adapter import <csv>
//! - policy-adapter export

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Manage authorization policy rules kept in a document store
#[derive(Parser, Debug)]
#[command(name = "policy-adapter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./policy-adapter.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print stored rules as JSON lines, optionally filtered
    List {
        /// Accepted policy types
        #[arg(long)]
        ptype: Vec<String>,
        #[arg(long)]
        v0: Vec<String>,
        #[arg(long)]
        v1: Vec<String>,
        #[arg(long)]
        v2: Vec<String>,
        #[arg(long)]
        v3: Vec<String>,
        #[arg(long)]
        v4: Vec<String>,
        #[arg(long)]
        v5: Vec<String>,
        /// Raw store query (JSON object); overrides the field filters
        #[arg(long)]
        raw: Option<String>,
    },

    /// Store one rule
    Add {
        ptype: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Delete a rule stored with exactly these fields
    Remove {
        ptype: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Delete rules whose fields starting at <index> equal the values
    RemoveFiltered {
        ptype: String,
        index: usize,
        /// Values from <index> on, matched literally
        values: Vec<String>,
    },

    /// Replace one stored rule
    Update {
        ptype: String,
        /// Current fields, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        old: Vec<String>,
        /// Replacement fields, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        new: Vec<String>,
    },

    /// Replace every stored rule with the rules of a policy CSV file
    Import { file: PathBuf },

    /// Print every stored rule as a policy CSV line
    Export,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update() {
        let cli = Cli::try_parse_from([
            "policy-adapter",
            "update",
            "p",
            "--old",
            "alice,data1,read",
            "--new",
            "alice,data1,write",
        ])
        .unwrap();

        match cli.command {
            Command::Update { ptype, old, new } => {
                assert_eq!(ptype, "p");
                assert_eq!(old, vec!["alice", "data1", "read"]);
                assert_eq!(new[2], "write");
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("./policy-adapter.json"));
    }

    #[test]
    fn test_parse_list_filters() {
        let cli = Cli::try_parse_from([
            "policy-adapter",
            "--config",
            "/etc/policies.json",
            "list",
            "--ptype",
            "p",
            "--v0",
            "alice",
            "--v0",
            "bob",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/policies.json"));
        match cli.command {
            Command::List { ptype, v0, raw, .. } => {
                assert_eq!(ptype, vec!["p"]);
                assert_eq!(v0, vec!["alice", "bob"]);
                assert!(raw.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_add_requires_fields() {
        assert!(Cli::try_parse_from(["policy-adapter", "add", "p"]).is_err());
    }
}
