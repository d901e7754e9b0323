//! CLI command implementations
//!
//! Each command loads the configuration, opens a blocking adapter and runs a
//! single adapter operation. Results are written as JSON to stdout.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use crate::adapter::{AdapterOptions, PolicyAdapter, RuleAdapter};
use crate::filter::Filter;
use crate::model::MemoryModel;
use crate::rule::PolicyRule;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_json, write_line, write_response};

/// Dispatch a parsed command
pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<()> {
    let options = AdapterOptions::load(config_path)?;
    let adapter = RuleAdapter::new(&options)?;

    match cmd {
        Command::List {
            ptype,
            v0,
            v1,
            v2,
            v3,
            v4,
            v5,
            raw,
        } => {
            let filter = Filter {
                ptype,
                v0,
                v1,
                v2,
                v3,
                v4,
                v5,
                raw_query: raw.as_deref().map(parse_raw_query).transpose()?,
            };
            list(&adapter, &filter)
        }
        Command::Add { ptype, fields } => {
            adapter.add_policy(&ptype, &fields)?;
            write_response(json!({"added": true}))
        }
        Command::Remove { ptype, fields } => {
            let removed = adapter.remove_policy(&ptype, &fields)?;
            write_response(json!({"removed": removed}))
        }
        Command::RemoveFiltered {
            ptype,
            index,
            values,
        } => {
            let removed = adapter.remove_filtered_policy(&ptype, index, &values)?;
            write_response(json!({"removed": removed}))
        }
        Command::Update { ptype, old, new } => {
            let updated = adapter.update_policy(&ptype, &old, &new)?;
            write_response(json!({"updated": updated}))
        }
        Command::Import { file } => import(&adapter, &file),
        Command::Export => export(&adapter),
    }
}

/// Print the rules accepted by `filter`, one JSON object per line
pub fn list(adapter: &dyn PolicyAdapter, filter: &Filter) -> CliResult<()> {
    let mut model = MemoryModel::new();
    adapter.load_filtered_policy(&mut model, filter)?;

    for rule in model.all_rules() {
        write_json(&rule)?;
    }
    Ok(())
}

/// Replace the stored rules with those of a policy CSV file
pub fn import(adapter: &dyn PolicyAdapter, path: &Path) -> CliResult<()> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::io_error(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let mut model = MemoryModel::new();
    for rule in parse_policy_csv(&content)? {
        model.add_rule(&rule.ptype, rule.fields);
    }

    adapter.save_policy(&model)?;
    write_response(json!({"imported": model.len()}))
}

/// Print every stored rule as a policy CSV line
pub fn export(adapter: &dyn PolicyAdapter) -> CliResult<()> {
    let mut model = MemoryModel::new();
    adapter.load_policy(&mut model)?;

    for rule in model.all_rules() {
        write_line(&format_policy_line(&rule))?;
    }
    Ok(())
}

fn parse_raw_query(raw: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CliError::invalid_input(format!("Invalid raw query: {}", e)))?;
    if !value.is_object() {
        return Err(CliError::invalid_input("Raw query must be a JSON object"));
    }
    Ok(value)
}

/// Parse policy CSV text: `ptype, field, field, ...` per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_policy_csv(content: &str) -> CliResult<Vec<PolicyRule>> {
    let mut rules = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let parsed = parse_policy_line(line).map_err(|e| {
            CliError::invalid_input(format!("line {}: {}", number + 1, e.message()))
        })?;
        if let Some(rule) = parsed {
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// Parse one policy CSV line; `None` for blank and comment lines
pub fn parse_policy_line(line: &str) -> CliResult<Option<PolicyRule>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = line.split(',').map(str::trim);
    let ptype = match tokens.next() {
        Some(ptype) if !ptype.is_empty() => ptype.to_string(),
        _ => return Err(CliError::invalid_input("missing policy type")),
    };

    Ok(Some(PolicyRule::new(
        ptype,
        tokens.map(str::to_string).collect(),
    )))
}

/// Format a rule as a policy CSV line
pub fn format_policy_line(rule: &PolicyRule) -> String {
    rule.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryClient;

    fn adapter() -> RuleAdapter {
        let client = MemoryClient::new();
        RuleAdapter::with_client(&client, &AdapterOptions::for_client("casbin")).unwrap()
    }

    #[test]
    fn test_parse_policy_line() {
        let rule = parse_policy_line("p, alice, data1, read").unwrap().unwrap();
        assert_eq!(rule, PolicyRule::from_strs("p", &["alice", "data1", "read"]));

        assert!(parse_policy_line("   ").unwrap().is_none());
        assert!(parse_policy_line("# comment").unwrap().is_none());
        assert!(parse_policy_line(", alice").is_err());
    }

    #[test]
    fn test_parse_policy_csv_reports_line() {
        let err = parse_policy_csv("p, alice, data1, read\n, bob\n").unwrap_err();
        assert!(err.message().starts_with("line 2"));
    }

    #[test]
    fn test_format_matches_parse() {
        let rule = PolicyRule::from_strs("g", &["alice", "data2_admin"]);
        let line = format_policy_line(&rule);
        assert_eq!(line, "g, alice, data2_admin");
        assert_eq!(parse_policy_line(&line).unwrap().unwrap(), rule);
    }

    #[test]
    fn test_raw_query_must_be_object() {
        assert!(parse_raw_query(r#"{"ptype": "p"}"#).is_ok());
        assert!(parse_raw_query("[1, 2]").is_err());
        assert!(parse_raw_query("{").is_err());
    }

    #[test]
    fn test_import_replaces_collection() {
        let adapter = adapter();
        adapter.add_policy("p", &["stale".to_string()]).unwrap();

        let temp_dir = tempfile::TempDir::new().unwrap();
        let csv = temp_dir.path().join("policy.csv");
        fs::write(
            &csv,
            "# rules\np, alice, data1, read\np, bob, data2, write\ng, alice, data2_admin\n",
        )
        .unwrap();

        import(&adapter, &csv).unwrap();

        let mut model = MemoryModel::new();
        adapter.load_policy(&mut model).unwrap();
        assert_eq!(model.len(), 3);
        assert!(!model.has_rule("p", &["stale"]));
        assert!(model.has_rule("g", &["alice", "data2_admin"]));
    }
}
