//! Output handling for the CLI
//!
//! - Command results: one JSON object per line on stdout
//! - Rule listings: one line per rule (JSON or policy CSV)
//! - Logs go to stderr, never here

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use super::errors::CliResult;

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_json(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_json(&response)
}

/// Write any serializable value as a single JSON line
pub fn write_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write a plain text line
pub fn write_line(line: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", line)?;
    stdout.flush()?;

    Ok(())
}
