//! JSON I/O handling for CLI
//!
//! - Input: one JSON object, from a file or stdin
//! - Output: one JSON object on stdout
//! - Logs go to stderr

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::schema::ValidationFailure;

/// Read the JSON payload from `path`, or from stdin when `None`.
pub fn read_request(path: Option<&Path>) -> CliResult<Value> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| CliError::io_error(format!("{}: {}", path.display(), e)))?,
        None => {
            let mut buf = String::new();
            io::stdin().lock().read_to_string(&mut buf)?;
            buf
        }
    };

    if text.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(serde_json::from_str(&text)?)
}

/// Success envelope.
pub fn success_envelope(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// Failure envelope: the validation report plus a status marker.
pub fn failure_envelope(failure: &ValidationFailure) -> Value {
    json!({
        "status": "error",
        "kind": failure.kind().code(),
        "message": failure.message(),
        "errors": failure.errors(),
        "code": failure.code()
    })
}

fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&success_envelope(data))
}

/// Write a validation failure to stdout
pub fn write_failure(failure: &ValidationFailure) -> CliResult<()> {
    write_json(&failure_envelope(failure))
}

/// Write an error response to stdout
pub fn write_error(err: &CliError) -> CliResult<()> {
    write_json(&json!({
        "status": "error",
        "code": err.code_str(),
        "message": err.message()
    }))
}
