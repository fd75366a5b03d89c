//! CLI command implementations

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::capabilities::{Authenticated, Capabilities};
use crate::config::EngineConfig;
use crate::forms::{self, FormEntry};
use crate::schema::{FieldDescriptor, Schema, SchemaDef, ValidationFailure};
use crate::store::{MemoryStore, RecordId};
use crate::value::params_to_json;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_failure, write_response};

/// Options of the `check` command.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub form: String,
    pub input: Option<PathBuf>,
    pub fixtures: Option<PathBuf>,
    pub as_user: Option<RecordId>,
}

/// Run a parsed command with an already loaded configuration.
pub fn run_command(command: Command, config: EngineConfig) -> CliResult<()> {
    match command {
        Command::Check {
            form,
            input,
            fixtures,
            as_user,
            ..
        } => check(
            CheckOptions {
                form,
                input,
                fixtures,
                as_user,
            },
            config,
        ),
        Command::Forms { form } => list_forms(form.as_deref()),
    }
}

/// Load configuration, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Load the record fixture, or an empty store.
pub fn load_store(path: Option<&Path>) -> CliResult<MemoryStore> {
    let Some(path) = path else {
        return Ok(MemoryStore::new());
    };
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::fixture_error(format!("{}: {}", path.display(), e)))?;
    let fixture: Value = serde_json::from_str(&content)
        .map_err(|e| CliError::fixture_error(format!("{}: {}", path.display(), e)))?;
    Ok(MemoryStore::from_json(fixture)?)
}

/// Build the capabilities a `check` runs with.
pub fn capabilities(
    store: MemoryStore,
    config: EngineConfig,
    as_user: Option<RecordId>,
) -> Capabilities {
    let caps = Capabilities::new(Arc::new(store)).with_config(config);
    match as_user {
        Some(id) => caps.with_identity(Arc::new(Authenticated(id))),
        None => caps,
    }
}

/// Validate `payload` against the named form.
///
/// The outer error is an operational failure (unknown form); the inner one
/// is the validation verdict.
pub fn evaluate(
    form: &str,
    payload: Value,
    caps: Capabilities,
) -> CliResult<Result<Value, ValidationFailure>> {
    let def = forms::definition(form)?;
    let verdict = Schema::from_json(def, payload, caps)
        .and_then(|mut schema| schema.validate())
        .map(|params| params_to_json(&params));
    Ok(verdict)
}

/// `paramguard check`
pub fn check(opts: CheckOptions, config: EngineConfig) -> CliResult<()> {
    let store = load_store(opts.fixtures.as_deref())?;
    let payload = read_request(opts.input.as_deref())?;
    let caps = capabilities(store, config, opts.as_user);

    debug!(form = %opts.form, user = ?opts.as_user, "checking payload");
    match evaluate(&opts.form, payload, caps)? {
        Ok(data) => {
            info!(form = %opts.form, "payload accepted");
            write_response(data)
        }
        Err(failure) => {
            info!(form = %opts.form, code = failure.kind().code(), "payload rejected");
            write_failure(&failure)?;
            Err(CliError::rejected(&failure))
        }
    }
}

fn describe_field(name: &str, field: &FieldDescriptor) -> Value {
    let mut out = json!({
        "name": name,
        "type": field.field_type().type_name(),
        "optional": field.is_optional(),
        "ignored": field.is_ignored(),
        "rules": field.rules().iter().map(|r| r.name()).collect::<Vec<_>>(),
    });
    if let Some(nested) = field.field_type().nested_definition() {
        out["fields"] = describe_fields(nested);
    }
    out
}

fn describe_fields(def: &SchemaDef) -> Value {
    Value::Array(
        def.fields()
            .map(|(name, field)| describe_field(name, field))
            .collect(),
    )
}

/// JSON description of a registered form.
pub fn describe_form(entry: &FormEntry) -> CliResult<Value> {
    let def = forms::definition(entry.name)?;
    Ok(json!({
        "name": entry.name,
        "description": entry.description,
        "fields": describe_fields(&def),
    }))
}

/// `paramguard forms`
pub fn list_forms(only: Option<&str>) -> CliResult<()> {
    let described = match only {
        Some(name) => {
            let entry = forms::lookup(name)
                .ok_or_else(|| CliError::from(forms::FormError::Unknown(name.to_string())))?;
            vec![describe_form(entry)?]
        }
        None => forms::FORMS
            .iter()
            .map(describe_form)
            .collect::<CliResult<Vec<_>>>()?,
    };
    write_response(Value::Array(described))
}
