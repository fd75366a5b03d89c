//! Per-field pipeline
//!
//! Each declared field runs through a small state machine:
//!
//! ```text
//! Presence -> PreConvert -> (Nested | TypeCheck) -> Evaluate -> PostConvert -> Commit
//! ```
//!
//! Any stage may finish the field early with [`FieldOutcome::Skipped`] or
//! [`FieldOutcome::Failed`]. Failures never leave this module as errors; the
//! schema loop collects every outcome.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::definition::SchemaDef;
use super::errors::{FieldFailure, RuleError, RuleMessages};
use super::types::{FieldDescriptor, RuleContext};
use super::validator::Schema;
use crate::capabilities::Capabilities;
use crate::value::{Params, Value};

/// Result of running one field through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldOutcome {
    /// Absent (or post-converted to absent): no sanitized entry, no error
    Skipped,
    /// Value to commit into the sanitized mapping
    Passed(Value),
    Failed(FieldFailure),
}

enum Stage {
    Presence,
    PreConvert(Value),
    Nested(Arc<SchemaDef>, Value),
    TypeCheck(Value),
    Evaluate(Value),
    PostConvert(Value),
    Commit(Value),
}

/// Everything a field run may read or write on the owning schema instance.
pub(crate) struct FieldEnv<'a> {
    pub schema: &'a str,
    pub inputs: &'a mut Params,
    pub caps: &'a Capabilities,
    pub level: usize,
    pub max_level: usize,
    pub children: &'a mut BTreeMap<String, Schema>,
}

/// Drives one field through every stage.
pub(crate) fn run_field(name: &str, field: &FieldDescriptor, env: &mut FieldEnv<'_>) -> FieldOutcome {
    let mut stage = Stage::Presence;

    loop {
        stage = match stage {
            // null counts as absent
            Stage::Presence => match env.inputs.get(name) {
                Some(raw) if !matches!(raw, Value::Null) => Stage::PreConvert(raw.clone()),
                _ if field.is_optional() => return FieldOutcome::Skipped,
                _ => return FieldOutcome::Failed(FieldFailure::missing()),
            },

            Stage::PreConvert(raw) => {
                let value = match field.preconverter() {
                    Some(convert) => match convert(raw) {
                        Ok(converted) => {
                            env.inputs.insert(name.to_string(), converted.clone());
                            converted
                        }
                        Err(err) => return FieldOutcome::Failed(FieldFailure::preconversion(&err)),
                    },
                    None => raw,
                };
                match field.field_type().nested_definition() {
                    Some(def) => Stage::Nested(Arc::clone(def), value),
                    None => Stage::TypeCheck(value),
                }
            }

            Stage::Nested(def, value) => match check_nested(name, def, value, env) {
                Ok(sanitized) => Stage::Evaluate(sanitized),
                Err(failure) => return FieldOutcome::Failed(failure),
            },

            Stage::TypeCheck(value) => {
                let expected = field.field_type();
                if !expected.matches(&value) {
                    return FieldOutcome::Failed(FieldFailure::type_mismatch(
                        expected.type_name(),
                        value.type_name(),
                    ));
                }
                Stage::Evaluate(value)
            }

            Stage::Evaluate(value) => {
                let violations = evaluate_rules(name, field, &value, env);
                if !violations.is_empty() {
                    return FieldOutcome::Failed(FieldFailure::rules(violations));
                }
                Stage::PostConvert(value)
            }

            Stage::PostConvert(value) => match field.postconverter() {
                None => Stage::Commit(value),
                Some(convert) => match convert(value) {
                    Ok(Some(converted)) => Stage::Commit(converted),
                    Ok(None) => return FieldOutcome::Skipped,
                    Err(err) => return FieldOutcome::Failed(FieldFailure::postconversion(&err)),
                },
            },

            Stage::Commit(value) => return FieldOutcome::Passed(value),
        };
    }
}

/// Validates a nested mapping with a child instance one level down.
///
/// Returns the child's sanitized mapping when it only has optional-field
/// errors (or none). A depth overrun anywhere below always fails the field.
fn check_nested(
    name: &str,
    def: Arc<SchemaDef>,
    value: Value,
    env: &mut FieldEnv<'_>,
) -> Result<Value, FieldFailure> {
    let mapping = match value {
        Value::Map(mapping) => mapping,
        other => return Err(FieldFailure::type_mismatch("map", other.type_name())),
    };

    let child_level = env.level + 1;
    if child_level > env.max_level {
        debug!(
            schema = env.schema,
            field = name,
            level = child_level,
            max_level = env.max_level,
            "nesting depth exceeded"
        );
        return Err(FieldFailure::depth_exceeded(child_level, env.max_level));
    }

    let mut child = Schema::nested(def, mapping, env.caps.clone(), child_level, env.max_level);
    let result = match child.check() {
        Err(veto) => Err(FieldFailure::nested_precondition(veto.message())),
        Ok(()) if child.depth_exceeded() => {
            Err(FieldFailure::nested_depth(child.error_bag().clone()))
        }
        Ok(()) if child.only_optional_errors_exist() => Ok(Value::Map(child.sanitized().clone())),
        Ok(()) => Err(FieldFailure::nested(child.error_bag().clone())),
    };
    env.children.insert(name.to_string(), child);
    result
}

/// Runs every rule in order and collects each failure by rule name.
fn evaluate_rules(
    name: &str,
    field: &FieldDescriptor,
    value: &Value,
    env: &FieldEnv<'_>,
) -> RuleMessages {
    let ctx = RuleContext::new(env.schema, name, &*env.inputs, env.caps);
    let mut violations = RuleMessages::new();

    for rule in field.rules() {
        if let Err(err) = rule.evaluate(value, &ctx) {
            if let RuleError::Store(store_err) = &err {
                warn!(
                    schema = env.schema,
                    field = name,
                    rule = rule.name(),
                    error = %store_err,
                    "record store read failed"
                );
            }
            violations.insert(rule.name(), err.to_string());
        }
    }

    violations
}
