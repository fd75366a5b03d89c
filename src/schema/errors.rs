//! Validation error types
//!
//! Failure codes:
//! - PARAM_MISSING_REQUIRED (field)
//! - PARAM_PRECONVERSION_FAILED (field)
//! - PARAM_TYPE_MISMATCH (field)
//! - PARAM_RULE_VIOLATION (field)
//! - PARAM_POSTCONVERSION_FAILED (field)
//! - PARAM_DEPTH_EXCEEDED (field)
//! - PARAM_NESTED_FAILURE (field)
//! - PARAM_VALIDATION_FAILED (payload)
//! - PARAM_PRECONDITION_FAILED (payload)
//!
//! Field-scoped failures are recovered inside the schema and aggregated into
//! the error bag. Only payload-scoped failures reach the caller, always as a
//! [`ValidationFailure`].

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Where a failure is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Recovered locally, recorded in the error bag
    Field,
    /// Raised to the caller
    Payload,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Field => write!(f, "FIELD"),
            Scope::Payload => write!(f, "PAYLOAD"),
        }
    }
}

/// Failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingRequired,
    PreConversion,
    TypeMismatch,
    RuleViolation,
    PostConversion,
    DepthExceeded,
    NestedFailure,
    /// At least one field failed; carries the full error bag
    Validation,
    /// The whole-input precondition vetoed the payload
    Precondition,
}

impl FailureKind {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::MissingRequired => "PARAM_MISSING_REQUIRED",
            FailureKind::PreConversion => "PARAM_PRECONVERSION_FAILED",
            FailureKind::TypeMismatch => "PARAM_TYPE_MISMATCH",
            FailureKind::RuleViolation => "PARAM_RULE_VIOLATION",
            FailureKind::PostConversion => "PARAM_POSTCONVERSION_FAILED",
            FailureKind::DepthExceeded => "PARAM_DEPTH_EXCEEDED",
            FailureKind::NestedFailure => "PARAM_NESTED_FAILURE",
            FailureKind::Validation => "PARAM_VALIDATION_FAILED",
            FailureKind::Precondition => "PARAM_PRECONDITION_FAILED",
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            FailureKind::Validation | FailureKind::Precondition => Scope::Payload,
            _ => Scope::Field,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Rule names under which engine-generated failures are recorded.
pub mod rule_names {
    pub const MISSING: &str = "missing";
    pub const PRECONVERSION: &str = "preconversion";
    pub const TYPE: &str = "type";
    pub const POSTCONVERSION: &str = "postconversion";
    pub const DEPTH: &str = "depth";
    pub const PRECONDITION: &str = "precondition";
}

/// Rule name → message, kept in the order the rules were declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleMessages(Vec<(String, String)>);

impl RuleMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` under `rule`, replacing an earlier message for the
    /// same rule in place.
    pub fn insert(&mut self, rule: impl Into<String>, message: impl Into<String>) {
        let rule = rule.into();
        let message = message.into();
        match self.0.iter_mut().find(|(name, _)| *name == rule) {
            Some(entry) => entry.1 = message,
            None => self.0.push((rule, message)),
        }
    }

    pub fn get(&self, rule: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == rule)
            .map(|(_, message)| message.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(rule, message)| (rule.as_str(), message.as_str()))
    }
}

impl Serialize for RuleMessages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (rule, message) in &self.0 {
            map.serialize_entry(rule, message)?;
        }
        map.end()
    }
}

/// Errors recorded for one field: rule name → message, or the error bag of
/// a nested schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldErrors {
    Rules(RuleMessages),
    Nested(ErrorBag),
}

impl FieldErrors {
    /// A single rule failure.
    pub fn single(rule: impl Into<String>, message: impl Into<String>) -> Self {
        let mut rules = RuleMessages::new();
        rules.insert(rule, message);
        FieldErrors::Rules(rules)
    }

    /// Message recorded under `rule`, if this is a rule map.
    pub fn rule(&self, rule: &str) -> Option<&str> {
        match self {
            FieldErrors::Rules(rules) => rules.get(rule),
            FieldErrors::Nested(_) => None,
        }
    }

    /// The nested error bag, if this field is a nested schema.
    pub fn nested(&self) -> Option<&ErrorBag> {
        match self {
            FieldErrors::Nested(bag) => Some(bag),
            FieldErrors::Rules(_) => None,
        }
    }
}

/// Field name → collected errors.
pub type ErrorBag = BTreeMap<String, FieldErrors>;

/// Internal, field-scoped failure. Short-circuits one field's pipeline and is
/// turned into an error bag entry by the schema loop.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldFailure {
    pub(crate) kind: FailureKind,
    pub(crate) errors: FieldErrors,
}

impl FieldFailure {
    pub(crate) fn missing() -> Self {
        Self {
            kind: FailureKind::MissingRequired,
            errors: FieldErrors::single(rule_names::MISSING, "Missing required parameter"),
        }
    }

    pub(crate) fn preconversion(err: &ConversionError) -> Self {
        Self {
            kind: FailureKind::PreConversion,
            errors: FieldErrors::single(
                rule_names::PRECONVERSION,
                format!("Field conversion error: {}", err),
            ),
        }
    }

    pub(crate) fn postconversion(err: &ConversionError) -> Self {
        Self {
            kind: FailureKind::PostConversion,
            errors: FieldErrors::single(
                rule_names::POSTCONVERSION,
                format!("Field conversion error: {}", err),
            ),
        }
    }

    pub(crate) fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self {
            kind: FailureKind::TypeMismatch,
            errors: FieldErrors::single(
                rule_names::TYPE,
                format!("Invalid type: expected {}, got {}", expected, actual),
            ),
        }
    }

    pub(crate) fn depth_exceeded(level: usize, max_level: usize) -> Self {
        Self {
            kind: FailureKind::DepthExceeded,
            errors: FieldErrors::single(
                rule_names::DEPTH,
                format!(
                    "Nesting depth {} exceeds the maximum of {}",
                    level, max_level
                ),
            ),
        }
    }

    pub(crate) fn nested(bag: ErrorBag) -> Self {
        Self {
            kind: FailureKind::NestedFailure,
            errors: FieldErrors::Nested(bag),
        }
    }

    /// A nested mapping whose subtree hit the depth bound. Keeps the depth
    /// kind so every enclosing level reports it, optional or not.
    pub(crate) fn nested_depth(bag: ErrorBag) -> Self {
        Self {
            kind: FailureKind::DepthExceeded,
            errors: FieldErrors::Nested(bag),
        }
    }

    pub(crate) fn nested_precondition(message: &str) -> Self {
        Self {
            kind: FailureKind::NestedFailure,
            errors: FieldErrors::single(rule_names::PRECONDITION, message),
        }
    }

    pub(crate) fn rules(violations: RuleMessages) -> Self {
        Self {
            kind: FailureKind::RuleViolation,
            errors: FieldErrors::Rules(violations),
        }
    }
}

/// Error returned by a rule predicate. Every variant is recorded as the
/// rule's message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    /// The value violates the rule
    #[error("{0}")]
    Violation(String),

    /// The rule could not read the record store
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The rule was handed a value of a shape it cannot evaluate
    #[error("Invalid type: expected {expected}, got {actual}")]
    Shape {
        expected: &'static str,
        actual: &'static str,
    },
}

impl RuleError {
    pub fn violation(message: impl Into<String>) -> Self {
        RuleError::Violation(message.into())
    }
}

/// Result of evaluating one rule.
pub type RuleResult = Result<(), RuleError>;

/// Error raised by a pre- or post-converter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ConversionError {
    message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Schema definition errors. These are programming errors caught when a
/// definition is built, never validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Schema '{schema}' declares field '{field}' twice")]
    DuplicateField { schema: String, field: String },

    #[error("Schema '{schema}' has no field '{field}' to modify")]
    UnknownField { schema: String, field: String },

    #[error("Field '{field}' of schema '{schema}': enum '{enum_name}' declares no variants")]
    EmptyEnum {
        schema: String,
        field: String,
        enum_name: &'static str,
    },

    #[error("Field '{field}' of schema '{schema}' declares rule '{rule}' twice")]
    DuplicateRule {
        schema: String,
        field: String,
        rule: String,
    },

    #[error("Schema '{schema}': max_level must be at least 1")]
    InvalidMaxLevel { schema: String },
}

/// Result type for definition building
pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Top-level validation failure, raised by `validate()` (with the full error
/// bag) or by a whole-input precondition (with an empty bag).
#[derive(Debug, Clone, Error, PartialEq)]
#[error("[{}] {}", .kind.code(), .message)]
pub struct ValidationFailure {
    kind: FailureKind,
    message: String,
    errors: ErrorBag,
    code: u16,
}

/// Serialized form of a [`ValidationFailure`].
#[derive(Debug, Serialize)]
pub struct ValidationReport<'a> {
    pub message: &'a str,
    pub errors: &'a ErrorBag,
    pub code: u16,
}

impl ValidationFailure {
    /// A failure carrying the aggregated error bag.
    pub fn with_errors(errors: ErrorBag, message: impl Into<String>, code: u16) -> Self {
        Self {
            kind: FailureKind::Validation,
            message: message.into(),
            errors,
            code,
        }
    }

    /// A whole-input veto: single message, empty bag.
    pub fn precondition(message: impl Into<String>, code: u16) -> Self {
        Self {
            kind: FailureKind::Precondition,
            message: message.into(),
            errors: ErrorBag::new(),
            code,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errors(&self) -> &ErrorBag {
        &self.errors
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn is_precondition(&self) -> bool {
        self.kind == FailureKind::Precondition
    }

    pub fn report(&self) -> ValidationReport<'_> {
        ValidationReport {
            message: &self.message,
            errors: &self.errors,
            code: self.code,
        }
    }

    /// The report as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message,
            "errors": self.errors,
            "code": self.code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_codes() {
        assert_eq!(FailureKind::MissingRequired.code(), "PARAM_MISSING_REQUIRED");
        assert_eq!(FailureKind::TypeMismatch.code(), "PARAM_TYPE_MISMATCH");
        assert_eq!(FailureKind::DepthExceeded.code(), "PARAM_DEPTH_EXCEEDED");
        assert_eq!(FailureKind::Precondition.code(), "PARAM_PRECONDITION_FAILED");
    }

    #[test]
    fn test_scopes() {
        assert_eq!(FailureKind::RuleViolation.scope(), Scope::Field);
        assert_eq!(FailureKind::NestedFailure.scope(), Scope::Field);
        assert_eq!(FailureKind::Validation.scope(), Scope::Payload);
        assert_eq!(FailureKind::Precondition.scope(), Scope::Payload);
    }

    #[test]
    fn test_rule_error_message_passthrough() {
        let err = RuleError::from(StoreError::UnknownTable("cities".into()));
        assert_eq!(err.to_string(), "Unknown table 'cities'");
        assert_eq!(RuleError::violation("too short").to_string(), "too short");
    }

    #[test]
    fn test_report_shape() {
        let mut nested = ErrorBag::new();
        nested.insert("zip".into(), FieldErrors::single("missing", "Missing required parameter"));

        let mut bag = ErrorBag::new();
        bag.insert("name".into(), FieldFailure::missing().errors);
        bag.insert("address".into(), FieldErrors::Nested(nested));

        let failure = ValidationFailure::with_errors(bag, "check errors", 422);
        assert_eq!(
            failure.to_json(),
            json!({
                "message": "check errors",
                "code": 422,
                "errors": {
                    "name": {"missing": "Missing required parameter"},
                    "address": {"zip": {"missing": "Missing required parameter"}}
                }
            })
        );
        assert_eq!(serde_json::to_value(failure.report()).unwrap(), failure.to_json());
    }

    #[test]
    fn test_precondition_has_empty_bag() {
        let failure = ValidationFailure::precondition("Payload cannot be empty", 422);
        assert!(failure.is_precondition());
        assert!(failure.errors().is_empty());
        assert!(failure.to_string().contains("PARAM_PRECONDITION_FAILED"));
    }

    #[test]
    fn test_rule_messages_keep_declaration_order() {
        let mut rules = RuleMessages::new();
        rules.insert("strong_pass", "weak");
        rules.insert("bigger", "short");
        rules.insert("strong_pass", "still weak");

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.get("strong_pass"), Some("still weak"));
        let order: Vec<&str> = rules.iter().map(|(rule, _)| rule).collect();
        assert_eq!(order, ["strong_pass", "bigger"]);
        assert_eq!(
            serde_json::to_string(&FieldErrors::Rules(rules)).unwrap(),
            r#"{"strong_pass":"still weak","bigger":"short"}"#
        );
    }

    #[test]
    fn test_field_errors_accessors() {
        let errors = FieldFailure::type_mismatch("int", "string").errors;
        assert_eq!(
            errors.rule("type"),
            Some("Invalid type: expected int, got string")
        );
        assert!(errors.nested().is_none());
    }
}
