//! Schema subsystem for paramguard
//!
//! Definitions are built once and shared; instances validate one input
//! mapping each.
//!
//! # Design Principles
//!
//! - Every declared field runs in declaration order
//! - All failures for all fields are reported in one pass
//! - No coercion beyond the declared converters
//! - Nested schemas are bounded by `max_level`
//! - Capabilities are injected, never global

mod definition;
mod errors;
mod pipeline;
mod types;
mod validator;

pub use definition::{Precondition, SchemaBuilder, SchemaDef};
pub use errors::{
    rule_names, ConversionError, DefinitionError, DefinitionResult, ErrorBag, FailureKind,
    FieldErrors, RuleError, RuleMessages, RuleResult, Scope, ValidationFailure, ValidationReport,
};
pub use types::{
    EnumSpec, Expect, FieldDescriptor, FieldType, PostConverter, PreConverter, Rule, RuleContext,
    RuleFn,
};
pub use validator::{Schema, SchemaState};
