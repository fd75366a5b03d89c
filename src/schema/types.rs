//! Field types and field descriptors
//!
//! Supported field types:
//! - string, int, float, bool, map, timestamp
//! - enum: member of a declared enumeration
//! - nested: a mapping validated by another schema definition
//!
//! A descriptor bundles the type with optionality, the ignore flag, an
//! ordered list of named rules and optional pre-/post-converters.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

use super::definition::SchemaDef;
use super::errors::{ConversionError, RuleError, RuleResult};
use crate::capabilities::Capabilities;
use crate::converters;
use crate::store::{RecordId, RecordStore};
use crate::value::{EnumValue, Params, Value};

/// A declared enumeration: a name and its variant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumSpec {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

impl EnumSpec {
    pub const fn new(name: &'static str, variants: &'static [&'static str]) -> Self {
        Self { name, variants }
    }

    /// Looks up a member by variant name.
    pub fn member(&self, variant: &str) -> Option<EnumValue> {
        self.variants
            .iter()
            .find(|v| **v == variant)
            .map(|v| EnumValue::new(self.name, *v))
    }

    /// Returns whether `value` is a member of this enumeration.
    pub fn contains(&self, value: &EnumValue) -> bool {
        value.enum_name == self.name && self.variants.contains(&value.variant.as_str())
    }
}

/// Closed set of field types
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Map,
    Timestamp,
    Enum(EnumSpec),
    Nested(Arc<SchemaDef>),
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Map => "map",
            FieldType::Timestamp => "timestamp",
            FieldType::Enum(spec) => spec.name,
            FieldType::Nested(_) => "map",
        }
    }

    /// Exact type match, no coercion.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Int, Value::Int(_)) => true,
            (FieldType::Float, Value::Float(_)) => true,
            (FieldType::Bool, Value::Bool(_)) => true,
            (FieldType::Map, Value::Map(_)) => true,
            (FieldType::Nested(_), Value::Map(_)) => true,
            (FieldType::Timestamp, Value::Timestamp(_)) => true,
            (FieldType::Enum(spec), Value::Enum(member)) => spec.contains(member),
            _ => false,
        }
    }

    pub fn nested_definition(&self) -> Option<&Arc<SchemaDef>> {
        match self {
            FieldType::Nested(def) => Some(def),
            _ => None,
        }
    }
}

/// Everything a rule can see besides the candidate value: the schema's
/// current inputs (already converted for earlier fields) and the injected
/// capabilities.
pub struct RuleContext<'a> {
    schema: &'a str,
    field: &'a str,
    inputs: &'a Params,
    caps: &'a Capabilities,
}

impl<'a> RuleContext<'a> {
    pub fn new(schema: &'a str, field: &'a str, inputs: &'a Params, caps: &'a Capabilities) -> Self {
        Self {
            schema,
            field,
            inputs,
            caps,
        }
    }

    pub fn schema_name(&self) -> &str {
        self.schema
    }

    /// Name of the field being evaluated.
    pub fn field(&self) -> &str {
        self.field
    }

    /// Current value of another field of the same schema.
    pub fn sibling(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// A sibling's value if it has been converted to a timestamp.
    pub fn sibling_timestamp(&self, name: &str) -> Option<NaiveDateTime> {
        self.sibling(name).and_then(Value::as_timestamp)
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.caps.store()
    }

    pub fn current_identity(&self) -> Option<RecordId> {
        self.caps.current_identity()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.caps.now()
    }
}

/// Predicate signature: `Ok(())` passes, an error is recorded as the rule's
/// message.
pub type RuleFn = dyn Fn(&Value, &RuleContext<'_>) -> RuleResult + Send + Sync;

/// Runs before the type check. Returns the (possibly unchanged) value.
pub type PreConverter = Arc<dyn Fn(Value) -> Result<Value, ConversionError> + Send + Sync>;

/// Runs after rules pass. `None` means "treat as absent".
pub type PostConverter =
    Arc<dyn Fn(Value) -> Result<Option<Value>, ConversionError> + Send + Sync>;

/// A named rule
#[derive(Clone)]
pub struct Rule {
    name: String,
    check: Arc<RuleFn>,
}

impl Rule {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, &RuleContext<'_>) -> RuleResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluate(&self, value: &Value, ctx: &RuleContext<'_>) -> RuleResult {
        (self.check)(value, ctx)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rule").field(&self.name).finish()
    }
}

/// Wraps an infallible conversion as a pre-converter.
fn default_converter<F>(convert: F) -> PreConverter
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    Arc::new(move |v| Ok(convert(v)))
}

/// Declarative metadata for one input key
#[derive(Clone)]
pub struct FieldDescriptor {
    field_type: FieldType,
    optional: bool,
    ignore: bool,
    rules: Vec<Rule>,
    preconverter: Option<PreConverter>,
    postconverter: Option<PostConverter>,
}

impl FieldDescriptor {
    /// Creates a required field of the given type.
    ///
    /// `Int` and `Float` fields get a numeric-string pre-converter, `Enum`
    /// fields a variant-name pre-converter, unless one is set explicitly.
    pub fn new(field_type: FieldType) -> Self {
        let preconverter = match &field_type {
            FieldType::Int => Some(default_converter(converters::parse_int)),
            FieldType::Float => Some(default_converter(converters::parse_float)),
            FieldType::Enum(spec) => {
                let spec = *spec;
                Some(default_converter(move |v| converters::enum_by_name(spec, v)))
            }
            _ => None,
        };

        Self {
            field_type,
            optional: false,
            ignore: false,
            rules: Vec::new(),
            preconverter,
            postconverter: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn int() -> Self {
        Self::new(FieldType::Int)
    }

    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Bool)
    }

    pub fn map() -> Self {
        Self::new(FieldType::Map)
    }

    pub fn timestamp() -> Self {
        Self::new(FieldType::Timestamp)
    }

    pub fn enumeration(spec: EnumSpec) -> Self {
        Self::new(FieldType::Enum(spec))
    }

    pub fn nested(def: Arc<SchemaDef>) -> Self {
        Self::new(FieldType::Nested(def))
    }

    /// Marks the field optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Excludes the field from all processing.
    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Appends a named rule.
    pub fn rule<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, &RuleContext<'_>) -> RuleResult + Send + Sync + 'static,
    {
        self.rules.push(Rule::new(name, check));
        self
    }

    /// Sets the pre-converter, replacing any default.
    pub fn preconvert<F>(mut self, convert: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        self.preconverter = Some(Arc::new(convert));
        self
    }

    pub fn postconvert<F>(mut self, convert: F) -> Self
    where
        F: Fn(Value) -> Result<Option<Value>, ConversionError> + Send + Sync + 'static,
    {
        self.postconverter = Some(Arc::new(convert));
        self
    }

    // Mutators used when a derived schema specializes inherited descriptors.

    pub fn set_optional(&mut self, optional: bool) -> &mut Self {
        self.optional = optional;
        self
    }

    pub fn set_ignore(&mut self, ignore: bool) -> &mut Self {
        self.ignore = ignore;
        self
    }

    /// Replaces the rule called `name` in place, or appends it.
    pub fn set_rule<F>(&mut self, name: &str, check: F) -> &mut Self
    where
        F: Fn(&Value, &RuleContext<'_>) -> RuleResult + Send + Sync + 'static,
    {
        let rule = Rule::new(name, check);
        match self.rules.iter_mut().find(|r| r.name == name) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }

    pub fn remove_rule(&mut self, name: &str) -> &mut Self {
        self.rules.retain(|r| r.name != name);
        self
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn preconverter(&self) -> Option<&PreConverter> {
        self.preconverter.as_ref()
    }

    pub fn postconverter(&self) -> Option<&PostConverter> {
        self.postconverter.as_ref()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("field_type", &self.field_type.type_name())
            .field("optional", &self.optional)
            .field("ignore", &self.ignore)
            .field("rules", &self.rules)
            .field("preconverter", &self.preconverter.is_some())
            .field("postconverter", &self.postconverter.is_some())
            .finish()
    }
}

/// Extracts typed views of a candidate value inside rules. A mismatch means
/// the rule was attached to a field of the wrong type.
pub trait Expect {
    fn text(&self) -> Result<&str, RuleError>;
    fn int(&self) -> Result<i64, RuleError>;
    fn float(&self) -> Result<f64, RuleError>;
    fn timestamp(&self) -> Result<NaiveDateTime, RuleError>;
    fn mapping(&self) -> Result<&Params, RuleError>;
}

impl Expect for Value {
    fn text(&self) -> Result<&str, RuleError> {
        self.as_str().ok_or(RuleError::Shape {
            expected: "string",
            actual: self.type_name(),
        })
    }

    fn int(&self) -> Result<i64, RuleError> {
        self.as_i64().ok_or(RuleError::Shape {
            expected: "int",
            actual: self.type_name(),
        })
    }

    fn float(&self) -> Result<f64, RuleError> {
        match self {
            Value::Float(n) => Ok(*n),
            Value::Int(n) => Ok(*n as f64),
            other => Err(RuleError::Shape {
                expected: "float",
                actual: other.type_name(),
            }),
        }
    }

    fn timestamp(&self) -> Result<NaiveDateTime, RuleError> {
        self.as_timestamp().ok_or(RuleError::Shape {
            expected: "timestamp",
            actual: self.type_name(),
        })
    }

    fn mapping(&self) -> Result<&Params, RuleError> {
        self.as_map().ok_or(RuleError::Shape {
            expected: "map",
            actual: self.type_name(),
        })
    }
}
