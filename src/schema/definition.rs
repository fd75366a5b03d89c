//! Schema definitions
//!
//! A [`SchemaDef`] is the immutable, ordered field table of one schema type.
//! It is built once (usually inside a `OnceLock`) and shared through `Arc`.
//! Derived schemas start from a clone of their parent's table and override
//! individual descriptors.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::errors::{DefinitionError, DefinitionResult};
use super::types::{FieldDescriptor, FieldType};
use crate::value::Params;

/// Whole-input check run before any field is processed.
#[derive(Clone, Default)]
pub enum Precondition {
    /// Accept any mapping, including an empty one
    None,
    /// Reject an empty mapping
    #[default]
    NonEmpty,
    /// Require the identifying key plus at least one other field
    IdentifiedBy(String),
    /// Arbitrary check returning the veto message
    Custom(Arc<dyn Fn(&Params) -> Result<(), String> + Send + Sync>),
}

impl Precondition {
    pub fn identified_by(key: impl Into<String>) -> Self {
        Precondition::IdentifiedBy(key.into())
    }

    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&Params) -> Result<(), String> + Send + Sync + 'static,
    {
        Precondition::Custom(Arc::new(check))
    }

    /// Returns the veto message if `inputs` is rejected.
    pub fn check(&self, inputs: &Params) -> Result<(), String> {
        match self {
            Precondition::None => Ok(()),
            Precondition::NonEmpty => {
                if inputs.is_empty() {
                    Err("Payload cannot be empty".to_string())
                } else {
                    Ok(())
                }
            }
            Precondition::IdentifiedBy(key) => {
                if inputs.len() < 2 || !inputs.contains_key(key) {
                    Err(format!(
                        "Payload must contain the field {} and at least one other field to edit",
                        key
                    ))
                } else {
                    Ok(())
                }
            }
            Precondition::Custom(check) => check(inputs),
        }
    }
}

impl fmt::Debug for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::None => write!(f, "None"),
            Precondition::NonEmpty => write!(f, "NonEmpty"),
            Precondition::IdentifiedBy(key) => f.debug_tuple("IdentifiedBy").field(key).finish(),
            Precondition::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Ordered field table of one schema type
#[derive(Debug, Clone)]
pub struct SchemaDef {
    name: String,
    fields: Vec<(String, FieldDescriptor)>,
    precondition: Precondition,
    max_level: Option<usize>,
}

impl SchemaDef {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Starts a derived definition from a copy of this table.
    ///
    /// The precondition and depth override are inherited and may be replaced.
    pub fn derive(&self, name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: self.fields.clone(),
            precondition: self.precondition.clone(),
            max_level: self.max_level,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, field)| field)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn precondition(&self) -> &Precondition {
        &self.precondition
    }

    /// Depth override; `None` defers to the engine configuration.
    pub fn max_level(&self) -> Option<usize> {
        self.max_level
    }
}

/// Builds a [`SchemaDef`], reporting the first definition error on
/// [`SchemaBuilder::build`].
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, FieldDescriptor)>,
    precondition: Precondition,
    max_level: Option<usize>,
    error: Option<DefinitionError>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            precondition: Precondition::default(),
            max_level: None,
            error: None,
        }
    }

    /// Appends a field.
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        let name = name.into();
        if self.fields.iter().any(|(existing, _)| *existing == name) {
            self.fail(DefinitionError::DuplicateField {
                schema: self.name.clone(),
                field: name,
            });
            return self;
        }
        self.fields.push((name, descriptor));
        self
    }

    /// Replaces an inherited field's descriptor, keeping its position.
    pub fn replace(mut self, name: &str, descriptor: FieldDescriptor) -> Self {
        match self.fields.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, field)) => *field = descriptor,
            None => self.unknown(name),
        }
        self
    }

    /// Edits an inherited field's descriptor in place.
    pub fn modify<F>(mut self, name: &str, edit: F) -> Self
    where
        F: FnOnce(&mut FieldDescriptor),
    {
        match self.fields.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, field)) => edit(field),
            None => self.unknown(name),
        }
        self
    }

    /// Applies `edit` to every field.
    pub fn modify_all<F>(mut self, mut edit: F) -> Self
    where
        F: FnMut(&str, &mut FieldDescriptor),
    {
        for (name, field) in &mut self.fields {
            edit(name, field);
        }
        self
    }

    pub fn precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }

    pub fn max_level(mut self, max_level: usize) -> Self {
        self.max_level = Some(max_level);
        self
    }

    pub fn build(self) -> DefinitionResult<Arc<SchemaDef>> {
        if let Some(err) = self.error {
            return Err(err);
        }

        if self.max_level == Some(0) {
            return Err(DefinitionError::InvalidMaxLevel { schema: self.name });
        }

        for (name, field) in &self.fields {
            if let FieldType::Enum(spec) = field.field_type() {
                if spec.variants.is_empty() {
                    return Err(DefinitionError::EmptyEnum {
                        schema: self.name.clone(),
                        field: name.clone(),
                        enum_name: spec.name,
                    });
                }
            }

            let mut seen = HashSet::new();
            for rule in field.rules() {
                if !seen.insert(rule.name()) {
                    return Err(DefinitionError::DuplicateRule {
                        schema: self.name.clone(),
                        field: name.clone(),
                        rule: rule.name().to_string(),
                    });
                }
            }
        }

        Ok(Arc::new(SchemaDef {
            name: self.name,
            fields: self.fields,
            precondition: self.precondition,
            max_level: self.max_level,
        }))
    }

    fn unknown(&mut self, field: &str) {
        let err = DefinitionError::UnknownField {
            schema: self.name.clone(),
            field: field.to_string(),
        };
        self.fail(err);
    }

    fn fail(&mut self, err: DefinitionError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::errors::RuleError;
    use crate::schema::types::EnumSpec;
    use crate::value::Value;

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let def = SchemaDef::builder("order")
            .field("zeta", FieldDescriptor::string())
            .field("alpha", FieldDescriptor::int())
            .field("mid", FieldDescriptor::boolean())
            .build()
            .unwrap();

        let names: Vec<_> = def.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(def.field_count(), 3);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = SchemaDef::builder("dup")
            .field("a", FieldDescriptor::string())
            .field("a", FieldDescriptor::int())
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateField { .. }));
    }

    #[test]
    fn test_empty_enum_rejected() {
        const EMPTY: EnumSpec = EnumSpec::new("Empty", &[]);
        let err = SchemaDef::builder("enum")
            .field("kind", FieldDescriptor::enumeration(EMPTY))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::EmptyEnum {
                schema: "enum".into(),
                field: "kind".into(),
                enum_name: "Empty",
            }
        );
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let err = SchemaDef::builder("rules")
            .field(
                "a",
                FieldDescriptor::string()
                    .rule("len", |_, _| Ok(()))
                    .rule("len", |_, _| Ok(())),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateRule { .. }));
    }

    #[test]
    fn test_zero_max_level_rejected() {
        let err = SchemaDef::builder("deep").max_level(0).build().unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidMaxLevel { .. }));
    }

    #[test]
    fn test_derive_clones_and_overrides() {
        let parent = SchemaDef::builder("create")
            .field("name", FieldDescriptor::string().rule("len", |_, _| Ok(())))
            .field("email", FieldDescriptor::string())
            .build()
            .unwrap();

        let child = parent
            .derive("edit")
            .modify_all(|_, field| {
                field.set_optional(true);
            })
            .modify("name", |field| {
                field.set_rule("len", |_, _| Err(RuleError::violation("x")));
            })
            .precondition(Precondition::identified_by("id"))
            .field("id", FieldDescriptor::int())
            .build()
            .unwrap();

        assert!(!parent.field("name").unwrap().is_optional());
        assert!(child.field("name").unwrap().is_optional());
        assert!(child.field("email").unwrap().is_optional());
        assert!(!child.field("id").unwrap().is_optional());
        assert!(matches!(child.precondition(), Precondition::IdentifiedBy(_)));
        assert!(matches!(parent.precondition(), Precondition::NonEmpty));
    }

    #[test]
    fn test_modify_unknown_field_rejected() {
        let parent = SchemaDef::builder("p")
            .field("a", FieldDescriptor::string())
            .build()
            .unwrap();
        let err = parent.derive("c").modify("b", |_| {}).build().unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownField { .. }));
    }

    #[test]
    fn test_preconditions() {
        assert!(Precondition::NonEmpty.check(&Params::new()).is_err());
        assert!(Precondition::None.check(&Params::new()).is_ok());

        let edit = Precondition::identified_by("company_id");
        let only_key = params(&[("company_id", Value::Int(1))]);
        let err = edit.check(&only_key).unwrap_err();
        assert_eq!(
            err,
            "Payload must contain the field company_id and at least one other field to edit"
        );

        let no_key = params(&[("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert!(edit.check(&no_key).is_err());

        let ok = params(&[("company_id", Value::Int(1)), ("phone", Value::from("21"))]);
        assert!(edit.check(&ok).is_ok());

        let custom = Precondition::custom(|inputs| {
            if inputs.contains_key("token") {
                Ok(())
            } else {
                Err("token required".into())
            }
        });
        assert_eq!(custom.check(&Params::new()).unwrap_err(), "token required");
    }
}
