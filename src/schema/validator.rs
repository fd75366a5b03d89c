//! Schema instances
//!
//! A [`Schema`] validates exactly one input snapshot against a definition.
//!
//! Lifecycle:
//! - Fresh: constructed, `has_errors` unset
//! - Checked: `check()` ran; `sanitized`, `error_bag`, `has_errors` populated
//! - Validated: the caller consumed the result through `validate()`
//!
//! `check()` recomputes from the current inputs on every call. Field-level
//! failures are aggregated; only the whole-input precondition and
//! `validate()` surface a [`ValidationFailure`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::definition::SchemaDef;
use super::errors::{ErrorBag, FailureKind, ValidationFailure};
use super::pipeline::{run_field, FieldEnv, FieldOutcome};
use crate::capabilities::Capabilities;
use crate::value::{params_from_json, Params};

/// Instance lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Fresh,
    Checked,
    Validated,
}

/// One validation pass over one input mapping
#[derive(Debug)]
pub struct Schema {
    def: Arc<SchemaDef>,
    inputs: Params,
    caps: Capabilities,
    level: usize,
    max_level: usize,
    state: SchemaState,
    sanitized: Params,
    error_bag: ErrorBag,
    has_errors: Option<bool>,
    only_optional_errors_exist: bool,
    depth_exceeded: bool,
    children: BTreeMap<String, Schema>,
    veto: Option<ValidationFailure>,
}

impl Schema {
    /// Creates a root instance (level 0).
    ///
    /// The depth bound is the definition's override, else the configured
    /// `max_level`.
    pub fn new(def: Arc<SchemaDef>, inputs: Params, caps: Capabilities) -> Self {
        let max_level = def.max_level().unwrap_or(caps.config().max_level);
        Self::nested(def, inputs, caps, 0, max_level)
    }

    /// Creates a root instance from a JSON document.
    ///
    /// A document that is not a JSON object is rejected like a whole-input
    /// precondition failure.
    pub fn from_json(
        def: Arc<SchemaDef>,
        document: serde_json::Value,
        caps: Capabilities,
    ) -> Result<Self, ValidationFailure> {
        match params_from_json(document) {
            Some(inputs) => Ok(Self::new(def, inputs, caps)),
            None => Err(ValidationFailure::precondition(
                "Payload must be a JSON object",
                caps.config().status_code,
            )),
        }
    }

    pub(crate) fn nested(
        def: Arc<SchemaDef>,
        inputs: Params,
        caps: Capabilities,
        level: usize,
        max_level: usize,
    ) -> Self {
        Self {
            def,
            inputs,
            caps,
            level,
            max_level,
            state: SchemaState::Fresh,
            sanitized: Params::new(),
            error_bag: ErrorBag::new(),
            has_errors: None,
            only_optional_errors_exist: false,
            depth_exceeded: false,
            children: BTreeMap::new(),
            veto: None,
        }
    }

    /// Runs the precondition and every field's pipeline.
    ///
    /// # Errors
    ///
    /// Returns the precondition's [`ValidationFailure`] (empty error bag) if
    /// the whole input is vetoed. Field failures are never returned here;
    /// they land in [`Schema::error_bag`].
    pub fn check(&mut self) -> Result<(), ValidationFailure> {
        self.sanitized.clear();
        self.error_bag.clear();
        self.children.clear();
        self.veto = None;
        self.depth_exceeded = false;
        if self.state == SchemaState::Fresh {
            self.state = SchemaState::Checked;
        }

        if let Err(message) = self.def.precondition().check(&self.inputs) {
            debug!(
                schema = self.def.name(),
                level = self.level,
                reason = message.as_str(),
                "payload rejected"
            );
            let failure = ValidationFailure::precondition(message, self.caps.config().status_code);
            self.has_errors = Some(true);
            self.only_optional_errors_exist = false;
            self.veto = Some(failure.clone());
            return Err(failure);
        }

        let def = Arc::clone(&self.def);
        let mut optional_only = true;

        for (name, field) in def.fields() {
            if field.is_ignored() {
                continue;
            }

            let mut env = FieldEnv {
                schema: def.name(),
                inputs: &mut self.inputs,
                caps: &self.caps,
                level: self.level,
                max_level: self.max_level,
                children: &mut self.children,
            };

            match run_field(name, field, &mut env) {
                FieldOutcome::Skipped => {}
                FieldOutcome::Passed(value) => {
                    self.sanitized.insert(name.to_string(), value);
                }
                FieldOutcome::Failed(failure) => {
                    debug!(
                        schema = def.name(),
                        field = name,
                        code = failure.kind.code(),
                        optional = field.is_optional(),
                        "field rejected"
                    );
                    // a depth overrun is never dropped with an optional field
                    if failure.kind == FailureKind::DepthExceeded {
                        self.depth_exceeded = true;
                        optional_only = false;
                    } else if !field.is_optional() {
                        optional_only = false;
                    }
                    self.error_bag.insert(name.to_string(), failure.errors);
                }
            }
        }

        self.has_errors = Some(!self.error_bag.is_empty());
        self.only_optional_errors_exist = optional_only;
        debug!(
            schema = def.name(),
            level = self.level,
            passed = self.sanitized.len(),
            failed = self.error_bag.len(),
            "schema checked"
        );
        Ok(())
    }

    /// Returns the sanitized mapping, or the aggregated failure with the
    /// configured message.
    pub fn validate(&mut self) -> Result<Params, ValidationFailure> {
        let message = self.caps.config().failure_message.clone();
        self.validate_with_message(message)
    }

    /// Like [`Schema::validate`] with a custom top-level message.
    pub fn validate_with_message(
        &mut self,
        message: impl Into<String>,
    ) -> Result<Params, ValidationFailure> {
        if self.has_errors.is_none() {
            self.check()?;
        } else if let Some(veto) = &self.veto {
            return Err(veto.clone());
        }
        self.state = SchemaState::Validated;

        if self.has_errors == Some(true) {
            info!(
                schema = self.def.name(),
                failed = self.error_bag.len(),
                "validation failed"
            );
            return Err(ValidationFailure::with_errors(
                self.error_bag.clone(),
                message,
                self.caps.config().status_code,
            ));
        }

        debug!(schema = self.def.name(), fields = self.sanitized.len(), "validation passed");
        Ok(self.sanitized.clone())
    }

    pub fn definition(&self) -> &SchemaDef {
        &self.def
    }

    /// Current inputs, including values rewritten by pre-conversion.
    pub fn inputs(&self) -> &Params {
        &self.inputs
    }

    /// Mutable inputs for a caller that wants to re-check.
    pub fn inputs_mut(&mut self) -> &mut Params {
        &mut self.inputs
    }

    pub fn sanitized(&self) -> &Params {
        &self.sanitized
    }

    pub fn error_bag(&self) -> &ErrorBag {
        &self.error_bag
    }

    /// `None` until `check()` has run.
    pub fn has_errors(&self) -> Option<bool> {
        self.has_errors
    }

    /// True when every failed field is optional (vacuously true without
    /// failures). False after a precondition veto or a depth overrun.
    pub fn only_optional_errors_exist(&self) -> bool {
        self.only_optional_errors_exist
    }

    /// True when this mapping, or one nested in it, exceeded the depth bound.
    pub fn depth_exceeded(&self) -> bool {
        self.depth_exceeded
    }

    pub fn children(&self) -> &BTreeMap<String, Schema> {
        &self.children
    }

    pub fn child(&self, field: &str) -> Option<&Schema> {
        self.children.get(field)
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn state(&self) -> SchemaState {
        self.state
    }
}
