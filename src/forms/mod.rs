//! Ready-made request forms
//!
//! Each form is built once per process and shared through an `Arc`. A form
//! that fails to build keeps returning the same definition error.

pub mod companies;
pub mod crawl;
pub mod enums;
pub mod feedback;
pub mod users;

use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::schema::{DefinitionError, DefinitionResult, SchemaDef};

/// Result of building a form.
pub type FormDefinition = DefinitionResult<Arc<SchemaDef>>;

pub(crate) fn cached(
    cell: &'static OnceLock<FormDefinition>,
    build: impl FnOnce() -> FormDefinition,
) -> FormDefinition {
    cell.get_or_init(build).clone()
}

#[derive(Debug, Clone, Error)]
pub enum FormError {
    #[error("Unknown form: {0}")]
    Unknown(String),

    #[error("Form definition error: {0}")]
    Definition(#[from] DefinitionError),
}

/// A named form in the registry.
#[derive(Debug, Clone, Copy)]
pub struct FormEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub definition: fn() -> FormDefinition,
}

pub const FORMS: &[FormEntry] = &[
    FormEntry {
        name: "login",
        description: "E-mail and password",
        definition: users::login,
    },
    FormEntry {
        name: "create_user",
        description: "Sign-up",
        definition: users::create_user,
    },
    FormEntry {
        name: "edit_user",
        description: "Partial profile update of the current user",
        definition: users::edit_user,
    },
    FormEntry {
        name: "create_company",
        description: "New company",
        definition: companies::create_company,
    },
    FormEntry {
        name: "edit_company",
        description: "Partial company update, identified by company_id",
        definition: companies::edit_company,
    },
    FormEntry {
        name: "get_company",
        description: "Company lookup by id",
        definition: companies::get_company,
    },
    FormEntry {
        name: "company_profile",
        description: "Company profile with optional nested info",
        definition: companies::company_profile,
    },
    FormEntry {
        name: "company_info",
        description: "Salary, size and history details of a company",
        definition: companies::company_info,
    },
    FormEntry {
        name: "company_import",
        description: "Main company record of a bulk import",
        definition: companies::company_import,
    },
    FormEntry {
        name: "company_info_import",
        description: "Company details of a bulk import",
        definition: companies::company_info_import,
    },
    FormEntry {
        name: "get_feedbacks",
        description: "Feedback listing filter",
        definition: feedback::get_feedbacks,
    },
    FormEntry {
        name: "register_review",
        description: "New company review",
        definition: feedback::register_review,
    },
    FormEntry {
        name: "register_interview",
        description: "New interview report",
        definition: feedback::register_interview,
    },
    FormEntry {
        name: "crawl_params",
        description: "Crawler job parameters",
        definition: crawl::crawl_params,
    },
];

pub fn lookup(name: &str) -> Option<&'static FormEntry> {
    FORMS.iter().find(|entry| entry.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    FORMS.iter().map(|entry| entry.name)
}

/// Builds (or fetches) the named form.
pub fn definition(name: &str) -> Result<Arc<SchemaDef>, FormError> {
    let entry = lookup(name).ok_or_else(|| FormError::Unknown(name.to_string()))?;
    Ok((entry.definition)()?)
}
