//! Review and interview forms

use std::sync::{Arc, OnceLock};

use super::enums::{feedback_type, FEEDBACK_TYPE, INTERVIEW_RESULT};
use super::{cached, FormDefinition};
use crate::converters;
use crate::schema::{
    DefinitionResult, Expect, FieldDescriptor, RuleContext, RuleError, RuleResult, SchemaDef,
};
use crate::validators::dates::{after_field, before_now};
use crate::validators::records::{self, exists_in, Exclude};
use crate::validators::{bounds, format};
use crate::value::Value;

/// Input format of feedback dates.
pub const DATE_INPUT_FORMAT: &str = "%d-%m-%Y";

/// Keys accepted inside the free-form `details` mapping.
pub const DETAIL_KEYS: &[&str] = &["benefits", "team", "location", "remote"];

/// Listing filter for a company's feedback.
pub fn get_feedbacks() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        SchemaDef::builder("get_feedbacks")
            .field(
                "company_id",
                FieldDescriptor::int().rule("has_id", exists_in("companies")),
            )
            .field("user_id", FieldDescriptor::int().optional().ignored())
            .field(
                "feedback_type",
                FieldDescriptor::enumeration(FEEDBACK_TYPE)
                    .optional()
                    .preconvert(|v| Ok(feedback_type(v))),
            )
            .field(
                "offset",
                FieldDescriptor::int()
                    .optional()
                    .rule("bigger", |v, _| bounds::at_least("offset", v.int()?, 1)),
            )
            .field(
                "limit",
                FieldDescriptor::int()
                    .optional()
                    .rule("bigger", |v, _| bounds::at_least("limit", v.int()?, 0)),
            )
            .build()
    })
}

fn salary_field() -> FieldDescriptor {
    FieldDescriptor::string()
        .rule("is_int", |v, _| format::int_text(v.text()?))
        .rule("order", |v, _| {
            let amount: i64 = v
                .text()?
                .parse()
                .map_err(|_| RuleError::violation("Salary must be a whole number"))?;
            bounds::between("salary", amount, 1, 99)
        })
}

fn details_keys(value: &Value, _: &RuleContext<'_>) -> RuleResult {
    let unknown: Vec<&str> = value
        .mapping()?
        .keys()
        .map(String::as_str)
        .filter(|key| !DETAIL_KEYS.contains(key))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    Err(RuleError::violation(format!(
        "Unknown keys in details: {}",
        unknown.join(", ")
    )))
}

fn build_feedback() -> DefinitionResult<Arc<SchemaDef>> {
    SchemaDef::builder("feedback")
        .field(
            "title",
            FieldDescriptor::string()
                .rule("length", |v, _| bounds::len_between("Title", v.text()?, 4, 32)),
        )
        .field(
            "body",
            FieldDescriptor::string()
                .preconvert(|v| Ok(converters::map_text(v, converters::normalize_persian)))
                .rule("length", |v, _| bounds::len_between("Body", v.text()?, 20, 2000)),
        )
        .field(
            "job_title",
            FieldDescriptor::string()
                .rule("length", |v, _| bounds::len_between("Job title", v.text()?, 4, 32)),
        )
        .field(
            "score",
            FieldDescriptor::int().rule("order", |v, _| bounds::between("score", v.int()?, 0, 10)),
        )
        .field("salary", salary_field())
        .field("type", FieldDescriptor::enumeration(FEEDBACK_TYPE))
        .field(
            "company_id",
            FieldDescriptor::int().rule("has_id", exists_in("companies")),
        )
        .field(
            "details",
            FieldDescriptor::map().optional().rule("keys_in", details_keys),
        )
        .build()
}

/// One review per user and company.
fn not_reviewed_yet(value: &Value, ctx: &RuleContext<'_>) -> RuleResult {
    let Some(user) = ctx.current_identity() else {
        return Ok(());
    };
    records::unique(
        ctx,
        "reviews",
        "company_id",
        value,
        Exclude::Nothing,
        &[("user_id", Value::Int(user))],
    )
    .map_err(|err| match err {
        RuleError::Violation(_) => RuleError::violation("User has already reviewed this company"),
        other => other,
    })
}

pub fn register_review() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        build_feedback()?
            .derive("register_review")
            .modify("type", |field| {
                field.set_ignore(true);
            })
            .modify("company_id", |field| {
                field.set_rule("user_reviewed", not_reviewed_yet);
            })
            .field(
                "start_ts",
                FieldDescriptor::timestamp()
                    .preconvert(converters::parse_date(DATE_INPUT_FORMAT))
                    .rule("before_now", before_now()),
            )
            .field(
                "end_ts",
                FieldDescriptor::timestamp()
                    .optional()
                    .preconvert(converters::parse_date(DATE_INPUT_FORMAT))
                    .rule("before_now", before_now())
                    .rule("after_start", after_field("start_ts")),
            )
            .build()
    })
}

pub fn register_interview() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        build_feedback()?
            .derive("register_interview")
            .modify("type", |field| {
                field.set_ignore(true);
            })
            .field(
                "int_ts",
                FieldDescriptor::timestamp()
                    .preconvert(converters::parse_date(DATE_INPUT_FORMAT))
                    .rule("before_now", before_now()),
            )
            .field("expected_salary", salary_field())
            .field("result", FieldDescriptor::enumeration(INTERVIEW_RESULT))
            .build()
    })
}
