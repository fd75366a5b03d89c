//! Company forms

use std::sync::{Arc, OnceLock};

use super::enums::COMPANY_SIZE;
use super::{cached, FormDefinition};
use crate::converters;
use crate::schema::{
    ConversionError, DefinitionResult, Expect, FieldDescriptor, Precondition, RuleContext,
    RuleError, RuleResult, SchemaDef,
};
use crate::validators::dates::before_now;
use crate::validators::records::{exists_in, unique_in, Exclude};
use crate::validators::{bounds, format, phone};
use crate::value::Value;

const FA_COMPANY_PREFIX: &str = "شرکت ";
const EN_COMPANY_SUFFIX: &str = " Corp.";

fn fa_company_name(value: Value) -> Result<Value, ConversionError> {
    Ok(converters::map_text(value, |text| {
        let cleaned = converters::strip_parenthesized(&converters::normalize_persian(text));
        converters::prefix_short_name(&cleaned, FA_COMPANY_PREFIX)
    }))
}

fn en_company_name(value: Value) -> Result<Value, ConversionError> {
    Ok(converters::map_text(value, |text| {
        let cleaned = converters::strip_parenthesized(text);
        converters::suffix_short_name(&cleaned, EN_COMPANY_SUFFIX)
    }))
}

fn website(value: Value) -> Result<Value, ConversionError> {
    Ok(converters::map_text(value, converters::strip_scheme))
}

fn phone_field() -> FieldDescriptor {
    FieldDescriptor::string()
        .rule("format", |v, _| phone::digits_only(v.text()?))
        .rule("length", |v, _| phone::length(v.text()?))
        .rule("no_zero", |v, _| phone::no_leading_zero(v.text()?))
        .postconvert(converters::canonical_int_text)
}

pub fn create_company() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || build_create_company(Exclude::Nothing, "create_company"))
}

fn build_create_company(exclude: Exclude, name: &str) -> DefinitionResult<Arc<SchemaDef>> {
    SchemaDef::builder(name)
        .field(
            "fa_name",
            FieldDescriptor::string()
                .preconvert(fa_company_name)
                .rule("fa", |v, _| format::fa_text(v.text()?))
                .rule("bigger", |v, _| bounds::min_len("company name", v.text()?, 4))
                .rule("smaller", |v, _| bounds::max_len("company name", v.text()?, 32))
                .rule("unique", unique_in("companies", "fa_name", exclude)),
        )
        .field(
            "en_name",
            FieldDescriptor::string()
                .preconvert(en_company_name)
                .rule("en", |v, _| format::en_text(v.text()?))
                .rule("bigger", |v, _| bounds::min_len("company name", v.text()?, 4))
                .rule("smaller", |v, _| bounds::max_len("company name", v.text()?, 32))
                .rule("unique", unique_in("companies", "en_name", exclude)),
        )
        .field(
            "email",
            FieldDescriptor::string()
                .rule("format", |v, _| format::email(v.text()?))
                .rule("unique", unique_in("companies", "email", exclude))
                .rule("length", |v, _| bounds::max_len("email", v.text()?, 60)),
        )
        .field(
            "website",
            FieldDescriptor::string()
                .preconvert(website)
                .rule("format", |v, _| format::website(v.text()?))
                .rule("unique", unique_in("companies", "website", exclude))
                .rule("length", |v, _| bounds::max_len("website", v.text()?, 60)),
        )
        .field(
            "national_id",
            FieldDescriptor::string()
                .rule("is_numeric", |v, _| format::int_text(v.text()?))
                .rule("length", |v, _| bounds::digits_length(v, 11))
                .rule("unique", unique_in("companies", "national_id", exclude)),
        )
        .field(
            "city_id",
            FieldDescriptor::int().rule("has_id", exists_in("cities")),
        )
        .field(
            "phone",
            phone_field().rule("unique", unique_in("companies", "phone", exclude)),
        )
        .build()
}

/// Partial update of a company identified by `company_id`.
///
/// Uniqueness checks skip the company being edited.
pub fn edit_company() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        build_create_company(Exclude::Sibling("company_id"), "create_company")?
            .derive("edit_company")
            .modify_all(|_, field| {
                field.set_optional(true);
            })
            .field(
                "company_id",
                FieldDescriptor::int().rule("has_id", exists_in("companies")),
            )
            .precondition(Precondition::identified_by("company_id"))
            .build()
    })
}

pub fn get_company() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        SchemaDef::builder("get_company")
            .field(
                "company_id",
                FieldDescriptor::int().rule("has_id", exists_in("companies")),
            )
            .build()
    })
}

/// Numeric sibling value, converted or still raw.
fn sibling_number(ctx: &RuleContext<'_>, name: &str) -> Option<f64> {
    match ctx.sibling(name)? {
        Value::Float(n) => Some(*n),
        Value::Int(n) => Some(*n as f64),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

const SALARY_FLOOR: f64 = 1.0;
const SALARY_CEILING: f64 = 100.0;

fn salary_field() -> FieldDescriptor {
    FieldDescriptor::float()
        .optional()
        .preconvert(|v| converters::round_float(v, 2))
        .rule("order", |v, _| {
            bounds::between("salary", v.float()?, SALARY_FLOOR, SALARY_CEILING)
        })
}

fn salary_order(what: &str, ok: bool) -> RuleResult {
    if ok {
        Ok(())
    } else {
        Err(RuleError::violation(format!("Wrong {} salary amount", what)))
    }
}

/// Size text, or an already converted member, as canonical upper-case text.
fn company_size_text(value: Value) -> Result<Value, ConversionError> {
    Ok(match converters::company_size(COMPANY_SIZE, value) {
        Value::Enum(member) => Value::String(member.variant),
        other => other,
    })
}

/// Checked as text so an unknown size gets its own message; committed as a
/// `CompanySize` member.
fn company_size_field() -> FieldDescriptor {
    FieldDescriptor::string()
        .optional()
        .preconvert(company_size_text)
        .rule("none", |v, _| match COMPANY_SIZE.member(v.text()?) {
            Some(_) => Ok(()),
            None => Err(RuleError::violation("Invalid company size")),
        })
        .postconvert(|v| Ok(Some(converters::enum_by_name(COMPANY_SIZE, v))))
}

/// Optional company details, validated as a nested mapping.
pub fn company_info() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        SchemaDef::builder("company_info")
            .precondition(Precondition::None)
            .field(
                "avg_salary",
                salary_field().rule("check_calc", |v, ctx| {
                    let avg = v.float()?;
                    let min = sibling_number(ctx, "min_salary").unwrap_or(0.0);
                    let max = sibling_number(ctx, "max_salary").unwrap_or(SALARY_CEILING);
                    salary_order("avg", avg >= min && avg <= max)
                }),
            )
            .field(
                "min_salary",
                salary_field().rule("check_calc", |v, ctx| {
                    let min = v.float()?;
                    let avg = sibling_number(ctx, "avg_salary").unwrap_or(SALARY_CEILING);
                    let max = sibling_number(ctx, "max_salary").unwrap_or(SALARY_CEILING);
                    salary_order("min", min <= avg && min <= max)
                }),
            )
            .field(
                "max_salary",
                salary_field().rule("check_calc", |v, ctx| {
                    let max = v.float()?;
                    let avg = sibling_number(ctx, "avg_salary").unwrap_or(0.0);
                    let min = sibling_number(ctx, "min_salary").unwrap_or(0.0);
                    salary_order("max", max >= avg && max >= min)
                }),
            )
            .field(
                "description",
                FieldDescriptor::string()
                    .optional()
                    .preconvert(|v| Ok(converters::map_text(v, converters::normalize_persian)))
                    .rule("farsi", |v, _| format::fa_text_with_punctuation(v.text()?))
                    .rule("bigger", |v, _| bounds::min_len("description", v.text()?, 20))
                    .rule("smaller", |v, _| bounds::max_len("description", v.text()?, 1000)),
            )
            .field("company_size", company_size_field())
            .field(
                "date_founded",
                FieldDescriptor::timestamp()
                    .optional()
                    .preconvert(|v| match v {
                        Value::Int(n) if n > 9999 => converters::epoch_to_timestamp(v),
                        other => converters::year_to_timestamp(other),
                    })
                    .rule("before_now", before_now()),
            )
            .field(
                "old_review_count",
                FieldDescriptor::int()
                    .optional()
                    .rule("bigger", |v, _| bounds::at_least("count", v.int()?, 0)),
            )
            .field(
                "old_interview_count",
                FieldDescriptor::int()
                    .optional()
                    .rule("bigger", |v, _| bounds::at_least("count", v.int()?, 0)),
            )
            .build()
    })
}

fn fa_profile_name() -> FieldDescriptor {
    FieldDescriptor::string()
        .preconvert(fa_company_name)
        .rule("fa", |v, _| format::fa_text(v.text()?))
        .rule("bigger", |v, _| bounds::min_len("company name", v.text()?, 4))
        .rule("smaller", |v, _| bounds::max_len("company name", v.text()?, 60))
}

fn en_profile_name() -> FieldDescriptor {
    FieldDescriptor::string()
        .preconvert(en_company_name)
        .rule("en", |v, _| format::en_company_name(v.text()?))
        .rule("bigger", |v, _| bounds::min_len("company name", v.text()?, 4))
        .rule("smaller", |v, _| bounds::max_len("company name", v.text()?, 60))
}

fn dirname_field() -> FieldDescriptor {
    FieldDescriptor::string()
        .rule("length", |v, _| bounds::min_len("dirname", v.text()?, 4))
        .rule("valid_text", |v, _| format::dirname(v.text()?))
}

fn profile_website() -> FieldDescriptor {
    FieldDescriptor::string()
        .optional()
        .preconvert(website)
        .rule("format", |v, _| format::website(v.text()?))
        .rule("length", |v, _| bounds::max_len("website", v.text()?, 60))
}

/// Company details as delivered by a bulk import: the directory name is
/// required and `date_founded` is a plain year.
pub fn company_info_import() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        company_info()?
            .derive("company_info_import")
            .replace(
                "date_founded",
                FieldDescriptor::timestamp()
                    .optional()
                    .preconvert(converters::year_to_timestamp)
                    .rule("before_now", before_now()),
            )
            .field("dirname", dirname_field())
            .build()
    })
}

/// Main company record of a bulk import. The city is given by its Persian
/// slug rather than an id.
pub fn company_import() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        SchemaDef::builder("company_import")
            .field("fa_name", fa_profile_name())
            .field("en_name", en_profile_name())
            .field(
                "city_slug",
                FieldDescriptor::string()
                    .optional()
                    .preconvert(|v| Ok(converters::map_text(v, converters::normalize_persian)))
                    .rule("fa", |v, _| format::fa_text(v.text()?))
                    .rule("bigger", |v, _| bounds::min_len("city slug", v.text()?, 2))
                    .rule("smaller", |v, _| bounds::max_len("city slug", v.text()?, 32)),
            )
            .field("phone", phone_field().optional())
            .field("website", profile_website())
            .field("industry_id", FieldDescriptor::int().optional())
            .build()
    })
}

/// Full company profile with optional nested details under `info`.
pub fn company_profile() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        SchemaDef::builder("company_profile")
            .field("fa_name", fa_profile_name())
            .field("en_name", en_profile_name())
            .field("dirname", dirname_field())
            .field("industry_id", FieldDescriptor::int())
            .field(
                "city_id",
                FieldDescriptor::int().rule("has_id", exists_in("cities")),
            )
            .field("website", profile_website())
            .field("phone", phone_field().optional())
            .field("info", FieldDescriptor::nested(company_info()?).optional())
            .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;
    use crate::schema::{rule_names, FieldErrors, Schema};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn caps() -> Capabilities {
        let store = MemoryStore::from_json(json!({
            "cities": [{"id": 1, "name": "Tehran"}],
            "companies": [{
                "id": 7,
                "fa_name": "اسنپ",
                "en_name": "Snapp",
                "email": "info@snapp.ir",
                "website": "snapp.ir",
                "national_id": "10320894567",
                "phone": "2188776655",
                "city_id": 1
            }]
        }))
        .unwrap();
        Capabilities::new(Arc::new(store))
    }

    #[test]
    fn test_forms_build() {
        assert!(create_company().is_ok());
        assert!(edit_company().is_ok());
        assert!(get_company().is_ok());
        assert!(company_info().is_ok());
        assert!(company_profile().is_ok());
        assert!(company_import().is_ok());
        assert!(company_info_import().is_ok());
    }

    #[test]
    fn test_create_company_cleans_names() {
        let doc = json!({
            "fa_name": "ديو (تهران)",
            "en_name": "Dg (Tehran)",
            "email": "hello@digikala.com",
            "website": "http://digikala.com",
            "national_id": "10101010101",
            "city_id": "1",
            "phone": "2161930000"
        });
        let mut schema = Schema::from_json(create_company().unwrap(), doc, caps()).unwrap();
        let out = schema.validate().unwrap();

        assert_eq!(out["fa_name"], Value::from("شرکت دیو"));
        assert_eq!(out["en_name"], Value::from("Dg Corp."));
        assert_eq!(out["website"], Value::from("digikala.com"));
        assert_eq!(out["city_id"], Value::Int(1));
    }

    #[test]
    fn test_create_company_reports_every_rule() {
        let doc = json!({
            "email": "info@snapp.ir",
            "national_id": "12ab",
            "city_id": 9,
            "phone": "0"
        });
        let mut schema = Schema::from_json(create_company().unwrap(), doc, caps()).unwrap();
        schema.check().unwrap();
        let bag = schema.error_bag();

        assert!(bag["email"].rule("unique").is_some());
        assert!(bag["national_id"].rule("is_numeric").is_some());
        assert!(bag["national_id"].rule("length").is_some());
        assert_eq!(bag["city_id"].rule("has_id"), Some("Entry with id=9 does not exist"));
        assert!(bag["phone"].rule("length").is_some());
        assert!(bag["phone"].rule("no_zero").is_some());
        assert!(bag["fa_name"].rule(rule_names::MISSING).is_some());
    }

    #[test]
    fn test_edit_company_requires_id_and_change() {
        let mut schema =
            Schema::from_json(edit_company().unwrap(), json!({"company_id": 7}), caps()).unwrap();
        let failure = schema.validate().unwrap_err();
        assert!(failure.is_precondition());
        assert!(failure.errors().is_empty());
        assert_eq!(
            failure.message(),
            "Payload must contain the field company_id and at least one other field to edit"
        );
    }

    #[test]
    fn test_edit_company_may_keep_own_values() {
        let doc = json!({"company_id": 7, "email": "info@snapp.ir", "phone": "2188776655"});
        let mut schema = Schema::from_json(edit_company().unwrap(), doc, caps()).unwrap();
        let out = schema.validate().unwrap();
        assert_eq!(out.len(), 3);

        let doc = json!({"company_id": 8, "email": "info@snapp.ir"});
        let mut schema = Schema::from_json(edit_company().unwrap(), doc, caps()).unwrap();
        let failure = schema.validate().unwrap_err();
        assert!(failure.errors()["email"].rule("unique").is_some());
        assert!(failure.errors()["company_id"].rule("has_id").is_some());
    }

    #[test]
    fn test_phone_canonicalized_after_rules() {
        let def = SchemaDef::builder("p")
            .field("phone", phone_field())
            .build()
            .unwrap();
        let mut schema = Schema::from_json(def, json!({"phone": "2100"}), caps()).unwrap();
        assert_eq!(schema.validate().unwrap()["phone"], Value::from("2100"));
    }

    #[test]
    fn test_company_info_salary_cross_checks() {
        let doc = json!({"min_salary": "20", "avg_salary": 15.555, "max_salary": 30});
        let mut schema = Schema::from_json(company_info().unwrap(), doc, caps()).unwrap();
        schema.check().unwrap();
        let bag = schema.error_bag();
        assert_eq!(bag["avg_salary"].rule("check_calc"), Some("Wrong avg salary amount"));
        assert_eq!(bag["min_salary"].rule("check_calc"), Some("Wrong min salary amount"));
        assert!(!bag.contains_key("max_salary"));
        assert!(schema.only_optional_errors_exist());
    }

    #[test]
    fn test_company_info_conversions() {
        let doc = json!({"company_size": "vl", "date_founded": "2009", "avg_salary": "12.346"});
        let mut schema = Schema::from_json(company_info().unwrap(), doc, caps()).unwrap();
        let out = schema.validate().unwrap();
        assert_eq!(out["company_size"].as_enum().unwrap().variant, "XL");
        assert_eq!(out["date_founded"].to_string(), "2009-01-01T00:00:00");
        assert_eq!(out["avg_salary"], Value::Float(12.35));
    }

    #[test]
    fn test_company_import() {
        let doc = json!({
            "fa_name": "اسنپ",
            "en_name": "Snapp Box",
            "city_slug": "تهران",
            "industry_id": "12",
            "website": "http://snapp.ir"
        });
        let mut schema = Schema::from_json(company_import().unwrap(), doc, caps()).unwrap();
        let out = schema.validate().unwrap();
        assert_eq!(out["city_slug"], Value::from("تهران"));
        assert_eq!(out["industry_id"], Value::Int(12));
        assert_eq!(out["website"], Value::from("snapp.ir"));

        let doc = json!({"fa_name": "اسنپ", "en_name": "Snapp Box", "city_slug": "ت"});
        let mut schema = Schema::from_json(company_import().unwrap(), doc, caps()).unwrap();
        let failure = schema.validate().unwrap_err();
        assert_eq!(
            failure.errors()["city_slug"].rule("bigger"),
            Some("The length of city slug must be bigger than 2")
        );
        assert!(!failure.errors().contains_key("industry_id"));
    }

    #[test]
    fn test_company_info_import_takes_plain_years() {
        let doc = json!({"dirname": "snapp_box", "date_founded": "2009"});
        let mut schema = Schema::from_json(company_info_import().unwrap(), doc, caps()).unwrap();
        let out = schema.validate().unwrap();
        assert_eq!(out["date_founded"].to_string(), "2009-01-01T00:00:00");

        let doc = json!({"dirname": "snapp_box", "date_founded": 1700000000});
        let mut schema = Schema::from_json(company_info_import().unwrap(), doc, caps()).unwrap();
        let failure = schema.validate().unwrap_err();
        assert_eq!(
            failure.errors()["date_founded"].rule(rule_names::PRECONVERSION),
            Some("Field conversion error: 1700000000 is not a valid year")
        );

        let mut schema =
            Schema::from_json(company_info_import().unwrap(), json!({"old_review_count": 2}), caps())
                .unwrap();
        let failure = schema.validate().unwrap_err();
        assert!(failure.errors()["dirname"].rule(rule_names::MISSING).is_some());
    }

    #[test]
    fn test_unknown_company_size() {
        let doc = json!({"company_size": "huge"});
        let mut schema = Schema::from_json(company_info().unwrap(), doc, caps()).unwrap();
        let failure = schema.validate().unwrap_err();
        assert_eq!(
            failure.errors()["company_size"],
            FieldErrors::single("none", "Invalid company size")
        );
        assert_eq!(schema.inputs()["company_size"], Value::from("HUGE"));
    }
}
