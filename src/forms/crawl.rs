//! Crawler job parameters

use std::sync::OnceLock;

use super::{cached, FormDefinition};
use crate::schema::{Expect, FieldDescriptor, SchemaDef};
use crate::validators::{bounds, format};

pub const END_DATE_FORMAT: &str = "%d-%m-%Y";

pub fn crawl_params() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        SchemaDef::builder("crawl_params")
            .field(
                "end_date",
                FieldDescriptor::string()
                    .optional()
                    .rule("date_format", |v, _| format::date_format(v.text()?, END_DATE_FORMAT)),
            )
            .field(
                "days_ago",
                FieldDescriptor::int()
                    .rule("bigger", |v, _| bounds::at_least("days_ago", v.int()?, 1)),
            )
            .build()
    })
}
