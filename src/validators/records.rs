//! Cross-record checks against the injected record store
//!
//! Store failures propagate as [`RuleError::Store`] and are recorded as the
//! rule's message like any other violation.

use crate::schema::{RuleContext, RuleError, RuleResult};
use crate::store::RecordId;
use crate::value::Value;

/// Record to leave out of a uniqueness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exclude {
    /// Consider every record (create flows)
    #[default]
    Nothing,
    /// Skip a fixed record
    Record(RecordId),
    /// Skip the authenticated user's own record, resolved at evaluation time
    CurrentIdentity,
    /// Skip the record whose id is held by a sibling field. Nothing is
    /// skipped while the sibling is absent or not an id.
    Sibling(&'static str),
}

impl Exclude {
    fn resolve(&self, ctx: &RuleContext<'_>) -> Result<Option<RecordId>, RuleError> {
        match self {
            Exclude::Nothing => Ok(None),
            Exclude::Record(id) => Ok(Some(*id)),
            Exclude::CurrentIdentity => ctx.current_identity().map(Some).ok_or_else(|| {
                RuleError::violation("An authenticated user is required for this check")
            }),
            Exclude::Sibling(field) => Ok(ctx.sibling(field).and_then(record_id)),
        }
    }
}

/// Reads a record id from an integer or digit text.
fn record_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Int(id) => Some(*id),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

/// Fails unless a record with id `value` exists in `table`.
pub fn exists(ctx: &RuleContext<'_>, table: &str, value: &Value) -> RuleResult {
    let id = value.as_i64().ok_or(RuleError::Shape {
        expected: "int",
        actual: value.type_name(),
    })?;
    if ctx.store().exists(table, id)? {
        Ok(())
    } else {
        Err(RuleError::violation(format!(
            "Entry with id={} does not exist",
            id
        )))
    }
}

/// Fails if another record of `table` already holds `value` in `column`.
pub fn unique(
    ctx: &RuleContext<'_>,
    table: &str,
    column: &str,
    value: &Value,
    exclude: Exclude,
    filters: &[(&str, Value)],
) -> RuleResult {
    let except = exclude.resolve(ctx)?;
    let count = ctx
        .store()
        .count_matching(table, column, value, except, filters)?;
    if count > 0 {
        return Err(RuleError::violation(format!(
            "The value {} exists in the column '{}' of table '{}'",
            value, column, table
        )));
    }
    Ok(())
}

/// Rule builder for [`exists`].
pub fn exists_in(
    table: &'static str,
) -> impl Fn(&Value, &RuleContext<'_>) -> RuleResult + Send + Sync + 'static {
    move |value, ctx| exists(ctx, table, value)
}

/// Rule builder for [`unique`] without extra filters.
pub fn unique_in(
    table: &'static str,
    column: &'static str,
    exclude: Exclude,
) -> impl Fn(&Value, &RuleContext<'_>) -> RuleResult + Send + Sync + 'static {
    move |value, ctx| unique(ctx, table, column, value, exclude, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::capabilities::{Authenticated, Capabilities};
    use crate::store::MemoryStore;
    use crate::value::Params;
    use serde_json::json;

    fn caps() -> Capabilities {
        let store = MemoryStore::from_json(json!({
            "users": [
                {"id": 1, "email": "ali@mail.com"},
                {"id": 2, "email": "sara@mail.com"}
            ],
            "reviews": [
                {"id": 10, "company_id": 5, "user_id": 1}
            ]
        }))
        .unwrap();
        Capabilities::new(Arc::new(store))
    }

    #[test]
    fn test_exists() {
        let caps = caps();
        let inputs = Params::new();
        let ctx = RuleContext::new("t", "user_id", &inputs, &caps);

        assert!(exists(&ctx, "users", &Value::Int(1)).is_ok());
        assert_eq!(
            exists(&ctx, "users", &Value::Int(9)).unwrap_err().to_string(),
            "Entry with id=9 does not exist"
        );
        assert!(matches!(
            exists(&ctx, "cities", &Value::Int(1)),
            Err(RuleError::Store(_))
        ));
    }

    #[test]
    fn test_unique_exclusions() {
        let caps = caps();
        let inputs = Params::new();
        let ctx = RuleContext::new("t", "email", &inputs, &caps);
        let taken = Value::from("ali@mail.com");

        let err = unique(&ctx, "users", "email", &taken, Exclude::Nothing, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The value ali@mail.com exists in the column 'email' of table 'users'"
        );
        assert!(unique(&ctx, "users", "email", &taken, Exclude::Record(1), &[]).is_ok());
        assert!(unique(&ctx, "users", "email", &taken, Exclude::Record(2), &[]).is_err());
    }

    #[test]
    fn test_unique_excluding_current_identity() {
        let caps = caps();
        let inputs = Params::new();
        let taken = Value::from("ali@mail.com");

        let anonymous = RuleContext::new("t", "email", &inputs, &caps);
        assert!(unique(&anonymous, "users", "email", &taken, Exclude::CurrentIdentity, &[]).is_err());

        let me = caps.clone().with_identity(Arc::new(Authenticated(1)));
        let ctx = RuleContext::new("t", "email", &inputs, &me);
        assert!(unique(&ctx, "users", "email", &taken, Exclude::CurrentIdentity, &[]).is_ok());

        let other = caps.with_identity(Arc::new(Authenticated(2)));
        let ctx = RuleContext::new("t", "email", &inputs, &other);
        assert!(unique(&ctx, "users", "email", &taken, Exclude::CurrentIdentity, &[]).is_err());
    }

    #[test]
    fn test_unique_excluding_sibling_record() {
        let caps = caps();
        let taken = Value::from("ali@mail.com");
        let exclude = Exclude::Sibling("user_id");

        let mut inputs = Params::new();
        let ctx = RuleContext::new("t", "email", &inputs, &caps);
        assert!(unique(&ctx, "users", "email", &taken, exclude, &[]).is_err());

        inputs.insert("user_id".into(), Value::from("1"));
        let ctx = RuleContext::new("t", "email", &inputs, &caps);
        assert!(unique(&ctx, "users", "email", &taken, exclude, &[]).is_ok());

        inputs.insert("user_id".into(), Value::Int(1));
        let ctx = RuleContext::new("t", "email", &inputs, &caps);
        assert!(unique(&ctx, "users", "email", &taken, exclude, &[]).is_ok());
    }

    #[test]
    fn test_unique_with_filters() {
        let caps = caps();
        let inputs = Params::new();
        let ctx = RuleContext::new("t", "company_id", &inputs, &caps);
        let company = Value::Int(5);

        let mine = [("user_id", Value::Int(1))];
        assert!(unique(&ctx, "reviews", "company_id", &company, Exclude::Nothing, &mine).is_err());

        let theirs = [("user_id", Value::Int(2))];
        assert!(unique(&ctx, "reviews", "company_id", &company, Exclude::Nothing, &theirs).is_ok());
    }
}
