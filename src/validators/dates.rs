//! Date ordering checks
//!
//! The anchor is resolved when the rule runs: "now" comes from the injected
//! clock and a sibling anchor reads the sibling's converted value from the
//! rule context. A sibling that is absent, or was not converted to a
//! timestamp, disables the check.

use std::fmt;

use chrono::NaiveDateTime;

use crate::schema::{Expect, RuleContext, RuleError, RuleResult};
use crate::value::{Value, TIMESTAMP_FORMAT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// Value must not be later than the anchor
    Before,
    /// Value must not be earlier than the anchor
    After,
}

impl fmt::Display for DateOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateOrder::Before => write!(f, "before"),
            DateOrder::After => write!(f, "after"),
        }
    }
}

/// What a date is compared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateAnchor {
    Now,
    Fixed(NaiveDateTime),
    /// Converted value of a sibling field
    Field(&'static str),
}

impl fmt::Display for DateAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateAnchor::Now => write!(f, "now"),
            DateAnchor::Fixed(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            DateAnchor::Field(name) => write!(f, "{}", name),
        }
    }
}

/// Compares `date` with the resolved anchor. Equal instants pass.
pub fn compare(
    ctx: &RuleContext<'_>,
    date: NaiveDateTime,
    order: DateOrder,
    anchor: DateAnchor,
) -> RuleResult {
    let reference = match anchor {
        DateAnchor::Now => ctx.now(),
        DateAnchor::Fixed(ts) => ts,
        DateAnchor::Field(name) => match ctx.sibling_timestamp(name) {
            Some(ts) => ts,
            None => return Ok(()),
        },
    };

    let violated = match order {
        DateOrder::Before => date > reference,
        DateOrder::After => date < reference,
    };
    if violated {
        return Err(RuleError::violation(format!(
            "Date must be {} {}",
            order, anchor
        )));
    }
    Ok(())
}

/// Rule builder for [`compare`].
pub fn ordered(
    order: DateOrder,
    anchor: DateAnchor,
) -> impl Fn(&Value, &RuleContext<'_>) -> RuleResult + Send + Sync + 'static {
    move |value, ctx| compare(ctx, value.timestamp()?, order, anchor)
}

pub fn before_now() -> impl Fn(&Value, &RuleContext<'_>) -> RuleResult + Send + Sync + 'static {
    ordered(DateOrder::Before, DateAnchor::Now)
}

pub fn after_field(
    field: &'static str,
) -> impl Fn(&Value, &RuleContext<'_>) -> RuleResult + Send + Sync + 'static {
    ordered(DateOrder::After, DateAnchor::Field(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;

    use crate::capabilities::{Capabilities, FixedClock};
    use crate::value::Params;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn caps() -> Capabilities {
        Capabilities::default().with_clock(Arc::new(FixedClock(day(2024, 6, 1))))
    }

    #[test]
    fn test_before_now_uses_injected_clock() {
        let caps = caps();
        let inputs = Params::new();
        let ctx = RuleContext::new("t", "start", &inputs, &caps);
        let rule = before_now();

        assert!(rule(&Value::Timestamp(day(2024, 1, 1)), &ctx).is_ok());
        assert!(rule(&Value::Timestamp(day(2024, 6, 1)), &ctx).is_ok());
        assert_eq!(
            rule(&Value::Timestamp(day(2024, 7, 1)), &ctx)
                .unwrap_err()
                .to_string(),
            "Date must be before now"
        );
    }

    #[test]
    fn test_after_sibling() {
        let caps = caps();
        let mut inputs = Params::new();
        inputs.insert("start".into(), Value::Timestamp(day(2024, 1, 10)));
        let ctx = RuleContext::new("t", "end", &inputs, &caps);
        let rule = after_field("start");

        assert!(rule(&Value::Timestamp(day(2024, 2, 1)), &ctx).is_ok());
        assert_eq!(
            rule(&Value::Timestamp(day(2024, 1, 1)), &ctx)
                .unwrap_err()
                .to_string(),
            "Date must be after start"
        );
    }

    #[test]
    fn test_missing_or_unconverted_sibling_skips() {
        let caps = caps();
        let rule = after_field("start");

        let inputs = Params::new();
        let ctx = RuleContext::new("t", "end", &inputs, &caps);
        assert!(rule(&Value::Timestamp(day(2000, 1, 1)), &ctx).is_ok());

        let mut inputs = Params::new();
        inputs.insert("start".into(), Value::from("not-a-date"));
        let ctx = RuleContext::new("t", "end", &inputs, &caps);
        assert!(rule(&Value::Timestamp(day(2000, 1, 1)), &ctx).is_ok());
    }

    #[test]
    fn test_fixed_anchor() {
        let caps = caps();
        let inputs = Params::new();
        let ctx = RuleContext::new("t", "d", &inputs, &caps);
        let anchor = DateAnchor::Fixed(day(2020, 1, 1));

        assert!(compare(&ctx, day(2019, 1, 1), DateOrder::Before, anchor).is_ok());
        assert_eq!(
            compare(&ctx, day(2021, 1, 1), DateOrder::Before, anchor)
                .unwrap_err()
                .to_string(),
            "Date must be before 2020-01-01T00:00:00"
        );
    }

    #[test]
    fn test_non_timestamp_value_is_shape_error() {
        let caps = caps();
        let inputs = Params::new();
        let ctx = RuleContext::new("t", "d", &inputs, &caps);
        let err = before_now()(&Value::from("2024"), &ctx).unwrap_err();
        assert!(matches!(err, RuleError::Shape { .. }));
    }
}
