//! Value converters
//!
//! Pre-converters run before the type check and return the (possibly
//! unchanged) value; a value they do not understand is passed through so
//! the type check reports it. Post-converters run after the rules and may
//! return `None` to drop the field.
//!
//! Every converter is idempotent on its own output, so re-checking an
//! instance whose inputs were already rewritten yields the same result.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::schema::{ConversionError, EnumSpec};
use crate::value::Value;

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn is_ascii_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// `"42"` → `Int(42)`. Anything else is returned unchanged.
pub fn parse_int(value: Value) -> Value {
    match value {
        Value::String(text) if is_ascii_digits(&text) => match text.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::String(text),
        },
        other => other,
    }
}

/// `"4.25"` → `Float(4.25)`. Anything else is returned unchanged.
pub fn parse_float(value: Value) -> Value {
    match value {
        Value::String(text) => {
            let looks_float = text
                .split_once('.')
                .map(|(whole, frac)| is_ascii_digits(whole) && is_ascii_digits(frac))
                .unwrap_or(false);
            match (looks_float, text.parse::<f64>()) {
                (true, Ok(n)) => Value::Float(n),
                _ => Value::String(text),
            }
        }
        other => other,
    }
}

/// Variant name → enum member of `spec`. Unknown names are unchanged.
pub fn enum_by_name(spec: EnumSpec, value: Value) -> Value {
    match value {
        Value::String(text) => match spec.member(&text) {
            Some(member) => Value::Enum(member),
            None => Value::String(text),
        },
        other => other,
    }
}

/// Applies `f` to string values, passing everything else through.
pub fn map_text<F>(value: Value, f: F) -> Value
where
    F: FnOnce(&str) -> String,
{
    match value {
        Value::String(text) => Value::String(f(&text)),
        other => other,
    }
}

/// Replaces Arabic code points with their Persian equivalents.
pub fn normalize_persian(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{064A}' | '\u{0649}' => '\u{06CC}', // ي ى → ی
            '\u{0643}' => '\u{06A9}',              // ك → ک
            '\u{0660}'..='\u{0669}' => {
                // Arabic-Indic → Extended Arabic-Indic digits
                char::from_u32(c as u32 - 0x0660 + 0x06F0).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Removes `( ... )` segments and collapses the remaining whitespace.
pub fn strip_parenthesized(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Names shorter than this get a prefix or suffix.
pub const SHORT_NAME_LEN: usize = 4;

/// Prepends `prefix` to a non-empty name shorter than [`SHORT_NAME_LEN`].
pub fn prefix_short_name(text: &str, prefix: &str) -> String {
    let len = text.chars().count();
    if len > 0 && len < SHORT_NAME_LEN {
        format!("{}{}", prefix, text)
    } else {
        text.to_string()
    }
}

/// Appends `suffix` to a non-empty name shorter than [`SHORT_NAME_LEN`].
pub fn suffix_short_name(text: &str, suffix: &str) -> String {
    let len = text.chars().count();
    if len > 0 && len < SHORT_NAME_LEN {
        format!("{}{}", text, suffix)
    } else {
        text.to_string()
    }
}

/// Drops a leading `http://` or `https://`.
pub fn strip_scheme(text: &str) -> String {
    text.strip_prefix("http://")
        .or_else(|| text.strip_prefix("https://"))
        .unwrap_or(text)
        .to_string()
}

/// Numeric value or numeric text → `Float` rounded to `places` decimals.
pub fn round_float(value: Value, places: u32) -> Result<Value, ConversionError> {
    let n = match &value {
        Value::Float(n) => *n,
        Value::Int(n) => *n as f64,
        Value::String(text) => text.trim().parse::<f64>().map_err(|_| {
            ConversionError::new(format!("could not convert '{}' to a number", text))
        })?,
        _ => return Ok(value),
    };
    let scale = 10f64.powi(places as i32);
    Ok(Value::Float((n * scale).round() / scale))
}

/// Company size aliases accepted on input.
pub const SIZE_ALIASES: &[(&str, &str)] = &[("VS", "XS"), ("VL", "XL")];

/// Size text (case-insensitive, aliases allowed) → member of `spec`.
pub fn company_size(spec: EnumSpec, value: Value) -> Value {
    let value = map_text(value, |text| {
        let upper = text.trim().to_uppercase();
        SIZE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or(upper)
    });
    enum_by_name(spec, value)
}

/// Digit text with leading zeros stripped (`"0021"` → `"21"`).
pub fn canonical_int_text(value: Value) -> Result<Option<Value>, ConversionError> {
    match value {
        Value::String(text) if is_ascii_digits(&text) => {
            let trimmed = text.trim_start_matches('0');
            let canonical = if trimmed.is_empty() { "0" } else { trimmed };
            Ok(Some(Value::from(canonical)))
        }
        Value::String(text) => Err(ConversionError::new(format!(
            "'{}' is not an integer",
            text
        ))),
        other => Ok(Some(other)),
    }
}

/// Blank text means "not provided".
pub fn blank_to_absent(value: Value) -> Result<Option<Value>, ConversionError> {
    match value {
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::Null => Ok(None),
        other => Ok(Some(other)),
    }
}

/// Parses date text with a strftime-style format. Date-only formats yield
/// midnight.
pub fn parse_date_text(text: &str, format: &str) -> Result<NaiveDateTime, ConversionError> {
    NaiveDateTime::parse_from_str(text, format)
        .or_else(|_| NaiveDate::parse_from_str(text, format).map(start_of_day))
        .map_err(|_| ConversionError::new(format!("Invalid format. Expected {}", format)))
}

/// Pre-converter builder: date text → `Timestamp`.
///
/// Timestamps pass unchanged; non-string values are left for the type
/// check.
pub fn parse_date(
    format: &'static str,
) -> impl Fn(Value) -> Result<Value, ConversionError> + Send + Sync + 'static {
    move |value| match value {
        Value::String(text) => parse_date_text(&text, format).map(Value::Timestamp),
        other => Ok(other),
    }
}

/// Unix seconds → `Timestamp` (UTC).
pub fn epoch_to_timestamp(value: Value) -> Result<Value, ConversionError> {
    match value {
        Value::Int(secs) => DateTime::<Utc>::from_timestamp(secs, 0)
            .map(|dt| Value::Timestamp(dt.naive_utc()))
            .ok_or_else(|| ConversionError::new(format!("{} is out of range", secs))),
        other => Ok(other),
    }
}

/// Year (integer or digit text) → January 1st of that year.
pub fn year_to_timestamp(value: Value) -> Result<Value, ConversionError> {
    let year = match &value {
        Value::Int(year) => *year,
        Value::String(text) if is_ascii_digits(text) => text
            .parse::<i64>()
            .map_err(|_| ConversionError::new(format!("'{}' is not a year", text)))?,
        _ => return Ok(value),
    };
    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
        .map(|date| Value::Timestamp(start_of_day(date)))
        .ok_or_else(|| ConversionError::new(format!("{} is not a valid year", year)))
}
