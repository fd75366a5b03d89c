//! Length and range checks
//!
//! `subject` names the thing being measured in the message
//! ("user name", "password", "score", ...).

use std::fmt::Display;

use crate::schema::{RuleError, RuleResult};
use crate::value::Value;

/// At least `min` characters.
pub fn min_len(subject: &str, text: &str, min: usize) -> RuleResult {
    if text.chars().count() < min {
        return Err(RuleError::violation(format!(
            "The length of {} must be bigger than {}",
            subject, min
        )));
    }
    Ok(())
}

/// At most `max` characters.
pub fn max_len(subject: &str, text: &str, max: usize) -> RuleResult {
    if text.chars().count() > max {
        return Err(RuleError::violation(format!(
            "The length of {} can't be bigger than {}",
            subject, max
        )));
    }
    Ok(())
}

/// Length within `min..=max` characters.
pub fn len_between(subject: &str, text: &str, min: usize, max: usize) -> RuleResult {
    let len = text.chars().count();
    if len < min || len > max {
        return Err(RuleError::violation(format!(
            "{} length must be between {} and {} chars",
            subject, min, max
        )));
    }
    Ok(())
}

/// The value's textual form has exactly `digits` characters.
pub fn digits_length(value: &Value, digits: usize) -> RuleResult {
    if value.to_string().chars().count() != digits {
        return Err(RuleError::violation(format!(
            "The number must have exactly {} digits",
            digits
        )));
    }
    Ok(())
}

/// Inclusive numeric range.
pub fn between<T>(subject: &str, n: T, min: T, max: T) -> RuleResult
where
    T: PartialOrd + Display,
{
    if n < min || n > max {
        return Err(RuleError::violation(format!(
            "The {} must be between {} and {}",
            subject, min, max
        )));
    }
    Ok(())
}

/// Inclusive numeric minimum.
pub fn at_least<T>(subject: &str, n: T, min: T) -> RuleResult
where
    T: PartialOrd + Display,
{
    if n < min {
        return Err(RuleError::violation(format!(
            "The {} must be at least {}",
            subject, min
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_lengths_count_unicode_scalars() {
        assert!(min_len("name", "شرکت", 4).is_ok());
        assert!(max_len("name", "شرکت", 4).is_ok());
        assert_eq!(
            min_len("user name", "ali", 5).unwrap_err().to_string(),
            "The length of user name must be bigger than 5"
        );
        assert_eq!(
            max_len("password", &"x".repeat(33), 32).unwrap_err().to_string(),
            "The length of password can't be bigger than 32"
        );
    }

    #[test]
    fn test_len_between() {
        assert!(len_between("Phone", "2188", 4, 15).is_ok());
        assert_eq!(
            len_between("Phone", "218", 4, 15).unwrap_err().to_string(),
            "Phone length must be between 4 and 15 chars"
        );
    }

    #[test]
    fn test_digits_length() {
        assert!(digits_length(&Value::from("10320894567"), 11).is_ok());
        assert!(digits_length(&Value::Int(12345), 5).is_ok());
        assert!(digits_length(&Value::Int(1234), 5).is_err());
    }

    #[test]
    fn test_numeric_ranges() {
        assert!(between("score", 0, 0, 10).is_ok());
        assert!(between("score", 10, 0, 10).is_ok());
        assert_eq!(
            between("score", 11, 0, 10).unwrap_err().to_string(),
            "The score must be between 0 and 10"
        );
        assert!(between("salary", 0.5, 1.0, 100.0).is_err());
        assert!(at_least("offset", 1, 1).is_ok());
        assert!(at_least("offset", 0, 1).is_err());
    }
}
