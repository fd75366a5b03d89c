//! Reusable rule vocabulary
//!
//! Predicates return `Ok(())` on success or a [`RuleError`] carrying the
//! human-readable message. Text and number checks are plain functions over
//! the already type-checked value; checks that need the rule context
//! (record store, clock, sibling fields) also come as rule builders that
//! capture their parameters.
//!
//! ```ignore
//! FieldDescriptor::string()
//!     .rule("format", |v, _| format::email(v.text()?))
//!     .rule("unique", records::unique_in("users", "email", Exclude::Nothing))
//! ```
//!
//! [`RuleError`]: crate::schema::RuleError

pub mod bounds;
pub mod dates;
pub mod format;
pub mod phone;
pub mod records;

use std::sync::OnceLock;

use regex::Regex;

use crate::schema::RuleError;

/// A lazily compiled, process-wide regular expression.
pub(crate) struct Pattern {
    source: &'static str,
    compiled: OnceLock<Result<Regex, regex::Error>>,
}

impl Pattern {
    pub(crate) const fn new(source: &'static str) -> Self {
        Self {
            source,
            compiled: OnceLock::new(),
        }
    }

    /// Matches `text`. A pattern that fails to compile is reported as a rule
    /// error instead of a panic.
    pub(crate) fn is_match(&self, text: &str) -> Result<bool, RuleError> {
        match self.compiled.get_or_init(|| Regex::new(self.source)) {
            Ok(regex) => Ok(regex.is_match(text)),
            Err(err) => Err(RuleError::violation(format!(
                "Invalid pattern {}: {}",
                self.source, err
            ))),
        }
    }
}

/// Fails with `message` unless `pattern` matches `text`.
pub(crate) fn require(pattern: &Pattern, text: &str, message: &str) -> Result<(), RuleError> {
    if pattern.is_match(text)? {
        Ok(())
    } else {
        Err(RuleError::violation(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DIGITS: Pattern = Pattern::new(r"^[0-9]+$");
    static BROKEN: Pattern = Pattern::new(r"^[0-9+$");

    #[test]
    fn test_pattern_compiles_once_and_matches() {
        assert!(DIGITS.is_match("123").unwrap());
        assert!(!DIGITS.is_match("12a").unwrap());
        assert!(require(&DIGITS, "9", "digits only").is_ok());
        assert_eq!(
            require(&DIGITS, "x", "digits only").unwrap_err().to_string(),
            "digits only"
        );
    }

    #[test]
    fn test_broken_pattern_is_rule_error() {
        let err = BROKEN.is_match("1").unwrap_err();
        assert!(err.to_string().starts_with("Invalid pattern"));
    }
}
