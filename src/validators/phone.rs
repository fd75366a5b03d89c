//! Landline phone checks

use super::bounds;
use super::format;
use crate::schema::{RuleError, RuleResult};

/// Shortest accepted phone number.
pub const MIN_DIGITS: usize = 4;
/// Longest accepted phone number.
pub const MAX_DIGITS: usize = 15;

pub fn digits_only(text: &str) -> RuleResult {
    format::int_text(text)
}

pub fn length(text: &str) -> RuleResult {
    bounds::len_between("Phone", text, MIN_DIGITS, MAX_DIGITS)
}

pub fn no_leading_zero(text: &str) -> RuleResult {
    if text.starts_with('0') {
        return Err(RuleError::violation("Phone number must not start with zero"));
    }
    Ok(())
}
