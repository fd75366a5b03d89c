//! Text format checks

use std::fmt::Display;

use chrono::{NaiveDate, NaiveDateTime};

use super::{require, Pattern};
use crate::schema::{RuleError, RuleResult};

static EMAIL: Pattern = Pattern::new(r"^([a-z1-9]+_?\.?[a-z1-9]+)@([a-z_-]{3,})\.([a-z]{2,6})$");
static WEBSITE: Pattern = Pattern::new(r"^(www\.)?[a-z0-9_]{3,}\.[a-z]{2,6}$");
static FA_TEXT: Pattern = Pattern::new(r"^[۰-۹آ-ی\s0-9]+$");
static FA_TEXT_PUNCT: Pattern = Pattern::new(r"^[۰-۹آ-ی\s0-9.,:;!?()\-،؛؟«»]+$");
static EN_TEXT: Pattern = Pattern::new(r"^[A-Za-z\s0-9\-.]+$");
static EN_COMPANY_NAME: Pattern = Pattern::new(r"^[A-Za-z\s0-9\-.,&'()]+$");
static DIRNAME: Pattern = Pattern::new(r"^[a-z0-9_\-]+$");
static USERNAME: Pattern = Pattern::new(r"^[a-z0-9]+_?[a-z0-9]+$");
static INT_TEXT: Pattern = Pattern::new(r"^[0-9]+$");
static FLOAT_TEXT: Pattern = Pattern::new(r"^[0-9]*\.[0-9]+$");
static IR_MOBILE: Pattern = Pattern::new(r"^09[0-9]{9}$");

/// Characters accepted as "special" by [`strong_password`].
pub const PASSWORD_SPECIALS: &str = "#@_%?*!";

pub fn email(text: &str) -> RuleResult {
    require(&EMAIL, text, "Invalid email address")
}

pub fn website(text: &str) -> RuleResult {
    require(&WEBSITE, text, "Invalid website address")
}

/// Persian letters, digits and spaces.
pub fn fa_text(text: &str) -> RuleResult {
    require(
        &FA_TEXT,
        text,
        "Text must only contain farsi letters, digits, space and english digits",
    )
}

/// Persian text that may also carry punctuation.
pub fn fa_text_with_punctuation(text: &str) -> RuleResult {
    require(
        &FA_TEXT_PUNCT,
        text,
        "Text must only contain farsi letters, digits, space and punctuation",
    )
}

pub fn en_text(text: &str) -> RuleResult {
    require(
        &EN_TEXT,
        text,
        "Text must only contain english letters, digits, space and dash",
    )
}

pub fn en_company_name(text: &str) -> RuleResult {
    require(
        &EN_COMPANY_NAME,
        text,
        "Company name must only contain english letters, digits, space and punctuation",
    )
}

pub fn dirname(text: &str) -> RuleResult {
    require(
        &DIRNAME,
        text,
        "Directory name must only contain lower case english letters, digits, dash and underline",
    )
}

pub fn username(text: &str) -> RuleResult {
    require(
        &USERNAME,
        text,
        "User name must only contain lower case letters, numbers and underline",
    )
}

pub fn int_text(text: &str) -> RuleResult {
    require(&INT_TEXT, text, "Text must only contain integers")
}

pub fn float_text(text: &str) -> RuleResult {
    require(&FLOAT_TEXT, text, "Text must only contain floating point numbers")
}

pub fn ir_mobile(text: &str) -> RuleResult {
    require(
        &IR_MOBILE,
        text,
        "Invalid mobile number format. Correct format must be: 09XXXXXXXXX",
    )
}

/// At least eight characters from letters, digits and
/// [`PASSWORD_SPECIALS`], with one of each class.
pub fn strong_password(text: &str) -> RuleResult {
    let allowed = text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let strong = allowed
        && text.chars().count() >= 8
        && text.chars().any(|c| c.is_ascii_uppercase())
        && text.chars().any(|c| c.is_ascii_lowercase())
        && text.chars().any(|c| c.is_ascii_digit())
        && text.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if strong {
        Ok(())
    } else {
        Err(RuleError::violation(format!(
            "The password must contain at least one lower and upper case, digit and special characters({})",
            PASSWORD_SPECIALS
        )))
    }
}

/// Checks that `text` parses with the strftime-style `format`.
///
/// Date-only formats are accepted as well as full date-time formats.
pub fn date_format(text: &str, format: &str) -> RuleResult {
    let parses = NaiveDateTime::parse_from_str(text, format).is_ok()
        || NaiveDate::parse_from_str(text, format).is_ok();
    if parses {
        Ok(())
    } else {
        Err(RuleError::violation(format!(
            "Invalid format. Expected {}",
            format
        )))
    }
}

/// Membership in a fixed list.
pub fn is_in<T>(value: &T, allowed: &[T]) -> RuleResult
where
    T: PartialEq + Display,
{
    if allowed.contains(value) {
        return Ok(());
    }
    let listed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
    Err(RuleError::violation(format!(
        "Invalid argument. Must be one of the [{}]",
        listed.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(email("ali.reza@mail.com").is_ok());
        assert!(email("ali_reza@company.org").is_ok());
        assert!(email("Ali@mail.com").is_err());
        assert!(email("ali@ma.com").is_err());
        assert_eq!(email("nope").unwrap_err().to_string(), "Invalid email address");
    }

    #[test]
    fn test_website() {
        assert!(website("www.example.com").is_ok());
        assert!(website("digikala.ir").is_ok());
        assert!(website("http://example.com").is_err());
        assert!(website("ab.com").is_err());
    }

    #[test]
    fn test_persian_text() {
        assert!(fa_text("شرکت نمونه ۱۲").is_ok());
        assert!(fa_text("Sample").is_err());
        assert!(fa_text("شرکت، نمونه").is_err());
        assert!(fa_text_with_punctuation("شرکت، نمونه (تهران)").is_ok());
    }

    #[test]
    fn test_latin_text() {
        assert!(en_text("Snapp Box-2.0").is_ok());
        assert!(en_text("Snapp&Co").is_err());
        assert!(en_company_name("Snapp & Co.").is_ok());
        assert!(en_company_name("اسنپ").is_err());
        assert!(dirname("snapp_box-1").is_ok());
        assert!(dirname("Snapp").is_err());
    }

    #[test]
    fn test_username() {
        assert!(username("ali_r2").is_ok());
        assert!(username("Ali").is_err());
        assert!(username("a__b").is_err());
    }

    #[test]
    fn test_numeric_text() {
        assert!(int_text("02188").is_ok());
        assert!(int_text("12.5").is_err());
        assert!(float_text("12.5").is_ok());
        assert!(float_text(".5").is_ok());
        assert!(float_text("12").is_err());
    }

    #[test]
    fn test_ir_mobile() {
        assert!(ir_mobile("09121234567").is_ok());
        assert!(ir_mobile("9121234567").is_err());
        assert!(ir_mobile("091212345678").is_err());
    }

    #[test]
    fn test_strong_password() {
        assert!(strong_password("Abcdef1!").is_ok());
        assert!(strong_password("abcdef1!").is_err());
        assert!(strong_password("Abcdefg!").is_err());
        assert!(strong_password("Abc1!").is_err());
        assert!(strong_password("Abcdef1!$").is_err());
        assert!(strong_password("abc")
            .unwrap_err()
            .to_string()
            .contains("(#@_%?*!)"));
    }

    #[test]
    fn test_date_format() {
        assert!(date_format("10-01-2024", "%d-%m-%Y").is_ok());
        assert!(date_format("2024-01-10", "%d-%m-%Y").is_err());
        assert_eq!(
            date_format("x", "%d-%m-%Y").unwrap_err().to_string(),
            "Invalid format. Expected %d-%m-%Y"
        );
    }

    #[test]
    fn test_is_in() {
        assert!(is_in(&"daily", &["daily", "weekly"]).is_ok());
        assert_eq!(
            is_in(&"yearly", &["daily", "weekly"]).unwrap_err().to_string(),
            "Invalid argument. Must be one of the [daily, weekly]"
        );
    }
}
