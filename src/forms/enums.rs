//! Enumerations used by the forms

use crate::converters;
use crate::schema::EnumSpec;
use crate::value::Value;

pub const USER_TYPE: EnumSpec = EnumSpec::new("UserType", &["admin", "manager", "employer"]);

/// User types that may be chosen at sign-up.
pub const SELF_SERVICE_USER_TYPES: &[&str] = &["manager", "employer"];

pub const FEEDBACK_TYPE: EnumSpec = EnumSpec::new("FeedbackType", &["review", "interview"]);

pub const INTERVIEW_RESULT: EnumSpec =
    EnumSpec::new("InterviewResult", &["accepted", "rejected", "pending"]);

pub const COMPANY_SIZE: EnumSpec = EnumSpec::new("CompanySize", &["XS", "S", "M", "L", "XL"]);

/// Feedback type from a route segment (`reviews`, `interviews`) or a
/// variant name.
pub fn feedback_type(value: Value) -> Value {
    let value = converters::map_text(value, |text| match text {
        "reviews" => "review".to_string(),
        "interviews" => "interview".to_string(),
        other => other.to_string(),
    });
    converters::enum_by_name(FEEDBACK_TYPE, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_type_route_names() {
        let review = feedback_type(Value::from("reviews"));
        assert!(FEEDBACK_TYPE.contains(review.as_enum().unwrap()));
        assert_eq!(review.as_enum().unwrap().variant, "review");

        let interview = feedback_type(Value::from("interview"));
        assert_eq!(interview.as_enum().unwrap().variant, "interview");

        assert_eq!(feedback_type(Value::from("chats")), Value::from("chats"));
        assert_eq!(feedback_type(review.clone()), review);
    }

    #[test]
    fn test_self_service_types_are_members() {
        for variant in SELF_SERVICE_USER_TYPES {
            assert!(USER_TYPE.member(variant).is_some());
        }
    }
}
