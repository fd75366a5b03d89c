//! Account forms: login, sign-up, profile edit

use std::sync::{Arc, OnceLock};

use super::enums::{SELF_SERVICE_USER_TYPES, USER_TYPE};
use super::{cached, FormDefinition};
use crate::schema::{DefinitionResult, Expect, FieldDescriptor, RuleError, SchemaDef};
use crate::validators::records::{unique_in, Exclude};
use crate::validators::{bounds, format};

pub fn login() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        SchemaDef::builder("login")
            .field("password", FieldDescriptor::string())
            .field(
                "email",
                FieldDescriptor::string().rule("format", |v, _| format::email(v.text()?)),
            )
            .build()
    })
}

pub fn create_user() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, build_create_user)
}

fn build_create_user() -> DefinitionResult<Arc<SchemaDef>> {
    SchemaDef::builder("create_user")
        .field(
            "name",
            FieldDescriptor::string()
                .rule("lower_case", |v, _| format::username(v.text()?))
                .rule("bigger", |v, _| bounds::min_len("user name", v.text()?, 5)),
        )
        .field(
            "password",
            FieldDescriptor::string()
                .rule("strong_pass", |v, _| format::strong_password(v.text()?))
                .rule("bigger", |v, _| bounds::min_len("password", v.text()?, 8))
                .rule("smaller", |v, _| bounds::max_len("password", v.text()?, 32)),
        )
        .field(
            "email",
            FieldDescriptor::string()
                .rule("format", |v, _| format::email(v.text()?))
                .rule("unique", unique_in("users", "email", Exclude::Nothing)),
        )
        .field(
            "user_type",
            FieldDescriptor::enumeration(USER_TYPE).rule("in", |v, _| {
                let member = v.as_enum().ok_or(RuleError::Shape {
                    expected: "UserType",
                    actual: v.type_name(),
                })?;
                format::is_in(&member.variant.as_str(), SELF_SERVICE_USER_TYPES)
            }),
        )
        .build()
}

/// Sign-up form with every field optional. The e-mail must stay unique
/// among other users; the user type cannot be changed.
pub fn edit_user() -> FormDefinition {
    static DEF: OnceLock<FormDefinition> = OnceLock::new();
    cached(&DEF, || {
        create_user()?
            .derive("edit_user")
            .modify_all(|_, field| {
                field.set_optional(true);
            })
            .modify("email", |field| {
                field.set_rule("unique", unique_in("users", "email", Exclude::CurrentIdentity));
            })
            .modify("user_type", |field| {
                field.set_ignore(true);
            })
            .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{Authenticated, Capabilities};
    use crate::schema::{rule_names, Schema};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn caps() -> Capabilities {
        let store = MemoryStore::from_json(json!({
            "users": [{"id": 1, "email": "ali@mail.com", "name": "alireza"}]
        }))
        .unwrap();
        Capabilities::new(Arc::new(store))
    }

    #[test]
    fn test_forms_build() {
        assert!(login().is_ok());
        assert!(create_user().is_ok());
        assert!(edit_user().is_ok());
    }

    #[test]
    fn test_create_user_happy_path() {
        let doc = json!({
            "name": "sara_k",
            "password": "Secr3t!pass",
            "email": "sara@mail.com",
            "user_type": "employer"
        });
        let mut schema = Schema::from_json(create_user().unwrap(), doc, caps()).unwrap();
        let out = schema.validate().unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out["user_type"].as_enum().unwrap().variant, "employer");
    }

    #[test]
    fn test_admin_cannot_self_register() {
        let doc = json!({
            "name": "sara_k",
            "password": "Secr3t!pass",
            "email": "sara@mail.com",
            "user_type": "admin"
        });
        let mut schema = Schema::from_json(create_user().unwrap(), doc, caps()).unwrap();
        let failure = schema.validate().unwrap_err();
        assert_eq!(
            failure.errors()["user_type"].rule("in"),
            Some("Invalid argument. Must be one of the [manager, employer]")
        );
    }

    #[test]
    fn test_unknown_user_type_is_type_error() {
        let doc = json!({"user_type": "guest"});
        let mut schema = Schema::from_json(create_user().unwrap(), doc, caps()).unwrap();
        schema.check().unwrap();
        assert_eq!(
            schema.error_bag()["user_type"].rule(rule_names::TYPE),
            Some("Invalid type: expected UserType, got string")
        );
    }

    #[test]
    fn test_edit_user_keeps_own_email() {
        let me = caps().with_identity(Arc::new(Authenticated(1)));
        let doc = json!({"email": "ali@mail.com", "user_type": "admin"});
        let mut schema = Schema::from_json(edit_user().unwrap(), doc, me).unwrap();
        let out = schema.validate().unwrap();
        assert_eq!(out.len(), 1);
        assert!(!out.contains_key("user_type"));

        let someone_else = caps().with_identity(Arc::new(Authenticated(2)));
        let doc = json!({"email": "ali@mail.com"});
        let mut schema = Schema::from_json(edit_user().unwrap(), doc, someone_else).unwrap();
        let failure = schema.validate().unwrap_err();
        assert!(failure.errors()["email"].rule("unique").is_some());
    }

    #[test]
    fn test_create_user_email_taken() {
        let doc = json!({"email": "ali@mail.com"});
        let mut schema = Schema::from_json(create_user().unwrap(), doc, caps()).unwrap();
        schema.check().unwrap();
        assert_eq!(
            schema.error_bag()["email"].rule("unique"),
            Some("The value ali@mail.com exists in the column 'email' of table 'users'")
        );
    }
}
