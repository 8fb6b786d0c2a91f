use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{FieldErrors, ServiceError};

use super::is_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// 注册请求
#[derive(Debug, Default, Deserialize)]
pub struct NewUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

/// 校验通过的注册信息
#[derive(Debug)]
pub struct ValidUser {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(self) -> Result<ValidUser, ServiceError> {
        let mut errors = FieldErrors::new();

        let email = self.email.unwrap_or_default().trim().to_lowercase();
        if !looks_like_email(&email) {
            errors.push("email", "must be a valid email address");
        }

        let username = self.username.unwrap_or_default().trim().to_string();
        if !(3..=32).contains(&username.chars().count())
            || !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            errors.push(
                "username",
                "must be 3-32 characters of letters, digits or underscores",
            );
        }

        if is_blank(self.full_name.as_deref()) {
            errors.push("full_name", "must not be empty");
        }

        let password = self.password.unwrap_or_default();
        if password.chars().count() < 6 {
            errors.push("password", "must be at least 6 characters");
        }

        errors.into_result()?;
        Ok(ValidUser {
            email,
            username,
            full_name: self.full_name.unwrap_or_default().trim().to_string(),
            password,
        })
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_invalid_field() {
        let err = NewUser {
            email: Some("not-an-email".into()),
            username: Some("a b".into()),
            full_name: None,
            password: Some("123".into()),
        }
        .validate()
        .unwrap_err();

        match err {
            ServiceError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field).collect();
                assert_eq!(names, ["email", "username", "full_name", "password"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn normalizes_email() {
        let user = NewUser {
            email: Some("  Ann@Example.COM ".into()),
            username: Some("ann_1".into()),
            full_name: Some("Ann".into()),
            password: Some("secret1".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(user.email, "ann@example.com");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.io".into(),
            username: "ann".into(),
            full_name: "Ann".into(),
            password_hash: "$2b$04$secret".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "ann");
    }
}
