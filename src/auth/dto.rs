use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::auth::services::{is_valid_email, MIN_PASSWORD_LEN};
use crate::error::{AppError, FieldErrors};

const NAME_MAX_LEN: usize = 255;

/// Request body for account creation.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

impl SignupRequest {
    /// Normalises the email and reports every field problem at once.
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();

        let mut errors = FieldErrors::default();
        check_email(&self.email, &mut errors);
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
            );
        }
        if self.name.is_empty() {
            errors.add("name", "This field is required.");
        } else if self.name.chars().count() > NAME_MAX_LEN {
            errors.add(
                "name",
                format!("Ensure this field has no more than {NAME_MAX_LEN} characters."),
            );
        }
        errors.into_result()?;
        Ok(self)
    }
}

/// Request body for signin.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SigninRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.email = self.email.trim().to_lowercase();

        let mut errors = FieldErrors::default();
        check_email(&self.email, &mut errors);
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors.into_result()?;
        Ok(self)
    }
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.is_empty() {
        errors.add("email", "This field is required.");
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

/// Response returned after signup or signin.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_reports_all_missing_fields() {
        let req: SignupRequest = serde_json::from_str("{}").unwrap();
        match req.validate().unwrap_err() {
            AppError::Validation { fields, .. } => {
                assert!(fields.get("email").is_some());
                assert!(fields.get("password").is_some());
                assert!(fields.get("name").is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn signup_normalises_email() {
        let req = SignupRequest {
            email: "  Grace@Example.ORG ".into(),
            password: "hopper".into(),
            name: " Grace ".into(),
        };
        let ok = req.validate().expect("valid");
        assert_eq!(ok.email, "grace@example.org");
        assert_eq!(ok.name, "Grace");
    }

    #[test]
    fn password_of_exactly_six_chars_is_accepted() {
        let req = SignupRequest {
            email: "a@b.co".into(),
            password: "123456".into(),
            name: "A".into(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn signin_checks_email_shape() {
        let req = SigninRequest {
            email: "nope".into(),
            password: "x".into(),
        };
        assert!(matches!(req.validate(), Err(AppError::Validation { .. })));
    }

    #[test]
    fn auth_response_shape() {
        let response = AuthResponse {
            user: PublicUser {
                id: Uuid::new_v4(),
                email: "test@example.com".into(),
                name: "Test".into(),
            },
            token: "tok".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["user"]["email"], "test@example.com");
        assert_eq!(json["user"]["name"], "Test");
        assert_eq!(json["token"], "tok");
        assert!(json["user"].get("password_hash").is_none());
    }
}
