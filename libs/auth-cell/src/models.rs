use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;
use shared_utils::validation::{trimmed_within, validate_email};

const MAX_NAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration fields after trimming and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFormError {
    #[error("Name must be between 1 and 50 characters")]
    InvalidName,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must be at least 8 characters")]
    PasswordTooShort,

    #[error("Password is required")]
    MissingPassword,
}

impl From<AuthFormError> for AppError {
    fn from(err: AuthFormError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<Registration, AuthFormError> {
        let name = trimmed_within(&self.name, 1, MAX_NAME_LEN).ok_or(AuthFormError::InvalidName)?;
        let email = checked_email(&self.email)?;

        let password = self.password.trim();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthFormError::PasswordTooShort);
        }

        Ok(Registration {
            name: name.to_string(),
            email,
            password: password.to_string(),
        })
    }
}

impl LoginRequest {
    /// Returns the trimmed email. The password is passed through untouched.
    pub fn validate(&self) -> Result<String, AuthFormError> {
        let email = checked_email(&self.email)?;

        if self.password.is_empty() {
            return Err(AuthFormError::MissingPassword);
        }

        Ok(email)
    }
}

fn checked_email(raw: &str) -> Result<String, AuthFormError> {
    let email = raw.trim();
    if !validate_email(email) {
        return Err(AuthFormError::InvalidEmail);
    }
    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn registration_is_trimmed() {
        let valid = register("  Maria Silva ", " maria@example.com ", " s3cretpass ")
            .validate()
            .unwrap();

        assert_eq!(valid.name, "Maria Silva");
        assert_eq!(valid.email, "maria@example.com");
        assert_eq!(valid.password, "s3cretpass");
    }

    #[test]
    fn registration_field_rules() {
        assert_eq!(
            register("   ", "maria@example.com", "s3cretpass").validate(),
            Err(AuthFormError::InvalidName)
        );
        assert_eq!(
            register(&"a".repeat(51), "maria@example.com", "s3cretpass").validate(),
            Err(AuthFormError::InvalidName)
        );
        assert_eq!(
            register("Maria", "maria.example.com", "s3cretpass").validate(),
            Err(AuthFormError::InvalidEmail)
        );
        assert_eq!(
            register("Maria", "maria@example.com", "  short  ").validate(),
            Err(AuthFormError::PasswordTooShort)
        );
    }

    #[test]
    fn login_requires_password() {
        let login = LoginRequest {
            email: "maria@example.com".to_string(),
            password: String::new(),
        };

        assert_eq!(login.validate(), Err(AuthFormError::MissingPassword));
    }
}
