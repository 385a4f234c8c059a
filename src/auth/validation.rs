//! Local checks on the registration form before it reaches the backend.

use crate::models::{RegisterRequest, UserRole};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password does not meet the requirements")]
    WeakPassword(PasswordRequirements),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please select an organization")]
    MissingOrganization,
    #[error("Please enter your first and last name")]
    MissingName,
}

/// Which password rules are satisfied. Rendered as a checklist while typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordRequirements {
    pub min_length: bool,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_digit: bool,
}

impl PasswordRequirements {
    pub fn check(password: &str) -> Self {
        Self {
            min_length: password.chars().count() >= MIN_PASSWORD_LENGTH,
            has_uppercase: password.chars().any(|c| c.is_uppercase()),
            has_lowercase: password.chars().any(|c| c.is_lowercase()),
            has_digit: password.chars().any(|c| c.is_ascii_digit()),
        }
    }

    pub fn all_met(&self) -> bool {
        self.min_length && self.has_uppercase && self.has_lowercase && self.has_digit
    }
}

/// What the user typed on the sign-up screen.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    /// Defaults to `SALES_AGENT` when unset.
    pub role: Option<UserRole>,
    pub organization_id: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        let email = self.email.trim();
        if !looks_like_email(email) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        let requirements = PasswordRequirements::check(&self.password);
        if !requirements.all_met() {
            return Err(ValidationError::WeakPassword(requirements));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        let organization_id = self.organization_id.trim();
        if organization_id.is_empty() {
            return Err(ValidationError::MissingOrganization);
        }

        Ok(RegisterRequest {
            email: email.to_string(),
            password: self.password.clone(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role.unwrap_or(UserRole::SalesAgent).as_str().to_string(),
            organization_id: organization_id.to_string(),
        })
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && domain.contains('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}
