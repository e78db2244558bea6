use std::collections::BTreeMap;

use regex::Regex;

/// Field keys used in the sign-up error map, matching the form's input
/// names.
pub const USERNAME_FIELD: &str = "username-field";
pub const EMAIL_FIELD: &str = "email-field";
pub const PASSWORD_FIELD: &str = "password-field";
pub const CONFIRM_PASSWORD_FIELD: &str = "confirm-password-field";

pub const PASSWORD_MISMATCH_MESSAGE: &str = "Passwords do not match.";

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Data collected by the account-creation form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Validates the form, returning one message per offending field.
    ///
    /// An empty map means the form may be submitted; while any entry is
    /// present no account-creation request is issued.
    pub fn validate(&self) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();

        if self.username.trim().is_empty() {
            errors.insert(USERNAME_FIELD.into(), "Username is required.".into());
        }

        if self.email.trim().is_empty() {
            errors.insert(EMAIL_FIELD.into(), "Email is required.".into());
        } else if let Ok(pattern) = Regex::new(EMAIL_PATTERN)
            && !pattern.is_match(self.email.trim())
        {
            errors.insert(EMAIL_FIELD.into(), "Email address is not valid.".into());
        }

        if self.password.is_empty() {
            errors.insert(PASSWORD_FIELD.into(), "Password is required.".into());
        }

        if self.password != self.confirm_password {
            errors.insert(
                CONFIRM_PASSWORD_FIELD.into(),
                PASSWORD_MISMATCH_MESSAGE.into(),
            );
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SignupForm {
        SignupForm {
            username: "kermit".into(),
            email: "kermit@example.com".into(),
            password: "hunter2!".into(),
            confirm_password: "hunter2!".into(),
        }
    }

    #[test]
    fn well_formed_sign_up_passes() {
        assert!(form().validate().is_empty());
    }

    #[test]
    fn mismatched_passwords_yield_the_fixed_entry() {
        let mut bad = form();
        bad.confirm_password = "hunter3!".into();
        let errors = bad.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[CONFIRM_PASSWORD_FIELD], PASSWORD_MISMATCH_MESSAGE);
    }

    #[test]
    fn empty_fields_are_reported_individually() {
        let empty = SignupForm {
            username: String::new(),
            email: String::new(),
            password: String::new(),
            confirm_password: String::new(),
        };
        let errors = empty.validate();
        assert!(errors.contains_key(USERNAME_FIELD));
        assert!(errors.contains_key(EMAIL_FIELD));
        assert!(errors.contains_key(PASSWORD_FIELD));
        // Matching (empty) passwords are a missing-password problem, not a
        // mismatch.
        assert!(!errors.contains_key(CONFIRM_PASSWORD_FIELD));
    }

    #[test]
    fn email_shape_is_checked() {
        let mut bad = form();
        bad.email = "not-an-email".into();
        assert!(bad.validate().contains_key(EMAIL_FIELD));
        bad.email = "still@bad".into();
        assert!(bad.validate().contains_key(EMAIL_FIELD));
    }
}
