//! Field-level input validation.
//!
//! Every rule for a request is evaluated before anything is reported, so a
//! client gets all of its field errors in one response.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

pub const ADMIN_NAME_MAX: usize = 100;
pub const USERNAME_MAX: usize = 255;
pub const PASSWORD_MIN: usize = 6;

static EMAIL_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// `Ok(())` when no rule failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn required(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.add(field, format!("The {field} field is required."));
            return false;
        }
        true
    }

    pub fn max_chars(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(
                field,
                format!("The {field} may not be greater than {max} characters."),
            );
        }
    }

    pub fn min_chars(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.add(field, format!("The {field} must be at least {min} characters."));
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.add(field, format!("The {field} must be a valid email address."));
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@example.org"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_collects_every_failure() {
        let mut errors = FieldErrors::new();
        errors.required("name", "   ");
        errors.email("email", "nope");
        errors.min_chars("password", "123", PASSWORD_MIN);
        errors.add("password", "The password confirmation does not match.");

        assert_eq!(errors.get("name").unwrap().len(), 1);
        assert_eq!(errors.get("email").unwrap().len(), 1);
        assert_eq!(errors.get("password").unwrap().len(), 2);
        assert!(errors.clone().into_result().is_err());
    }

    #[test]
    fn test_max_chars_counts_characters() {
        let mut errors = FieldErrors::new();
        errors.max_chars("name", &"é".repeat(ADMIN_NAME_MAX), ADMIN_NAME_MAX);
        assert!(errors.is_empty());

        errors.max_chars("name", &"é".repeat(ADMIN_NAME_MAX + 1), ADMIN_NAME_MAX);
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_serializes_as_map() {
        let errors = FieldErrors::single("email", "taken");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "email": ["taken"] }));
    }
}
