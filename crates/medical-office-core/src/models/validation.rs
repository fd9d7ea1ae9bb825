//! Field and record validation.
//!
//! Validation runs in two passes. Per-field rules (required, length, range,
//! pattern) always run and every failure is collected. Cross-field rules only
//! run once every per-field rule has passed, and are reported against the
//! field they concern when there is one, otherwise against the whole record.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single failed rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    /// Field the rule is attributed to; `None` for whole-record errors
    pub field: Option<String>,
    /// Human-readable message
    pub message: String,
}

/// Every failed rule from one validation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors containing a single field-level failure.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a failure against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: Some(field.to_string()),
            message: message.into(),
        });
    }

    /// Record a failure against the whole record.
    pub fn add_record(&mut self, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: None,
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Errors attributed to `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors
            .iter()
            .filter(move |e| e.field.as_deref() == Some(field))
    }

    /// Number of errors attributed to `field`.
    pub fn count_for(&self, field: &str) -> usize {
        self.for_field(field).count()
    }

    /// Whole-record errors.
    pub fn record_errors(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter().filter(|e| e.field.is_none())
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .errors
            .iter()
            .map(|e| match &e.field {
                Some(field) => format!("{field}: {}", e.message),
                None => e.message.clone(),
            })
            .collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Ambient values cross-field rules may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    /// The current local date
    pub today: NaiveDate,
}

impl ValidationContext {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Context for the current local date.
    pub fn now() -> Self {
        Self {
            today: chrono::Local::now().date_naive(),
        }
    }
}

/// Two-pass validation.
pub trait Validate {
    /// Per-field rules. Must record every failure, never stop at the first.
    fn check_fields(&self, errors: &mut ValidationErrors);

    /// Cross-field rules. Only called when every per-field rule passed.
    fn check_record(&self, _ctx: &ValidationContext, _errors: &mut ValidationErrors) {}

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.check_fields(&mut errors);
        if errors.is_empty() {
            self.check_record(ctx, &mut errors);
        }
        errors.into_result()
    }
}

// =========================================================================
// Rule helpers
// =========================================================================

/// Required, trimmed, bounded text.
pub(crate) fn check_required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    max_len: usize,
    required_message: &str,
    length_message: &str,
) {
    if value.trim().is_empty() {
        errors.add(field, required_message);
    } else if value.chars().count() > max_len {
        errors.add(field, length_message);
    }
}

/// Optional bounded text.
pub(crate) fn check_optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max_len: usize,
    length_message: &str,
) {
    if let Some(value) = value {
        if value.chars().count() > max_len {
            errors.add(field, length_message);
        }
    }
}

/// Exactly ten ASCII digits.
pub fn is_ten_digits(value: &str) -> bool {
    value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Loose address shape check: one `@` with text on both sides and a dot in
/// the domain.
pub fn looks_like_email(value: &str) -> bool {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

/// Trimmed text, `None` when blank.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        a: String,
        b: String,
    }

    impl Validate for Pair {
        fn check_fields(&self, errors: &mut ValidationErrors) {
            check_required_text(errors, "A", &self.a, 5, "A required", "A too long");
            check_required_text(errors, "B", &self.b, 5, "B required", "B too long");
        }

        fn check_record(&self, _ctx: &ValidationContext, errors: &mut ValidationErrors) {
            if self.a == self.b {
                errors.add_record("A and B must differ");
            }
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn test_collects_all_field_errors() {
        let pair = Pair {
            a: "".into(),
            b: "toolongvalue".into(),
        };
        let errors = pair.validate(&ctx()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.count_for("A"), 1);
        assert_eq!(errors.count_for("B"), 1);
    }

    #[test]
    fn test_record_rules_skip_when_fields_fail() {
        let pair = Pair {
            a: "".into(),
            b: "".into(),
        };
        let errors = pair.validate(&ctx()).unwrap_err();
        assert_eq!(errors.record_errors().count(), 0);
    }

    #[test]
    fn test_record_rules_run_after_fields_pass() {
        let pair = Pair {
            a: "same".into(),
            b: "same".into(),
        };
        let errors = pair.validate(&ctx()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.record_errors().count(), 1);
    }

    #[test]
    fn test_ten_digits() {
        assert!(is_ten_digits("1231231234"));
        assert!(!is_ten_digits("123123123"));
        assert!(!is_ten_digits("12312312345"));
        assert!(!is_ten_digits("12312a1234"));
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("fflintstone@outlook.com"));
        assert!(!looks_like_email("fflintstone"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("a@@b.com"));
        assert!(!looks_like_email("a b@c.com"));
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(normalize_optional(Some(" x ".into())), Some("x".into()));
        assert_eq!(normalize_optional(None), None);
    }
}
