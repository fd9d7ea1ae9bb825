//! Doctor models.

use serde::{Deserialize, Serialize};

use super::audit::AuditInfo;
use super::validation::{check_optional_text, check_required_text, Validate, ValidationErrors};

/// Field names used in validation errors and forms.
pub mod fields {
    pub const FIRST_NAME: &str = "FirstName";
    pub const MIDDLE_NAME: &str = "MiddleName";
    pub const LAST_NAME: &str = "LastName";
    pub const SPECIALTIES: &str = "Specialties";
}

/// A doctor. Owns the patients assigned to them and their specialty links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    /// Row ID (0 until inserted)
    pub id: i64,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// Created/updated stamps
    pub audit: AuditInfo,
}

impl Doctor {
    /// Create a new, unsaved doctor.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            first_name: first_name.into(),
            middle_name: None,
            last_name: last_name.into(),
            audit: AuditInfo::default(),
        }
    }

    pub fn with_middle_name(mut self, middle_name: impl Into<String>) -> Self {
        self.middle_name = Some(middle_name.into());
        self
    }

    /// "Last, First M"
    pub fn formal_name(&self) -> String {
        formal_name(&self.first_name, self.middle_name.as_deref(), &self.last_name)
    }

    /// "First M Last"
    pub fn summary(&self) -> String {
        summary_name(&self.first_name, self.middle_name.as_deref(), &self.last_name)
    }
}

impl Validate for Doctor {
    fn check_fields(&self, errors: &mut ValidationErrors) {
        check_required_text(
            errors,
            fields::FIRST_NAME,
            &self.first_name,
            50,
            "You cannot leave the first name blank.",
            "First name cannot be more than 50 characters long.",
        );
        check_optional_text(
            errors,
            fields::MIDDLE_NAME,
            self.middle_name.as_deref(),
            50,
            "Middle name cannot be more than 50 characters long.",
        );
        check_required_text(
            errors,
            fields::LAST_NAME,
            &self.last_name,
            100,
            "You cannot leave the last name blank.",
            "Last name cannot be more than 100 characters long.",
        );
    }
}

/// Uppercased first letter of a middle name, if there is one.
pub(crate) fn middle_initial(middle_name: Option<&str>) -> Option<String> {
    middle_name
        .and_then(|m| m.trim().chars().next())
        .map(|c| c.to_uppercase().collect())
}

/// "Last, First M"
pub(crate) fn formal_name(first: &str, middle: Option<&str>, last: &str) -> String {
    match middle_initial(middle) {
        Some(initial) => format!("{last}, {first} {initial}"),
        None => format!("{last}, {first}"),
    }
}

/// "First M Last"
pub(crate) fn summary_name(first: &str, middle: Option<&str>, last: &str) -> String {
    match middle_initial(middle) {
        Some(initial) => format!("{first} {initial} {last}"),
        None => format!("{first} {last}"),
    }
}
