//! Error taxonomy for office operations.
//!
//! Store failures are classified (see [`crate::db::StoreFailure`]) and
//! translated into an [`OfficeError`] whose [`OfficeError::user_message`]
//! is a fixed sentence per kind. Raw SQLite text is only logged.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::db::{DbError, StoreFailure};
use crate::models::{patient_fields, Patient, ValidationErrors};

pub const SAVE_FAILED_MESSAGE: &str =
    "Unable to save changes. Try again, and if the problem persists see your system administrator.";
pub const DELETE_FAILED_MESSAGE: &str =
    "Unable to delete record. Try again, and if the problem persists see your system administrator.";
pub const DUPLICATE_OHIP_MESSAGE: &str =
    "Unable to save changes. Remember, you cannot have duplicate OHIP numbers.";
pub const DUPLICATE_BIRTH_MESSAGE: &str =
    "Unable to save changes. Remember, you cannot have two patients with the same name and date of birth.";
pub const DOCTOR_IN_USE_MESSAGE: &str =
    "Unable to Delete Doctor. Remember, you cannot delete a Doctor that has patients assigned.";
pub const CONCURRENCY_MESSAGE: &str = "The record you attempted to edit was modified by another user after \
     you received the original value. The edit operation was canceled and the current values in the \
     database have been displayed. If you still want to save your version of this record, click the \
     Save button again.";
pub const DELETED_BY_OTHER_MESSAGE: &str = "Unable to save changes. The Patient was deleted by another user.";
pub const TRANSIENT_MESSAGE: &str =
    "The database is busy right now. Please try again later.";
pub const NOT_FOUND_MESSAGE: &str = "The record you requested could not be found.";
pub const VALIDATION_MESSAGE: &str = "Please correct the errors shown and try again.";

/// One field whose stored value differs from what the user submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDifference {
    pub field: String,
    pub current_value: String,
    pub attempted_value: String,
}

/// A patient save rejected because someone else saved first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyConflict {
    /// What is stored now; `None` when the patient was deleted.
    pub current: Option<Patient>,
    pub differences: Vec<FieldDifference>,
    /// Token to resubmit with; `None` when the patient was deleted.
    pub refreshed_version: Option<String>,
}

/// Office operation errors.
#[derive(Error, Debug)]
pub enum OfficeError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Uniqueness conflict on {field}")]
    Uniqueness { field: String, message: String },

    #[error("Referential conflict: {message}")]
    Referential { message: String },

    #[error("Concurrency conflict")]
    Concurrency(Box<ConcurrencyConflict>),

    #[error("Transient store failure: {0}")]
    Transient(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected store failure: {0}")]
    Unexpected(String),
}

pub type OfficeResult<T> = Result<T, OfficeError>;

impl From<ValidationErrors> for OfficeError {
    fn from(errors: ValidationErrors) -> Self {
        OfficeError::Validation(errors)
    }
}

impl OfficeError {
    pub fn not_found(what: impl Into<String>) -> Self {
        OfficeError::NotFound(what.into())
    }

    /// The fixed sentence shown for this error.
    pub fn user_message(&self) -> String {
        match self {
            OfficeError::Validation(_) => VALIDATION_MESSAGE.to_string(),
            OfficeError::Uniqueness { message, .. } => message.clone(),
            OfficeError::Referential { message } => message.clone(),
            OfficeError::Concurrency(conflict) => {
                if conflict.current.is_some() {
                    CONCURRENCY_MESSAGE.to_string()
                } else {
                    DELETED_BY_OTHER_MESSAGE.to_string()
                }
            }
            OfficeError::Transient(_) => TRANSIENT_MESSAGE.to_string(),
            OfficeError::Unexpected(_) => SAVE_FAILED_MESSAGE.to_string(),
            OfficeError::NotFound(_) => NOT_FOUND_MESSAGE.to_string(),
        }
    }

    /// Errors to attach to the form: field errors where attributable,
    /// otherwise one record-level error with the user message.
    pub fn form_errors(&self) -> ValidationErrors {
        match self {
            OfficeError::Validation(errors) => errors.clone(),
            OfficeError::Uniqueness { field, message } => ValidationErrors::single(field, message.clone()),
            other => {
                let mut errors = ValidationErrors::new();
                errors.add_record(other.user_message());
                errors
            }
        }
    }

    /// Translate a store error using the messages of `context`.
    pub(crate) fn from_store(err: DbError, context: &StoreContext) -> Self {
        let translated = match err.failure() {
            StoreFailure::Unique { columns } => context
                .unique_fields
                .iter()
                .find(|(column, _, _)| columns.iter().any(|c| c == column))
                .map(|(_, field, message)| OfficeError::Uniqueness {
                    field: field.to_string(),
                    message: message.to_string(),
                })
                .unwrap_or_else(|| OfficeError::Unexpected(err.to_string())),
            StoreFailure::ForeignKey => OfficeError::Referential {
                message: context.referential_message.to_string(),
            },
            StoreFailure::Busy => OfficeError::Transient(err.to_string()),
            StoreFailure::Other => match err {
                DbError::NotFound(what) => OfficeError::NotFound(what),
                other => OfficeError::Unexpected(other.to_string()),
            },
        };
        warn!(operation = context.operation, error = %translated, "Store operation failed");
        translated
    }
}

/// How to word store failures for one operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StoreContext {
    pub operation: &'static str,
    /// `(table.column, form field, message)`; first match wins.
    pub unique_fields: &'static [(&'static str, &'static str, &'static str)],
    pub referential_message: &'static str,
}

impl StoreContext {
    pub const PATIENT_SAVE: StoreContext = StoreContext {
        operation: "save patient",
        unique_fields: &[
            ("patients.ohip", patient_fields::OHIP, DUPLICATE_OHIP_MESSAGE),
            ("patients.dob", patient_fields::DOB, DUPLICATE_BIRTH_MESSAGE),
        ],
        referential_message: SAVE_FAILED_MESSAGE,
    };

    pub const PATIENT_DELETE: StoreContext = StoreContext {
        operation: "delete patient",
        unique_fields: &[],
        referential_message: DELETE_FAILED_MESSAGE,
    };

    pub const DOCTOR_DELETE: StoreContext = StoreContext {
        operation: "delete doctor",
        unique_fields: &[],
        referential_message: DOCTOR_IN_USE_MESSAGE,
    };

    pub const SAVE: StoreContext = StoreContext {
        operation: "save",
        unique_fields: &[],
        referential_message: SAVE_FAILED_MESSAGE,
    };

    pub const READ: StoreContext = StoreContext {
        operation: "read",
        unique_fields: &[],
        referential_message: SAVE_FAILED_MESSAGE,
    };

    pub fn delete_with(message: &'static str) -> StoreContext {
        StoreContext {
            operation: "delete",
            unique_fields: &[],
            referential_message: message,
        }
    }
}
