//! Patient models.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::audit::AuditInfo;
use super::doctor::{formal_name, summary_name};
use super::validation::{
    check_optional_text, check_required_text, is_ten_digits, looks_like_email, Validate,
    ValidationContext, ValidationErrors,
};

/// Field names used in validation errors and forms.
pub mod fields {
    pub const OHIP: &str = "OHIP";
    pub const FIRST_NAME: &str = "FirstName";
    pub const MIDDLE_NAME: &str = "MiddleName";
    pub const LAST_NAME: &str = "LastName";
    pub const DOB: &str = "DOB";
    pub const EXP_YR_VISITS: &str = "ExpYrVisits";
    pub const PHONE: &str = "Phone";
    pub const EMAIL: &str = "Email";
    pub const COVERAGE: &str = "Coverage";
    pub const DOCTOR: &str = "DoctorID";
    pub const MEDICAL_TRIAL: &str = "MedicalTrialID";
    pub const CONDITIONS: &str = "Conditions";
    pub const PHOTO: &str = "Photo";
}

/// Health coverage of a patient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Coverage {
    #[serde(rename = "OHIP")]
    Ohip,
    OutOfProvince,
    International,
}

impl Coverage {
    pub const ALL: [Coverage; 3] = [
        Coverage::Ohip,
        Coverage::OutOfProvince,
        Coverage::International,
    ];

    /// Value used in storage and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Coverage::Ohip => "OHIP",
            Coverage::OutOfProvince => "OutOfProvince",
            Coverage::International => "International",
        }
    }

    /// Label shown in drop-downs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Coverage::Ohip => "OHIP",
            Coverage::OutOfProvince => "Out of Province",
            Coverage::International => "International",
        }
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Coverage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coverage::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown coverage: {}", s))
    }
}

/// A patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Row ID (0 until inserted)
    pub id: i64,
    /// Provincial health number; present only under OHIP coverage
    pub ohip: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// Date of birth
    pub dob: Option<NaiveDate>,
    /// Expected visits per year (1-12)
    pub exp_yr_visits: u8,
    /// Ten digits, no separators
    pub phone: String,
    pub email: Option<String>,
    pub coverage: Coverage,
    /// Optional trial enrolment
    pub medical_trial_id: Option<i64>,
    /// Primary care physician
    pub doctor_id: i64,
    /// Concurrency token, changes on every successful write
    pub row_version: Option<String>,
    /// Created/updated stamps
    pub audit: AuditInfo,
}

impl Patient {
    /// Create a new, unsaved patient with required fields.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone: impl Into<String>,
        doctor_id: i64,
    ) -> Self {
        Self {
            id: 0,
            ohip: None,
            first_name: first_name.into(),
            middle_name: None,
            last_name: last_name.into(),
            dob: None,
            // Most common value
            exp_yr_visits: 2,
            phone: phone.into(),
            email: None,
            coverage: Coverage::Ohip,
            medical_trial_id: None,
            doctor_id,
            row_version: None,
            audit: AuditInfo::default(),
        }
    }

    /// "First M Last"
    pub fn summary(&self) -> String {
        summary_name(&self.first_name, self.middle_name.as_deref(), &self.last_name)
    }

    /// "Last, First M"
    pub fn formal_name(&self) -> String {
        formal_name(&self.first_name, self.middle_name.as_deref(), &self.last_name)
    }

    /// Age in whole years on `today`.
    pub fn age(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.dob?;
        let mut years = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }

    /// "Unknown", or "age (yyyy-mm-dd)".
    pub fn age_summary(&self, today: NaiveDate) -> String {
        match (self.dob, self.age(today)) {
            (Some(dob), Some(age)) => format!("{} ({})", age, dob.format("%Y-%m-%d")),
            _ => "Unknown".to_string(),
        }
    }

    /// "(905) 555-1212"; anything that is not ten digits is returned as-is.
    pub fn phone_formatted(&self) -> String {
        if is_ten_digits(&self.phone) {
            format!(
                "({}) {}-{}",
                &self.phone[0..3],
                &self.phone[3..6],
                &self.phone[6..]
            )
        } else {
            self.phone.clone()
        }
    }
}

impl Validate for Patient {
    fn check_fields(&self, errors: &mut ValidationErrors) {
        if let Some(ohip) = &self.ohip {
            if !is_ten_digits(ohip) {
                errors.add(
                    fields::OHIP,
                    "The OHIP number must be exactly 10 numeric digits.",
                );
            }
        }
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
        if !(1..=12).contains(&self.exp_yr_visits) {
            errors.add(
                fields::EXP_YR_VISITS,
                "The number of expected visits per year must be between 1 and 12.",
            );
        }
        if self.phone.trim().is_empty() {
            errors.add(fields::PHONE, "Phone number is required.");
        } else if !is_ten_digits(&self.phone) {
            errors.add(
                fields::PHONE,
                "Please enter a valid 10-digit phone number (no spaces).",
            );
        }
        if let Some(email) = &self.email {
            if email.chars().count() > 255 {
                errors.add(fields::EMAIL, "Email cannot be more than 255 characters long.");
            } else if !looks_like_email(email) {
                errors.add(fields::EMAIL, "Please enter a valid email address.");
            }
        }
    }

    fn check_record(&self, ctx: &ValidationContext, errors: &mut ValidationErrors) {
        match (self.coverage, &self.ohip) {
            (Coverage::Ohip, None) => errors.add(
                fields::OHIP,
                "You cannot leave the OHIP number blank when coverage is OHIP.",
            ),
            (Coverage::OutOfProvince | Coverage::International, Some(_)) => errors.add(
                fields::OHIP,
                "The OHIP number must be left blank unless coverage is OHIP.",
            ),
            _ => {}
        }
        if let Some(dob) = self.dob {
            if dob > ctx.today {
                errors.add(fields::DOB, "Date of birth cannot be in the future.");
            }
        }
    }
}
