//! Appointment models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::validation::{check_required_text, Validate, ValidationContext, ValidationErrors};

/// Field names used in validation errors and forms.
pub mod fields {
    pub const START_TIME: &str = "StartTime";
    pub const END_TIME: &str = "EndTime";
    pub const NOTES: &str = "Notes";
    pub const EXTRA_FEE: &str = "ExtraFee";
    pub const DOCTOR: &str = "DoctorID";
    pub const PATIENT: &str = "PatientID";
    pub const REASON: &str = "AppointmentReasonID";
}

/// Default extra fee charged for an appointment.
pub const DEFAULT_EXTRA_FEE: f64 = 20.0;

/// A scheduled visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Row ID (0 until inserted)
    pub id: i64,
    pub start_time: NaiveDateTime,
    /// Unknown until the visit is over
    pub end_time: Option<NaiveDateTime>,
    pub notes: String,
    pub extra_fee: f64,
    pub doctor_id: i64,
    pub patient_id: i64,
    /// Reason is optional
    pub appointment_reason_id: Option<i64>,
}

impl Appointment {
    /// Create a new, unsaved appointment with the default fee.
    pub fn new(
        patient_id: i64,
        doctor_id: i64,
        start_time: NaiveDateTime,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            start_time,
            end_time: None,
            notes: notes.into(),
            extra_fee: DEFAULT_EXTRA_FEE,
            doctor_id,
            patient_id,
            appointment_reason_id: None,
        }
    }

    /// "2024-06-15"
    pub fn start_date_summary(&self) -> String {
        self.start_time.format("%Y-%m-%d").to_string()
    }

    /// "9:05 AM"
    pub fn start_time_summary(&self) -> String {
        clock_time(&self.start_time)
    }

    /// End time, with "(N days later)" when it ends on a later day.
    pub fn end_time_summary(&self) -> String {
        let Some(end) = self.end_time else {
            return "Unknown".to_string();
        };
        let days = (end - self.start_time).num_days();
        if days > 0 {
            format!(
                "{} ({} day{} later)",
                clock_time(&end),
                days,
                if days > 1 { "s" } else { "" }
            )
        } else {
            clock_time(&end)
        }
    }

    /// "1 day, 2 hrs, 5 min"; empty when the end is unknown.
    pub fn duration_summary(&self) -> String {
        let Some(end) = self.end_time else {
            return String::new();
        };
        let span = end - self.start_time;
        let days = span.num_days();
        let hours = span.num_hours() % 24;
        let minutes = span.num_minutes() % 60;

        let mut duration = String::new();
        if minutes > 0 {
            duration = format!("{} min", minutes);
        }
        if hours > 0 {
            duration = format!(
                "{} hr{}{}",
                hours,
                if hours > 1 { "s" } else { "" },
                if minutes > 0 {
                    format!(", {}", duration)
                } else {
                    String::new()
                }
            );
        }
        if days > 0 {
            duration = format!(
                "{} day{}{}",
                days,
                if days > 1 { "s" } else { "" },
                if hours > 0 || minutes > 0 {
                    format!(", {}", duration)
                } else {
                    String::new()
                }
            );
        }
        duration
    }
}

fn clock_time(time: &NaiveDateTime) -> String {
    time.format("%-I:%M %p").to_string()
}

impl Validate for Appointment {
    fn check_fields(&self, errors: &mut ValidationErrors) {
        check_required_text(
            errors,
            fields::NOTES,
            &self.notes,
            2000,
            "You must enter some notes for the appointment.",
            "Only 2000 characters for notes.",
        );
        if !self.extra_fee.is_finite() || self.extra_fee < 0.0 {
            errors.add(fields::EXTRA_FEE, "You must enter an amount for the extra fee.");
        }
    }

    fn check_record(&self, _ctx: &ValidationContext, errors: &mut ValidationErrors) {
        if let Some(end) = self.end_time {
            if end < self.start_time {
                errors.add(fields::END_TIME, "Appointment cannot end before it starts.");
            }
        }
    }
}
