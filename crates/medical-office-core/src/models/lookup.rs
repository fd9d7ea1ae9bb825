//! Named lookup entities and the join records that use them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::validation::{check_required_text, Validate, ValidationErrors};

/// Field name of a lookup's name in validation errors.
pub const NAME_FIELD: &str = "Name";

/// The simple named lookup tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LookupKind {
    AppointmentReason,
    Condition,
    Specialty,
    MedicalTrial,
}

impl LookupKind {
    pub const ALL: [LookupKind; 4] = [
        LookupKind::AppointmentReason,
        LookupKind::Condition,
        LookupKind::Specialty,
        LookupKind::MedicalTrial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::AppointmentReason => "AppointmentReason",
            LookupKind::Condition => "Condition",
            LookupKind::Specialty => "Specialty",
            LookupKind::MedicalTrial => "MedicalTrial",
        }
    }

    /// Backing table.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            LookupKind::AppointmentReason => "appointment_reasons",
            LookupKind::Condition => "conditions",
            LookupKind::Specialty => "specialties",
            LookupKind::MedicalTrial => "medical_trials",
        }
    }

    pub fn max_name_len(&self) -> usize {
        match self {
            LookupKind::AppointmentReason | LookupKind::Condition => 50,
            LookupKind::Specialty => 100,
            LookupKind::MedicalTrial => 200,
        }
    }

    fn required_message(&self) -> &'static str {
        match self {
            LookupKind::AppointmentReason => "You cannot leave the name of the reason blank.",
            LookupKind::Condition => "You cannot leave the name of the condition blank.",
            LookupKind::Specialty => "You cannot leave the name of the Specialty blank.",
            LookupKind::MedicalTrial => "You cannot leave the name of the trial blank.",
        }
    }

    /// Message shown when a delete is blocked by rows that use the entry.
    pub fn in_use_message(&self) -> &'static str {
        match self {
            LookupKind::AppointmentReason => {
                "Unable to Delete Appointment Reason. Remember, you cannot delete a Reason that is used by an Appointment."
            }
            LookupKind::Condition => {
                "Unable to Delete Condition. Remember, you cannot delete a Condition that is in a Patient's history."
            }
            LookupKind::Specialty => {
                "Unable to Delete Specialty. Remember, you cannot delete a Specialty that is assigned to a Doctor."
            }
            LookupKind::MedicalTrial => {
                "Unable to Delete Medical Trial. Try again, and if the problem persists see your system administrator."
            }
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LookupKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown lookup: {}", s))
    }
}

/// One row of a lookup table (reason, condition, specialty or trial).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lookup {
    pub kind: LookupKind,
    /// Row ID (0 until inserted)
    pub id: i64,
    pub name: String,
}

impl Lookup {
    pub fn new(kind: LookupKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: 0,
            name: name.into(),
        }
    }
}

impl Validate for Lookup {
    fn check_fields(&self, errors: &mut ValidationErrors) {
        let max = self.kind.max_name_len();
        check_required_text(
            errors,
            NAME_FIELD,
            &self.name,
            max,
            self.kind.required_message(),
            &format!("Name cannot be more than {} characters long.", max),
        );
    }
}

/// Join record: a doctor practises a specialty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DoctorSpecialty {
    pub doctor_id: i64,
    pub specialty_id: i64,
}

/// Join record: a condition in a patient's history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientCondition {
    pub patient_id: i64,
    pub condition_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationContext;
    use chrono::NaiveDate;

    #[test]
    fn test_name_bounds_per_kind() {
        let ctx = ValidationContext::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let long = "x".repeat(60);

        assert!(Lookup::new(LookupKind::Condition, long.clone()).validate(&ctx).is_err());
        assert!(Lookup::new(LookupKind::Specialty, long.clone()).validate(&ctx).is_ok());
        assert!(Lookup::new(LookupKind::MedicalTrial, long).validate(&ctx).is_ok());

        let errors = Lookup::new(LookupKind::AppointmentReason, " ")
            .validate(&ctx)
            .unwrap_err();
        assert_eq!(errors.count_for(NAME_FIELD), 1);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("condition".parse::<LookupKind>().unwrap(), LookupKind::Condition);
        assert!("Allergy".parse::<LookupKind>().is_err());
    }
}
