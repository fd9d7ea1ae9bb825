//! The three paged list screens: patients, doctors and a patient's
//! appointments.
//!
//! For each screen this defines its query parameters, its sortable
//! columns, the list row, and the criteria that turn a [`ListState`] into
//! a [`FilterSet`]. The SQL listings in `db` implement the same criteria
//! and orderings natively.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::filter::{contains_ignore_case, FilterSet};
use super::sort::{sort_with, SortDirection, SortField, SortState};
use super::{ListState, ScreenSpec};
use crate::models::{Appointment, Coverage, Doctor, Lookup, Patient, StoredImage};

pub const DOCTOR_PARAM: &str = "DoctorID";
pub const MEDICAL_TRIAL_PARAM: &str = "MedicalTrialID";
pub const CONDITION_PARAM: &str = "ConditionID";
pub const COVERAGE_PARAM: &str = "Coverage";
pub const SPECIALTY_PARAM: &str = "SpecialtyID";
pub const PATIENT_PARAM: &str = "PatientID";
pub const APPOINTMENT_REASON_PARAM: &str = "AppointmentReasonID";

pub const PATIENT_SCREEN: ScreenSpec = ScreenSpec {
    key: "Patient",
    id_params: &[DOCTOR_PARAM, MEDICAL_TRIAL_PARAM, CONDITION_PARAM],
    value_params: &[COVERAGE_PARAM],
};

pub const DOCTOR_SCREEN: ScreenSpec = ScreenSpec {
    key: "Doctor",
    id_params: &[SPECIALTY_PARAM],
    value_params: &[],
};

pub const APPOINTMENT_SCREEN: ScreenSpec = ScreenSpec {
    key: "PatientAppointment",
    id_params: &[PATIENT_PARAM, APPOINTMENT_REASON_PARAM],
    value_params: &[],
};

/// Lookup maintenance has no paged list, only a return URL.
pub const LOOKUP_SCREEN: ScreenSpec = ScreenSpec {
    key: "Lookup",
    id_params: &[],
    value_params: &[],
};

// ---------------------------------------------------------------------
// Patients
// ---------------------------------------------------------------------

/// Row of the patient list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientListItem {
    pub patient: Patient,
    pub doctor_first_name: String,
    pub doctor_middle_name: Option<String>,
    pub doctor_last_name: String,
    pub medical_trial: Option<String>,
    /// Sorted by name
    pub conditions: Vec<Lookup>,
    pub thumbnail: Option<StoredImage>,
}

impl PatientListItem {
    pub fn doctor_formal_name(&self) -> String {
        Doctor {
            first_name: self.doctor_first_name.clone(),
            middle_name: self.doctor_middle_name.clone(),
            last_name: self.doctor_last_name.clone(),
            ..Doctor::new("", "")
        }
        .formal_name()
    }

    pub fn has_condition(&self, condition_id: i64) -> bool {
        self.conditions.iter().any(|c| c.id == condition_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientSort {
    Patient,
    Age,
    VisitsPerYear,
    Doctor,
}

impl SortField for PatientSort {
    const ALL: &'static [Self] = &[
        PatientSort::Patient,
        PatientSort::Age,
        PatientSort::VisitsPerYear,
        PatientSort::Doctor,
    ];

    fn default_field() -> Self {
        PatientSort::Patient
    }

    fn name(&self) -> &'static str {
        match self {
            PatientSort::Patient => "Patient",
            PatientSort::Age => "Age",
            PatientSort::VisitsPerYear => "Visits/Yr",
            PatientSort::Doctor => "Doctor",
        }
    }
}

impl PatientSort {
    /// Ascending comparison on this column. Ascending age is youngest
    /// first, so it compares birth dates newest first; unknown birth dates
    /// sort last.
    pub fn compare(&self, a: &PatientListItem, b: &PatientListItem) -> Ordering {
        match self {
            PatientSort::Patient => (&a.patient.last_name, &a.patient.first_name)
                .cmp(&(&b.patient.last_name, &b.patient.first_name)),
            PatientSort::Age => b.patient.dob.cmp(&a.patient.dob),
            PatientSort::VisitsPerYear => a.patient.exp_yr_visits.cmp(&b.patient.exp_yr_visits),
            PatientSort::Doctor => (&a.doctor_last_name, &a.doctor_first_name)
                .cmp(&(&b.doctor_last_name, &b.doctor_first_name)),
        }
    }
}

/// Secondary order for patient rows: last name, first name, id.
pub fn patient_tiebreak(a: &PatientListItem, b: &PatientListItem) -> Ordering {
    (&a.patient.last_name, &a.patient.first_name, a.patient.id)
        .cmp(&(&b.patient.last_name, &b.patient.first_name, b.patient.id))
}

pub fn sort_patients(rows: &mut [PatientListItem], sort: SortState<PatientSort>) {
    sort_with(rows, sort.direction, |a, b| sort.field.compare(a, b), patient_tiebreak);
}

/// Active patient filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientCriteria {
    /// Matches first or last name
    pub search: Option<String>,
    pub doctor_id: Option<i64>,
    pub medical_trial_id: Option<i64>,
    pub condition_id: Option<i64>,
    pub coverage: Option<Coverage>,
}

impl PatientCriteria {
    pub fn from_state(state: &ListState) -> Self {
        Self {
            search: state.search.clone(),
            doctor_id: state.ids.get(DOCTOR_PARAM).copied(),
            medical_trial_id: state.ids.get(MEDICAL_TRIAL_PARAM).copied(),
            condition_id: state.ids.get(CONDITION_PARAM).copied(),
            coverage: state
                .values
                .get(COVERAGE_PARAM)
                .and_then(|c| c.parse().ok()),
        }
    }

    pub fn filter_set(&self) -> FilterSet<PatientListItem> {
        let mut filters = FilterSet::new();
        if let Some(search) = self.search.clone() {
            filters.add("search", move |row: &PatientListItem| {
                contains_ignore_case(&row.patient.first_name, &search)
                    || contains_ignore_case(&row.patient.last_name, &search)
            });
        }
        if let Some(id) = self.doctor_id {
            filters.add("doctor", move |row: &PatientListItem| row.patient.doctor_id == id);
        }
        if let Some(id) = self.medical_trial_id {
            filters.add("medical_trial", move |row: &PatientListItem| {
                row.patient.medical_trial_id == Some(id)
            });
        }
        if let Some(id) = self.condition_id {
            filters.add("condition", move |row: &PatientListItem| row.has_condition(id));
        }
        if let Some(coverage) = self.coverage {
            filters.add("coverage", move |row: &PatientListItem| row.patient.coverage == coverage);
        }
        filters
    }
}

// ---------------------------------------------------------------------
// Doctors
// ---------------------------------------------------------------------

/// Row of the doctor list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorListItem {
    pub doctor: Doctor,
    /// Sorted by name
    pub specialties: Vec<Lookup>,
    pub patient_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoctorSort {
    Doctor,
    Patients,
}

impl SortField for DoctorSort {
    const ALL: &'static [Self] = &[DoctorSort::Doctor, DoctorSort::Patients];

    fn default_field() -> Self {
        DoctorSort::Doctor
    }

    fn name(&self) -> &'static str {
        match self {
            DoctorSort::Doctor => "Doctor",
            DoctorSort::Patients => "Patients",
        }
    }

    fn default_direction(&self) -> SortDirection {
        match self {
            DoctorSort::Doctor => SortDirection::Asc,
            // Busiest first
            DoctorSort::Patients => SortDirection::Desc,
        }
    }
}

impl DoctorSort {
    pub fn compare(&self, a: &DoctorListItem, b: &DoctorListItem) -> Ordering {
        match self {
            DoctorSort::Doctor => (&a.doctor.last_name, &a.doctor.first_name)
                .cmp(&(&b.doctor.last_name, &b.doctor.first_name)),
            DoctorSort::Patients => a.patient_count.cmp(&b.patient_count),
        }
    }
}

pub fn doctor_tiebreak(a: &DoctorListItem, b: &DoctorListItem) -> Ordering {
    (&a.doctor.last_name, &a.doctor.first_name, a.doctor.id)
        .cmp(&(&b.doctor.last_name, &b.doctor.first_name, b.doctor.id))
}

pub fn sort_doctors(rows: &mut [DoctorListItem], sort: SortState<DoctorSort>) {
    sort_with(rows, sort.direction, |a, b| sort.field.compare(a, b), doctor_tiebreak);
}

/// Active doctor filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorCriteria {
    /// Matches first or last name
    pub search: Option<String>,
    pub specialty_id: Option<i64>,
}

impl DoctorCriteria {
    pub fn from_state(state: &ListState) -> Self {
        Self {
            search: state.search.clone(),
            specialty_id: state.ids.get(SPECIALTY_PARAM).copied(),
        }
    }

    pub fn filter_set(&self) -> FilterSet<DoctorListItem> {
        let mut filters = FilterSet::new();
        if let Some(search) = self.search.clone() {
            filters.add("search", move |row: &DoctorListItem| {
                contains_ignore_case(&row.doctor.first_name, &search)
                    || contains_ignore_case(&row.doctor.last_name, &search)
            });
        }
        if let Some(id) = self.specialty_id {
            filters.add("specialty", move |row: &DoctorListItem| {
                row.specialties.iter().any(|s| s.id == id)
            });
        }
        filters
    }
}

// ---------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------

/// Row of a patient's appointment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentListItem {
    pub appointment: Appointment,
    pub reason: Option<String>,
    pub doctor_formal_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentSort {
    Appointment,
    Reason,
    ExtraFees,
}

impl SortField for AppointmentSort {
    const ALL: &'static [Self] = &[
        AppointmentSort::Appointment,
        AppointmentSort::Reason,
        AppointmentSort::ExtraFees,
    ];

    fn default_field() -> Self {
        AppointmentSort::Appointment
    }

    fn name(&self) -> &'static str {
        match self {
            AppointmentSort::Appointment => "Appointment",
            AppointmentSort::Reason => "Appt. Reason",
            AppointmentSort::ExtraFees => "Extra Fees",
        }
    }

    fn default_direction(&self) -> SortDirection {
        match self {
            // Newest first
            AppointmentSort::Appointment => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

impl AppointmentSort {
    /// Ascending comparison. Appointments without a reason sort first.
    pub fn compare(&self, a: &AppointmentListItem, b: &AppointmentListItem) -> Ordering {
        match self {
            AppointmentSort::Appointment => a.appointment.start_time.cmp(&b.appointment.start_time),
            AppointmentSort::Reason => a.reason.cmp(&b.reason),
            AppointmentSort::ExtraFees => a.appointment.extra_fee.total_cmp(&b.appointment.extra_fee),
        }
    }
}

pub fn appointment_tiebreak(a: &AppointmentListItem, b: &AppointmentListItem) -> Ordering {
    (a.appointment.start_time, a.appointment.id).cmp(&(b.appointment.start_time, b.appointment.id))
}

pub fn sort_appointments(rows: &mut [AppointmentListItem], sort: SortState<AppointmentSort>) {
    sort_with(rows, sort.direction, |a, b| sort.field.compare(a, b), appointment_tiebreak);
}

/// Active appointment filters. `patient_id` scopes the list and is not
/// counted as a user filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentCriteria {
    pub patient_id: Option<i64>,
    pub appointment_reason_id: Option<i64>,
    /// Matches notes
    pub search: Option<String>,
}

impl AppointmentCriteria {
    pub fn from_state(state: &ListState) -> Self {
        Self {
            patient_id: state.ids.get(PATIENT_PARAM).copied(),
            appointment_reason_id: state.ids.get(APPOINTMENT_REASON_PARAM).copied(),
            search: state.search.clone(),
        }
    }

    /// User-facing filters only.
    pub fn filter_set(&self) -> FilterSet<AppointmentListItem> {
        let mut filters = FilterSet::new();
        if let Some(id) = self.appointment_reason_id {
            filters.add("reason", move |row: &AppointmentListItem| {
                row.appointment.appointment_reason_id == Some(id)
            });
        }
        if let Some(search) = self.search.clone() {
            filters.add("search", move |row: &AppointmentListItem| {
                contains_ignore_case(&row.appointment.notes, &search)
            });
        }
        filters
    }

    /// User filters plus the patient scope.
    pub fn scoped_filter_set(&self) -> FilterSet<AppointmentListItem> {
        let mut filters = self.filter_set();
        if let Some(id) = self.patient_id {
            filters.add("patient", move |row: &AppointmentListItem| {
                row.appointment.patient_id == id
            });
        }
        filters
    }
}

/// Distinct ids in `items`, for filter drop-downs that only offer values
/// in use.
pub fn distinct_ids<T, F: Fn(&T) -> Option<i64>>(items: &[T], f: F) -> BTreeSet<i64> {
    items.iter().filter_map(f).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::models::LookupKind;

    fn patient_row(id: i64, first: &str, last: &str, dob: Option<(i32, u32, u32)>) -> PatientListItem {
        let mut patient = Patient::new(first, last, "9055551212", 1);
        patient.id = id;
        patient.dob = dob.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        PatientListItem {
            patient,
            doctor_first_name: "Gregory".into(),
            doctor_middle_name: Some("A".into()),
            doctor_last_name: "House".into(),
            medical_trial: None,
            conditions: vec![],
            thumbnail: None,
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_sort_names() {
        assert_eq!(PatientSort::from_name("Visits/Yr"), Some(PatientSort::VisitsPerYear));
        assert_eq!(AppointmentSort::from_name("Appt. Reason"), Some(AppointmentSort::Reason));
        assert_eq!(DoctorSort::from_name("patients"), None);
    }

    #[test]
    fn test_age_ascending_is_youngest_first_unknown_last() {
        let mut rows = vec![
            patient_row(1, "Fred", "Flintstone", Some((1955, 9, 1))),
            patient_row(2, "Jane", "Doe", None),
            patient_row(3, "Barney", "Rubble", Some((1990, 1, 1))),
        ];
        sort_patients(&mut rows, SortState::new(PatientSort::Age, SortDirection::Asc));
        let ids: Vec<i64> = rows.iter().map(|r| r.patient.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);

        sort_patients(&mut rows, SortState::new(PatientSort::Age, SortDirection::Desc));
        let ids: Vec<i64> = rows.iter().map(|r| r.patient.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_patient_ties_break_on_name_then_id() {
        let mut rows = vec![
            patient_row(9, "Wilma", "Flintstone", None),
            patient_row(4, "Fred", "Flintstone", None),
            patient_row(2, "Fred", "Flintstone", None),
        ];
        sort_patients(&mut rows, SortState::new(PatientSort::VisitsPerYear, SortDirection::Desc));
        let ids: Vec<i64> = rows.iter().map(|r| r.patient.id).collect();
        assert_eq!(ids, vec![2, 4, 9]);
    }

    #[test]
    fn test_patient_filters() {
        let mut wilma = patient_row(2, "Wilma", "Flintstone", None);
        wilma.patient.coverage = Coverage::International;
        wilma.conditions.push(Lookup {
            kind: LookupKind::Condition,
            id: 7,
            name: "Asthma".into(),
        });
        let rows = vec![patient_row(1, "Fred", "Flintstone", None), wilma, patient_row(3, "Barney", "Rubble", None)];

        let criteria = PatientCriteria {
            search: Some("FLINT".into()),
            ..Default::default()
        };
        assert_eq!(criteria.filter_set().apply(rows.clone()).len(), 2);

        let criteria = PatientCriteria {
            search: Some("flint".into()),
            condition_id: Some(7),
            coverage: Some(Coverage::International),
            ..Default::default()
        };
        let filters = criteria.filter_set();
        assert_eq!(filters.len(), 3);
        let hits = filters.apply(rows);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].patient.first_name, "Wilma");
    }

    #[test]
    fn test_criteria_from_state_ignores_bad_coverage() {
        let req = super::super::ListRequest::new()
            .with_id(DOCTOR_PARAM, 3)
            .with_value(COVERAGE_PARAM, "Martian");
        let (state, _) = req.resolve::<PatientSort>(&PATIENT_SCREEN, 10);
        let criteria = PatientCriteria::from_state(&state);
        assert_eq!(criteria.doctor_id, Some(3));
        assert_eq!(criteria.coverage, None);
    }

    #[test]
    fn test_doctor_formal_name_on_row() {
        let row = patient_row(1, "Fred", "Flintstone", None);
        assert_eq!(row.doctor_formal_name(), "House, Gregory A");
    }

    #[test]
    fn test_appointments_default_newest_first() {
        let mk = |id, start: &str, reason: Option<&str>| AppointmentListItem {
            appointment: Appointment {
                id,
                ..Appointment::new(1, 1, at(start), "Checkup")
            },
            reason: reason.map(str::to_string),
            doctor_formal_name: "House, Gregory A".into(),
        };
        let mut rows = vec![
            mk(1, "2024-01-01 09:00", Some("Illness")),
            mk(2, "2024-03-01 09:00", None),
            mk(3, "2024-02-01 09:00", Some("Annual")),
        ];
        sort_appointments(&mut rows, SortState::default());
        let ids: Vec<i64> = rows.iter().map(|r| r.appointment.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        sort_appointments(&mut rows, SortState::new(AppointmentSort::Reason, SortDirection::Asc));
        let ids: Vec<i64> = rows.iter().map(|r| r.appointment.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_appointment_scope_not_counted() {
        let criteria = AppointmentCriteria {
            patient_id: Some(1),
            appointment_reason_id: None,
            search: Some("flu".into()),
        };
        assert_eq!(criteria.filter_set().len(), 1);
        assert_eq!(criteria.scoped_filter_set().len(), 2);
    }

    #[test]
    fn test_distinct_ids() {
        let rows = vec![Some(3), None, Some(1), Some(3)];
        let ids = distinct_ids(&rows, |r| *r);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }
}
