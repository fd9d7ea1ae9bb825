//! Sample data for a fresh database.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use super::{Database, DbResult};
use crate::models::{Appointment, Coverage, Doctor, Lookup, LookupKind, Patient};

/// What [`Database::seed_sample_data`] inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub lookups: usize,
    pub doctors: usize,
    pub patients: usize,
    pub appointments: usize,
}

impl SeedSummary {
    pub fn is_empty(&self) -> bool {
        *self == SeedSummary::default()
    }
}

const TRIALS: [&str; 3] = [
    "UOT - Lukemia Treatment",
    "HyGIeaCare Center -  Microbiome Analysis of Constipated Versus Non-constipation Patients",
    "TUK - Hair Loss Treatment",
];

const CONDITIONS: [&str; 6] = [
    "Asthma",
    "Cancer",
    "Cardiac disease",
    "Diabetes",
    "Hypertension",
    "Seizure disorder",
];

const SPECIALTIES: [&str; 4] = ["Abdominal Radiology", "Cardiology", "Diagnostic Medicine", "Pediatrics"];

const REASONS: [&str; 4] = ["Illness", "Annual Physical", "Follow-up", "Mental State"];

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Option<NaiveDateTime> {
    date(y, m, d).and_then(|day| day.and_hms_opt(h, min, 0))
}

impl Database {
    fn seed_lookups(&self, kind: LookupKind, names: &[&str]) -> DbResult<Vec<i64>> {
        if !self.list_lookups(kind)?.is_empty() {
            return Ok(Vec::new());
        }
        names
            .iter()
            .map(|name| Ok(self.insert_lookup(&Lookup::new(kind, *name))?.id))
            .collect()
    }

    /// Fill empty tables with sample lookups, doctors, patients and
    /// appointments. Tables that already have rows are left alone, so this
    /// is safe to call on every start.
    pub fn seed_sample_data(&self) -> DbResult<SeedSummary> {
        let tx = self.begin()?;
        let mut summary = SeedSummary::default();

        let trials = self.seed_lookups(LookupKind::MedicalTrial, &TRIALS)?;
        let conditions = self.seed_lookups(LookupKind::Condition, &CONDITIONS)?;
        let specialties = self.seed_lookups(LookupKind::Specialty, &SPECIALTIES)?;
        let reasons = self.seed_lookups(LookupKind::AppointmentReason, &REASONS)?;
        summary.lookups = trials.len() + conditions.len() + specialties.len() + reasons.len();

        if self.list_doctors()?.is_empty() {
            let house = self.insert_doctor(&Doctor::new("Gregory", "House").with_middle_name("A"))?;
            let houser = self.insert_doctor(&Doctor::new("Doogie", "Houser").with_middle_name("R"))?;
            let xavier = self.insert_doctor(&Doctor::new("Charles", "Xavier"))?;
            summary.doctors = 3;

            if specialties.len() == SPECIALTIES.len() {
                self.reconcile_doctor_specialties(house.id, Some(&[specialties[2], specialties[0]]))?;
                self.reconcile_doctor_specialties(houser.id, Some(&[specialties[3]]))?;
                self.reconcile_doctor_specialties(xavier.id, Some(&[specialties[1]]))?;
            }

            if self.list_patients()?.is_empty() {
                let mut fred = Patient::new("Fred", "Flintstone", "9055551212", house.id);
                fred.middle_name = Some("Reginald".into());
                fred.ohip = Some("1231231234".into());
                fred.dob = date(1955, 9, 1);
                fred.exp_yr_visits = 6;
                fred.email = Some("fflintstone@outlook.com".into());
                fred.medical_trial_id = trials.first().copied();

                let mut wilma = Patient::new("Wilma", "Flintstone", "9055551212", house.id);
                wilma.middle_name = Some("Jane".into());
                wilma.ohip = Some("1321321324".into());
                wilma.dob = date(1964, 4, 23);
                wilma.email = Some("wflintstone@outlook.com".into());

                let mut barney = Patient::new("Barney", "Rubble", "9055551213", houser.id);
                barney.ohip = Some("3213213214".into());
                barney.dob = date(1964, 2, 22);
                barney.email = Some("brubble@outlook.com".into());
                barney.medical_trial_id = trials.get(1).copied();

                // Out-of-province patients carry no OHIP number
                let mut jane = Patient::new("Jane", "Doe", "9055551234", xavier.id);
                jane.middle_name = Some("Samantha".into());
                jane.email = Some("jdoe@outlook.com".into());
                jane.coverage = Coverage::OutOfProvince;

                let fred = self.insert_patient(&fred)?;
                let wilma = self.insert_patient(&wilma)?;
                self.insert_patient(&barney)?;
                self.insert_patient(&jane)?;
                summary.patients = 4;

                if conditions.len() == CONDITIONS.len() {
                    self.reconcile_patient_conditions(fred.id, Some(&[conditions[2], conditions[4]]))?;
                    self.reconcile_patient_conditions(wilma.id, Some(&[conditions[0]]))?;
                }

                let visits = [
                    (fred.id, house.id, at(2024, 1, 15, 9, 0), at(2024, 1, 15, 9, 30), "Chest pain after bowling", 0),
                    (fred.id, house.id, at(2024, 3, 4, 14, 0), None, "Follow-up on blood pressure", 2),
                    (wilma.id, house.id, at(2024, 2, 20, 10, 15), at(2024, 2, 20, 11, 0), "Routine check", 1),
                ];
                for (patient_id, doctor_id, start, end, notes, reason) in visits {
                    let Some(start) = start else { continue };
                    let mut appt = Appointment::new(patient_id, doctor_id, start, notes);
                    appt.end_time = end;
                    appt.appointment_reason_id = reasons.get(reason).copied();
                    self.insert_appointment(&appt)?;
                    summary.appointments += 1;
                }
            }
        }

        tx.commit()?;
        if !summary.is_empty() {
            info!(
                lookups = summary.lookups,
                doctors = summary.doctors,
                patients = summary.patients,
                appointments = summary.appointments,
                "Seeded sample data"
            );
        }
        Ok(summary)
    }
}
