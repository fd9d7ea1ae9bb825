//! Appointment screens. Appointments are always listed for one patient.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ListView, Office, Saved, Screen};
use crate::db::DbError;
use crate::error::{OfficeError, OfficeResult, StoreContext, DELETE_FAILED_MESSAGE};
use crate::models::{
    appointment_fields, Appointment, LookupKind, Validate, ValidationContext, ValidationErrors, DEFAULT_EXTRA_FEE,
};
use crate::query::{
    AppointmentCriteria, AppointmentListItem, AppointmentSort, ListRequest, PatientListItem, APPOINTMENT_SCREEN,
    PATIENT_PARAM, PATIENT_SCREEN,
};
use crate::reconcile::SelectOption;

/// Appointment create/edit form as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentForm {
    pub id: Option<i64>,
    pub patient_id: i64,
    pub doctor_id: Option<i64>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub notes: String,
    pub extra_fee: f64,
    pub appointment_reason_id: Option<i64>,
}

impl AppointmentForm {
    /// Blank form for `patient_id`, booked with `doctor_id`.
    pub fn for_patient(patient_id: i64, doctor_id: i64) -> Self {
        Self {
            id: None,
            patient_id,
            doctor_id: Some(doctor_id),
            start_time: None,
            end_time: None,
            notes: String::new(),
            extra_fee: DEFAULT_EXTRA_FEE,
            appointment_reason_id: None,
        }
    }

    pub fn from_appointment(appointment: &Appointment) -> Self {
        Self {
            id: Some(appointment.id),
            patient_id: appointment.patient_id,
            doctor_id: Some(appointment.doctor_id),
            start_time: Some(appointment.start_time),
            end_time: appointment.end_time,
            notes: appointment.notes.clone(),
            extra_fee: appointment.extra_fee,
            appointment_reason_id: appointment.appointment_reason_id,
        }
    }

    /// `None` while a required pick is missing.
    pub fn to_appointment(&self) -> Option<Appointment> {
        let mut appointment = Appointment::new(
            self.patient_id,
            self.doctor_id?,
            self.start_time?,
            self.notes.trim(),
        );
        appointment.id = self.id.unwrap_or(0);
        appointment.end_time = self.end_time;
        appointment.extra_fee = self.extra_fee;
        appointment.appointment_reason_id = self.appointment_reason_id;
        Some(appointment)
    }

    pub fn validate(&self, ctx: &ValidationContext) -> Result<Appointment, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.start_time.is_none() {
            errors.add(appointment_fields::START_TIME, "You must enter the start date and time.");
        }
        if self.doctor_id.is_none() {
            errors.add(appointment_fields::DOCTOR, "You must select a Doctor.");
        }
        match self.to_appointment() {
            Some(appointment) => {
                appointment.validate(ctx)?;
                Ok(appointment)
            }
            None => {
                // Report the other field problems alongside the missing picks.
                let draft = Appointment::new(self.patient_id, 0, NaiveDateTime::MIN, self.notes.trim());
                let draft = Appointment {
                    extra_fee: self.extra_fee,
                    ..draft
                };
                draft.check_fields(&mut errors);
                Err(errors)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentEditor {
    pub form: AppointmentForm,
    pub patient: PatientListItem,
    pub doctor_options: Vec<SelectOption>,
    pub reason_options: Vec<SelectOption>,
}

/// Result of opening a patient's appointment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppointmentIndex {
    List {
        patient: PatientListItem,
        view: ListView<AppointmentListItem>,
    },
    /// No usable patient; go back to the patient list.
    Redirect(String),
}

/// `/PatientAppointment?PatientID={id}`
pub fn appointment_list_url(patient_id: i64) -> String {
    format!("{}?{}={}", APPOINTMENT_SCREEN.base_url(), PATIENT_PARAM, patient_id)
}

impl Office {
    /// A patient's appointments, filtered, sorted and paged in the
    /// database.
    pub fn list_appointments(&mut self, request: &ListRequest) -> OfficeResult<AppointmentIndex> {
        let patient = match request.id(PATIENT_PARAM) {
            Some(id) => self.read(self.db.patient_list_item(id))?,
            None => None,
        };
        let Some(patient) = patient else {
            debug!("Appointment list without a patient");
            return Ok(AppointmentIndex::Redirect(self.return_url(&PATIENT_SCREEN)));
        };

        let (state, sort) = self.enter_list::<AppointmentSort>(&APPOINTMENT_SCREEN, request);
        let criteria = AppointmentCriteria::from_state(&state);
        let page = self.read(
            self.db
                .query_appointments(&criteria, sort, state.page, state.page_size),
        )?;
        let view = self.list_view(page, state, criteria.filter_set().len());
        Ok(AppointmentIndex::List { patient, view })
    }

    fn load_appointment_item(&self, id: i64) -> OfficeResult<AppointmentListItem> {
        let not_found = || OfficeError::not_found(format!("appointment {}", id));
        let appointment = self.read(self.db.get_appointment(id))?.ok_or_else(not_found)?;
        let criteria = AppointmentCriteria {
            patient_id: Some(appointment.patient_id),
            ..AppointmentCriteria::default()
        };
        self.read(self.db.appointment_list_items(&criteria))?
            .into_iter()
            .find(|item| item.appointment.id == id)
            .ok_or_else(not_found)
    }

    /// Back link for an appointment screen: the remembered list, or the
    /// patient's unfiltered list.
    fn appointment_back(&mut self, patient_id: i64, referrer: Option<&str>) -> String {
        if let Some(referrer) = referrer {
            self.session
                .return_urls
                .capture_from_referrer(APPOINTMENT_SCREEN.key, referrer);
        }
        self.session
            .return_urls
            .peek(APPOINTMENT_SCREEN.key)
            .map(str::to_string)
            .unwrap_or_else(|| appointment_list_url(patient_id))
    }

    fn finish_appointment(&mut self, patient_id: i64) -> String {
        self.session
            .return_urls
            .consume(APPOINTMENT_SCREEN.key)
            .unwrap_or_else(|| appointment_list_url(patient_id))
    }

    pub fn appointment_details(
        &mut self,
        id: i64,
        referrer: Option<&str>,
    ) -> OfficeResult<Screen<AppointmentListItem>> {
        let item = self.load_appointment_item(id)?;
        let return_url = self.appointment_back(item.appointment.patient_id, referrer);
        Ok(Screen {
            model: item,
            return_url,
        })
    }

    pub fn appointment_editor(&self, form: AppointmentForm) -> OfficeResult<AppointmentEditor> {
        let patient = self
            .read(self.db.patient_list_item(form.patient_id))?
            .ok_or_else(|| OfficeError::not_found(format!("patient {}", form.patient_id)))?;
        Ok(AppointmentEditor {
            doctor_options: self.doctor_options()?,
            reason_options: self
                .read(self.db.lookup_options(LookupKind::AppointmentReason))?
                .into_iter()
                .map(|(id, name)| SelectOption { id, name })
                .collect(),
            patient,
            form,
        })
    }

    /// New appointment for a patient, booked with their own doctor.
    pub fn begin_appointment_create(
        &mut self,
        patient_id: i64,
        referrer: Option<&str>,
    ) -> OfficeResult<Screen<AppointmentEditor>> {
        let patient = self
            .read(self.db.get_patient(patient_id))?
            .ok_or_else(|| OfficeError::not_found(format!("patient {}", patient_id)))?;
        let editor = self.appointment_editor(AppointmentForm::for_patient(patient.id, patient.doctor_id))?;
        let return_url = self.appointment_back(patient_id, referrer);
        Ok(Screen {
            model: editor,
            return_url,
        })
    }

    pub fn begin_appointment_edit(
        &mut self,
        id: i64,
        referrer: Option<&str>,
    ) -> OfficeResult<Screen<AppointmentEditor>> {
        let appointment = self
            .read(self.db.get_appointment(id))?
            .ok_or_else(|| OfficeError::not_found(format!("appointment {}", id)))?;
        let editor = self.appointment_editor(AppointmentForm::from_appointment(&appointment))?;
        let return_url = self.appointment_back(appointment.patient_id, referrer);
        Ok(Screen {
            model: editor,
            return_url,
        })
    }

    pub fn save_appointment(&mut self, form: &AppointmentForm) -> OfficeResult<Saved> {
        let appointment = form.validate(&self.validation_context())?;
        if self.read(self.db.get_patient(form.patient_id))?.is_none() {
            return Err(OfficeError::not_found(format!("patient {}", form.patient_id)));
        }

        let store = |e: DbError| OfficeError::from_store(e, &StoreContext::SAVE);
        let id = match form.id {
            None => self.db.insert_appointment(&appointment).map_err(store)?.id,
            Some(id) => {
                if !self.db.update_appointment(&appointment).map_err(store)? {
                    return Err(OfficeError::not_found(format!("appointment {}", id)));
                }
                id
            }
        };
        info!(appointment_id = id, patient_id = form.patient_id, "Saved appointment");
        Ok(Saved {
            id,
            redirect_url: self.finish_appointment(form.patient_id),
        })
    }

    pub fn begin_appointment_delete(
        &mut self,
        id: i64,
        referrer: Option<&str>,
    ) -> OfficeResult<Screen<AppointmentListItem>> {
        self.appointment_details(id, referrer)
    }

    pub fn delete_appointment(&mut self, id: i64) -> OfficeResult<String> {
        let appointment = self
            .read(self.db.get_appointment(id))?
            .ok_or_else(|| OfficeError::not_found(format!("appointment {}", id)))?;
        self.db
            .delete_appointment(id)
            .map_err(|e| OfficeError::from_store(e, &StoreContext::delete_with(DELETE_FAILED_MESSAGE)))?;
        info!(appointment_id = id, "Deleted appointment");
        Ok(self.finish_appointment(appointment.patient_id))
    }

    /// Leave an appointment screen without saving.
    pub fn cancel_appointment(&mut self, patient_id: i64) -> String {
        self.finish_appointment(patient_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ctx() -> ValidationContext {
        ValidationContext::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_list_url() {
        assert_eq!(appointment_list_url(7), "/PatientAppointment?PatientID=7");
    }

    #[test]
    fn test_missing_picks_reported_with_other_fields() {
        let form = AppointmentForm::for_patient(1, 1);
        let form = AppointmentForm {
            doctor_id: None,
            ..form
        };
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(errors.count_for(appointment_fields::START_TIME), 1);
        assert_eq!(errors.count_for(appointment_fields::DOCTOR), 1);
        assert_eq!(errors.count_for(appointment_fields::NOTES), 1);
    }

    #[test]
    fn test_end_before_start() {
        let form = AppointmentForm {
            start_time: Some(at(10, 0)),
            end_time: Some(at(9, 0)),
            notes: "Checkup".into(),
            ..AppointmentForm::for_patient(1, 1)
        };
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(errors.count_for(appointment_fields::END_TIME), 1);
    }

    #[test]
    fn test_valid_form_builds_appointment() {
        let form = AppointmentForm {
            start_time: Some(at(9, 0)),
            notes: " Checkup ".into(),
            ..AppointmentForm::for_patient(3, 2)
        };
        let appointment = form.validate(&ctx()).unwrap();
        assert_eq!(appointment.patient_id, 3);
        assert_eq!(appointment.doctor_id, 2);
        assert_eq!(appointment.notes, "Checkup");
        assert_eq!(AppointmentForm::from_appointment(&appointment).to_appointment(), Some(appointment));
    }
}
