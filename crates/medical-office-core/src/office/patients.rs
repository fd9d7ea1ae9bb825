//! Patient screens.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use medical_office_imaging::{check_upload_size, process_upload, ImageError, ProcessedPhoto};

use super::{ListView, Office, Saved, Screen};
use crate::db::{DbError, VersionedUpdate};
use crate::error::{ConcurrencyConflict, FieldDifference, OfficeError, OfficeResult, StoreContext};
use crate::models::{
    normalize_optional, patient_fields, Coverage, LookupKind, Patient, StoredImage, Validate,
    ValidationContext, ValidationErrors,
};
use crate::query::{ListRequest, PatientCriteria, PatientListItem, PatientSort, PATIENT_SCREEN};
use crate::reconcile::{selection_lists, SelectOption};

const DOCTOR_REQUIRED_MESSAGE: &str = "You must select a Primary Care Physician.";

/// A photo as uploaded, before resizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUpload {
    pub content: Vec<u8>,
    pub mime_type: String,
}

/// Patient create/edit form as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientForm {
    /// `None` when creating
    pub id: Option<i64>,
    pub ohip: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub dob: Option<NaiveDate>,
    pub exp_yr_visits: u8,
    pub phone: String,
    pub email: Option<String>,
    pub coverage: Coverage,
    pub medical_trial_id: Option<i64>,
    pub doctor_id: Option<i64>,
    /// Checked conditions; `None` when nothing was checked
    pub selected_conditions: Option<Vec<i64>>,
    /// New photo to replace the current one
    pub photo_upload: Option<PhotoUpload>,
    /// Clear the current photo (ignored when a new one is uploaded)
    pub remove_photo: bool,
    /// Token captured when the edit started
    pub row_version: Option<String>,
}

impl Default for PatientForm {
    fn default() -> Self {
        let blank = Patient::new("", "", "", 0);
        Self {
            id: None,
            ohip: None,
            first_name: String::new(),
            middle_name: None,
            last_name: String::new(),
            dob: None,
            exp_yr_visits: blank.exp_yr_visits,
            phone: String::new(),
            email: None,
            coverage: blank.coverage,
            medical_trial_id: None,
            doctor_id: None,
            selected_conditions: None,
            photo_upload: None,
            remove_photo: false,
            row_version: None,
        }
    }
}

impl PatientForm {
    /// Form pre-filled from a stored patient.
    pub fn from_patient(patient: &Patient, conditions: &BTreeSet<i64>) -> Self {
        Self {
            id: Some(patient.id),
            ohip: patient.ohip.clone(),
            first_name: patient.first_name.clone(),
            middle_name: patient.middle_name.clone(),
            last_name: patient.last_name.clone(),
            dob: patient.dob,
            exp_yr_visits: patient.exp_yr_visits,
            phone: patient.phone.clone(),
            email: patient.email.clone(),
            coverage: patient.coverage,
            medical_trial_id: patient.medical_trial_id,
            doctor_id: Some(patient.doctor_id),
            selected_conditions: Some(conditions.iter().copied().collect()),
            photo_upload: None,
            remove_photo: false,
            row_version: patient.row_version.clone(),
        }
    }

    /// The patient this form describes, with text trimmed and blanks
    /// turned into `None`.
    pub fn to_patient(&self) -> Patient {
        Patient {
            id: self.id.unwrap_or(0),
            ohip: normalize_optional(self.ohip.clone()),
            first_name: self.first_name.trim().to_string(),
            middle_name: normalize_optional(self.middle_name.clone()),
            last_name: self.last_name.trim().to_string(),
            dob: self.dob,
            exp_yr_visits: self.exp_yr_visits,
            phone: self.phone.trim().to_string(),
            email: normalize_optional(self.email.clone()),
            coverage: self.coverage,
            medical_trial_id: self.medical_trial_id,
            doctor_id: self.doctor_id.unwrap_or(0),
            row_version: self.row_version.clone(),
            ..Patient::new("", "", "", 0)
        }
    }

    /// Every failing rule: field rules (including the doctor pick and the
    /// upload), then cross-field rules if those all passed.
    pub fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationErrors> {
        let patient = self.to_patient();
        let mut errors = ValidationErrors::new();
        patient.check_fields(&mut errors);
        if self.doctor_id.is_none() {
            errors.add(patient_fields::DOCTOR, DOCTOR_REQUIRED_MESSAGE);
        }
        if let Some(upload) = &self.photo_upload {
            if let Some(message) = upload_problem(upload) {
                errors.add(patient_fields::PHOTO, message);
            }
        }
        if errors.is_empty() {
            patient.check_record(ctx, &mut errors);
        }
        errors.into_result()
    }
}

fn image_message(err: &ImageError) -> Option<&'static str> {
    match err {
        ImageError::Empty => Some("The uploaded photo is empty."),
        ImageError::TooLarge => Some("The uploaded photo is too large."),
        ImageError::UnsupportedType(_) => Some("The photo must be an image file."),
        ImageError::Decode(_) => Some("The uploaded photo could not be read as an image."),
        ImageError::InvalidTarget(..) | ImageError::Encode(_) => None,
    }
}

/// Checks that need no decoding.
fn upload_problem(upload: &PhotoUpload) -> Option<&'static str> {
    if !upload.mime_type.trim().to_ascii_lowercase().starts_with("image/") {
        return image_message(&ImageError::UnsupportedType(upload.mime_type.clone()));
    }
    check_upload_size(&upload.content)
        .err()
        .and_then(|e| image_message(&e))
}

fn photo_error(err: ImageError) -> OfficeError {
    match image_message(&err) {
        Some(message) => OfficeError::Validation(ValidationErrors::single(patient_fields::PHOTO, message)),
        None => OfficeError::Unexpected(err.to_string()),
    }
}

/// Patient details screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDetails {
    pub item: PatientListItem,
    pub summary: String,
    pub age_summary: String,
    pub phone: String,
    pub photo: Option<StoredImage>,
}

/// Everything the patient edit screen shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientEditor {
    pub form: PatientForm,
    pub doctor_options: Vec<SelectOption>,
    pub medical_trial_options: Vec<SelectOption>,
    pub selected_conditions: Vec<SelectOption>,
    pub available_conditions: Vec<SelectOption>,
    pub thumbnail: Option<StoredImage>,
}

/// Options for the patient list filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientFilterOptions {
    pub doctors: Vec<SelectOption>,
    pub medical_trials: Vec<SelectOption>,
    pub conditions: Vec<SelectOption>,
    pub coverages: Vec<Coverage>,
}

fn to_options(pairs: Vec<(i64, String)>) -> Vec<SelectOption> {
    pairs
        .into_iter()
        .map(|(id, name)| SelectOption { id, name })
        .collect()
}

fn show_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

impl Office {
    /// Patient list: filter, sort and page in the database.
    pub fn list_patients(&mut self, request: &ListRequest) -> OfficeResult<ListView<PatientListItem>> {
        let (state, sort) = self.enter_list::<PatientSort>(&PATIENT_SCREEN, request);
        let criteria = PatientCriteria::from_state(&state);
        let page = self.read(
            self.db
                .query_patients(&criteria, sort, state.page, state.page_size),
        )?;
        Ok(self.list_view(page, state, criteria.filter_set().len()))
    }

    pub fn patient_filter_options(&self) -> OfficeResult<PatientFilterOptions> {
        Ok(PatientFilterOptions {
            doctors: self.doctor_options()?,
            medical_trials: to_options(self.read(self.db.lookup_options(LookupKind::MedicalTrial))?),
            conditions: to_options(self.read(self.db.lookup_options(LookupKind::Condition))?),
            coverages: Coverage::ALL.to_vec(),
        })
    }

    fn load_patient_item(&self, id: i64) -> OfficeResult<PatientListItem> {
        self.read(self.db.patient_list_item(id))?
            .ok_or_else(|| OfficeError::not_found(format!("patient {}", id)))
    }

    fn patient_details_model(&self, id: i64) -> OfficeResult<PatientDetails> {
        let item = self.load_patient_item(id)?;
        let photo = self.read(self.db.get_patient_photo(id))?;
        Ok(PatientDetails {
            summary: item.patient.summary(),
            age_summary: item.patient.age_summary(self.today()),
            phone: item.patient.phone_formatted(),
            photo,
            item,
        })
    }

    pub fn patient_details(&mut self, id: i64, referrer: Option<&str>) -> OfficeResult<Screen<PatientDetails>> {
        let model = self.patient_details_model(id)?;
        Ok(self.screen(&PATIENT_SCREEN, referrer, model))
    }

    /// Edit screen for `form`, e.g. to redisplay a rejected submission.
    pub fn patient_editor(&self, form: PatientForm) -> OfficeResult<PatientEditor> {
        let current: BTreeSet<i64> = form
            .selected_conditions
            .iter()
            .flatten()
            .copied()
            .collect();
        let conditions = self.read(self.db.lookup_options(LookupKind::Condition))?;
        let (selected_conditions, available_conditions) = selection_lists(&conditions, &current);
        let thumbnail = match form.id {
            Some(id) => self.read(self.db.get_patient_thumbnail(id))?,
            None => None,
        };
        Ok(PatientEditor {
            doctor_options: self.doctor_options()?,
            medical_trial_options: to_options(self.read(self.db.lookup_options(LookupKind::MedicalTrial))?),
            selected_conditions,
            available_conditions,
            thumbnail,
            form,
        })
    }

    pub fn begin_patient_create(&mut self, referrer: Option<&str>) -> OfficeResult<Screen<PatientEditor>> {
        let editor = self.patient_editor(PatientForm::default())?;
        Ok(self.screen(&PATIENT_SCREEN, referrer, editor))
    }

    pub fn begin_patient_edit(&mut self, id: i64, referrer: Option<&str>) -> OfficeResult<Screen<PatientEditor>> {
        let patient = self
            .read(self.db.get_patient(id))?
            .ok_or_else(|| OfficeError::not_found(format!("patient {}", id)))?;
        let conditions = self.read(self.db.patient_condition_ids(id))?;
        let editor = self.patient_editor(PatientForm::from_patient(&patient, &conditions))?;
        Ok(self.screen(&PATIENT_SCREEN, referrer, editor))
    }

    /// Validate and save a patient form: fields, conditions and photo in
    /// one transaction. On success the remembered list URL is consumed
    /// for the redirect.
    ///
    /// A stale `row_version`, or a patient deleted since the edit began,
    /// fails with [`OfficeError::Concurrency`] carrying the stored values
    /// and a refreshed token; the caller keeps its form (pending photo
    /// included) and can resubmit it with that token.
    pub fn save_patient(&mut self, form: &PatientForm) -> OfficeResult<Saved> {
        form.validate(&self.validation_context())?;

        let processed = match &form.photo_upload {
            Some(upload) => Some(
                process_upload(
                    self.resizer.as_ref(),
                    &upload.content,
                    &upload.mime_type,
                    self.config.photo_sizes(),
                )
                .map_err(photo_error)?,
            ),
            None => None,
        };

        let patient = form.to_patient();
        let id = self.write_patient(form, &patient, processed)?;
        info!(patient_id = id, created = form.id.is_none(), "Saved patient");
        Ok(Saved {
            id,
            redirect_url: self.finish(&PATIENT_SCREEN),
        })
    }

    fn write_patient(
        &self,
        form: &PatientForm,
        patient: &Patient,
        processed: Option<ProcessedPhoto>,
    ) -> OfficeResult<i64> {
        let store = |e: DbError| OfficeError::from_store(e, &StoreContext::PATIENT_SAVE);

        let tx = self.db.begin().map_err(store)?;
        let id = match form.id {
            None => self.db.insert_patient(patient).map_err(store)?.id,
            Some(id) => {
                let expected = form.row_version.as_deref().unwrap_or_default();
                match self.db.update_patient(patient, expected).map_err(store)? {
                    VersionedUpdate::Updated { .. } => id,
                    VersionedUpdate::Conflict | VersionedUpdate::NotFound => {
                        drop(tx);
                        return Err(self.concurrency_conflict(id, patient));
                    }
                }
            }
        };

        self.db
            .reconcile_patient_conditions(id, form.selected_conditions.as_deref())
            .map_err(store)?;

        match processed {
            Some(photo) => {
                let full: StoredImage = photo.photo.into();
                let thumb: StoredImage = photo.thumbnail.into();
                self.db.set_patient_photo(id, &full, &thumb).map_err(store)?;
            }
            None if form.remove_photo => {
                self.db.remove_patient_photo(id).map_err(store)?;
            }
            None => {}
        }

        tx.commit().map_err(|e| store(e.into()))?;
        Ok(id)
    }

    fn concurrency_conflict(&self, id: i64, attempted: &Patient) -> OfficeError {
        let current = match self.db.get_patient(id) {
            Ok(current) => current,
            Err(e) => return OfficeError::from_store(e, &StoreContext::READ),
        };
        let differences = match &current {
            Some(current) => match self.patient_differences(current, attempted) {
                Ok(diffs) => diffs,
                Err(e) => return e,
            },
            None => Vec::new(),
        };
        warn!(
            patient_id = id,
            deleted = current.is_none(),
            fields = differences.len(),
            "Patient changed by another user"
        );
        OfficeError::Concurrency(Box::new(ConcurrencyConflict {
            refreshed_version: current.as_ref().and_then(|p| p.row_version.clone()),
            current,
            differences,
        }))
    }

    /// Fields whose stored value differs from the attempted one, as
    /// display text.
    fn patient_differences(&self, current: &Patient, attempted: &Patient) -> OfficeResult<Vec<FieldDifference>> {
        let doctor_name = |id: i64| -> OfficeResult<String> {
            Ok(self
                .read(self.db.get_doctor(id))?
                .map(|d| d.formal_name())
                .unwrap_or_default())
        };
        let trial_name = |id: Option<i64>| -> OfficeResult<String> {
            match id {
                Some(id) => Ok(self
                    .read(self.db.get_lookup(LookupKind::MedicalTrial, id))?
                    .map(|t| t.name)
                    .unwrap_or_default()),
                None => Ok("None".to_string()),
            }
        };

        let pairs = [
            (patient_fields::OHIP, current.ohip.clone().unwrap_or_default(), attempted.ohip.clone().unwrap_or_default()),
            (patient_fields::FIRST_NAME, current.first_name.clone(), attempted.first_name.clone()),
            (
                patient_fields::MIDDLE_NAME,
                current.middle_name.clone().unwrap_or_default(),
                attempted.middle_name.clone().unwrap_or_default(),
            ),
            (patient_fields::LAST_NAME, current.last_name.clone(), attempted.last_name.clone()),
            (patient_fields::DOB, show_date(current.dob), show_date(attempted.dob)),
            (
                patient_fields::EXP_YR_VISITS,
                current.exp_yr_visits.to_string(),
                attempted.exp_yr_visits.to_string(),
            ),
            (patient_fields::PHONE, current.phone_formatted(), attempted.phone_formatted()),
            (
                patient_fields::EMAIL,
                current.email.clone().unwrap_or_default(),
                attempted.email.clone().unwrap_or_default(),
            ),
            (
                patient_fields::COVERAGE,
                current.coverage.display_name().to_string(),
                attempted.coverage.display_name().to_string(),
            ),
            (patient_fields::DOCTOR, doctor_name(current.doctor_id)?, doctor_name(attempted.doctor_id)?),
            (
                patient_fields::MEDICAL_TRIAL,
                trial_name(current.medical_trial_id)?,
                trial_name(attempted.medical_trial_id)?,
            ),
        ];

        Ok(pairs
            .into_iter()
            .filter(|(_, current, attempted)| current != attempted)
            .map(|(field, current_value, attempted_value)| FieldDifference {
                field: field.to_string(),
                current_value,
                attempted_value,
            })
            .collect())
    }

    pub fn begin_patient_delete(&mut self, id: i64, referrer: Option<&str>) -> OfficeResult<Screen<PatientDetails>> {
        self.patient_details(id, referrer)
    }

    /// Delete a patient with their history, photos and appointments.
    /// Returns the redirect target.
    pub fn delete_patient(&mut self, id: i64) -> OfficeResult<String> {
        if self.read(self.db.get_patient(id))?.is_none() {
            return Err(OfficeError::not_found(format!("patient {}", id)));
        }
        self.db
            .delete_patient(id)
            .map_err(|e| OfficeError::from_store(e, &StoreContext::PATIENT_DELETE))?;
        info!(patient_id = id, "Deleted patient");
        Ok(self.finish(&PATIENT_SCREEN))
    }

    pub fn patient_photo(&self, id: i64) -> OfficeResult<Option<StoredImage>> {
        self.read(self.db.get_patient_photo(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> PatientForm {
        PatientForm {
            ohip: Some("1231231234".into()),
            first_name: "Fred".into(),
            last_name: "Flintstone".into(),
            phone: "9055551212".into(),
            doctor_id: Some(1),
            ..PatientForm::default()
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    #[test]
    fn test_valid_form() {
        assert!(valid_form().validate(&ctx()).is_ok());
    }

    #[test]
    fn test_missing_doctor_is_a_field_error() {
        let form = PatientForm {
            doctor_id: None,
            first_name: " ".into(),
            ..valid_form()
        };
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(errors.count_for(patient_fields::DOCTOR), 1);
        assert_eq!(errors.count_for(patient_fields::FIRST_NAME), 1);
    }

    #[test]
    fn test_blank_ohip_under_ohip_coverage() {
        let form = PatientForm {
            ohip: Some("   ".into()),
            ..valid_form()
        };
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.count_for(patient_fields::OHIP), 1);
    }

    #[test]
    fn test_non_image_upload_rejected_in_field_pass() {
        let form = PatientForm {
            photo_upload: Some(PhotoUpload {
                content: b"%PDF-1.4".to_vec(),
                mime_type: "application/pdf".into(),
            }),
            ..valid_form()
        };
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(errors.count_for(patient_fields::PHOTO), 1);
    }

    #[test]
    fn test_form_round_trips_patient() {
        let mut patient = valid_form().to_patient();
        patient.id = 7;
        patient.row_version = Some("abc".into());
        let conditions: BTreeSet<i64> = [3, 1].into_iter().collect();
        let form = PatientForm::from_patient(&patient, &conditions);
        assert_eq!(form.selected_conditions, Some(vec![1, 3]));
        assert_eq!(form.to_patient(), patient);
    }
}
