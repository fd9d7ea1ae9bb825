//! Medical Office Core Library
//!
//! Administration for a small medical office: patients, doctors,
//! appointments and the lookup tables behind them.
//!
//! # Architecture
//!
//! ```text
//!   query string ──► ListRequest ──► ListState ──► filter ─► sort ─► page
//!                        │                            (SQL or in memory)
//!                        │                                   │
//!                        ▼                                   ▼
//!                 page-size memory                       ListView
//!                                                            │
//!   list URL ◄── return-URL memory ◄── detail / edit / delete screens
//!                                                            │
//!                          validate ─► transaction ─► reconcile many-to-many
//!                                        │            photo resize
//!                                        ▼
//!                            optimistic concurrency (row_version)
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite storage with audit stamps and concurrency tokens
//! - [`models`]: Domain types and validation rules
//! - [`query`]: List-query pipeline (filters, sorting, paging, URLs)
//! - [`reconcile`]: Many-to-many selection reconciliation
//! - [`memory`]: Return-URL and page-size memory
//! - [`office`]: Screen-level operations
//! - [`error`]: Store error translation and user messages
//! - [`config`]: Configuration

pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod models;
pub mod office;
pub mod query;
pub mod reconcile;

// Re-export commonly used types
pub use config::{OfficeConfig, APP_NAME, APP_VERSION};
pub use db::Database;
pub use error::{OfficeError, OfficeResult};
pub use models::{Appointment, Coverage, Doctor, Lookup, LookupKind, Patient, ValidationErrors};
pub use office::{Office, Saved, Screen};
pub use query::{ListRequest, ListState, Page};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

use office::{AppointmentForm, AppointmentIndex, DoctorForm, ListView, PatientForm, PhotoUpload};
use query::{AppointmentListItem, DoctorListItem, PatientListItem, APPOINTMENT_SCREEN, DOCTOR_SCREEN, PATIENT_SCREEN};

/// Install the global `tracing` subscriber. `RUST_LOG` wins over
/// `filter`. Later calls are no-ops.
#[uniffi::export]
pub fn init_logging(filter: String) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .try_init();
    tracing::info!("{} starting v{}", APP_NAME, APP_VERSION);
}

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedicalOfficeError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Busy: {0}")]
    Busy(String),
}

impl From<OfficeError> for MedicalOfficeError {
    fn from(e: OfficeError) -> Self {
        match e {
            OfficeError::NotFound(what) => MedicalOfficeError::NotFound(what),
            OfficeError::Validation(errors) => MedicalOfficeError::InvalidInput(errors.to_string()),
            // Raw store text stays in the log
            busy @ OfficeError::Transient(_) => MedicalOfficeError::Busy(busy.user_message()),
            other => MedicalOfficeError::DatabaseError(other.user_message()),
        }
    }
}

impl From<config::ConfigError> for MedicalOfficeError {
    fn from(e: config::ConfigError) -> Self {
        MedicalOfficeError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedicalOfficeError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedicalOfficeError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open an office from a JSON configuration document.
#[uniffi::export]
pub fn open_office(config_json: String) -> Result<Arc<MedicalOfficeCore>, MedicalOfficeError> {
    let config = OfficeConfig::from_json_str(&config_json)?;
    let office = Office::open(config)?;
    Ok(Arc::new(MedicalOfficeCore {
        office: Mutex::new(office),
    }))
}

/// Open an in-memory office (for testing and demos).
#[uniffi::export]
pub fn open_office_in_memory(seed_sample_data: bool) -> Result<Arc<MedicalOfficeCore>, MedicalOfficeError> {
    let config = OfficeConfig {
        seed_sample_data,
        ..OfficeConfig::default()
    };
    let office = Office::open(config)?;
    Ok(Arc::new(MedicalOfficeCore {
        office: Mutex::new(office),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe office wrapper for FFI. One instance per user session.
#[derive(uniffi::Object)]
pub struct MedicalOfficeCore {
    office: Mutex<Office>,
}

#[uniffi::export]
impl MedicalOfficeCore {
    /// Change the user recorded in audit columns.
    pub fn set_acting_user(&self, user: String) -> Result<(), MedicalOfficeError> {
        self.office.lock()?.set_acting_user(user);
        Ok(())
    }

    /// Where "back to list" points for a screen right now.
    pub fn return_url(&self, screen: String) -> Result<String, MedicalOfficeError> {
        let office = self.office.lock()?;
        Ok(office.session().return_urls.return_url(&screen))
    }

    /// Leave a detail-type screen without saving; returns the redirect.
    pub fn cancel(&self, screen: String) -> Result<String, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        let screen = match screen.as_str() {
            s if s == DOCTOR_SCREEN.key => &DOCTOR_SCREEN,
            s if s == APPOINTMENT_SCREEN.key => &APPOINTMENT_SCREEN,
            s if s == query::LOOKUP_SCREEN.key => &query::LOOKUP_SCREEN,
            _ => &PATIENT_SCREEN,
        };
        Ok(office.cancel(screen))
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Patient list for a query string such as `SearchString=fl&page=2`.
    pub fn list_patients(&self, query: String) -> Result<FfiPatientList, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        let request = ListRequest::parse(&query, &PATIENT_SCREEN);
        let view = office.list_patients(&request)?;
        let today = office.today();
        Ok(FfiPatientList {
            info: FfiPageInfo::from_view(&view),
            rows: view
                .page
                .items
                .into_iter()
                .map(|item| FfiPatientRow::from_item(item, today))
                .collect(),
        })
    }

    /// Open a patient for editing; `referrer` is the page the user came from.
    pub fn begin_patient_edit(
        &self,
        id: i64,
        referrer: Option<String>,
    ) -> Result<FfiPatientEditor, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        let screen = office.begin_patient_edit(id, referrer.as_deref())?;
        Ok(FfiPatientEditor::from_screen(screen))
    }

    pub fn begin_patient_create(&self, referrer: Option<String>) -> Result<FfiPatientEditor, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        let screen = office.begin_patient_create(referrer.as_deref())?;
        Ok(FfiPatientEditor::from_screen(screen))
    }

    /// Save a patient. Rejections the user can fix come back in the
    /// outcome rather than as errors.
    pub fn save_patient(&self, input: FfiPatientInput) -> Result<FfiSaveOutcome, MedicalOfficeError> {
        let form = match input.into_form() {
            Ok(form) => form,
            Err(errors) => return Ok(FfiSaveOutcome::rejected(&OfficeError::Validation(errors))),
        };
        let mut office = self.office.lock()?;
        FfiSaveOutcome::from_result(office.save_patient(&form))
    }

    pub fn delete_patient(&self, id: i64) -> Result<FfiSaveOutcome, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        FfiSaveOutcome::from_delete(id, office.delete_patient(id))
    }

    /// Full-size photo bytes, if the patient has one.
    pub fn patient_photo(&self, id: i64) -> Result<Option<Vec<u8>>, MedicalOfficeError> {
        let office = self.office.lock()?;
        Ok(office.patient_photo(id)?.map(|photo| photo.content))
    }

    // =========================================================================
    // Doctor Operations
    // =========================================================================

    pub fn list_doctors(&self, query: String) -> Result<FfiDoctorList, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        let request = ListRequest::parse(&query, &DOCTOR_SCREEN);
        let view = office.list_doctors(&request)?;
        Ok(FfiDoctorList {
            info: FfiPageInfo::from_view(&view),
            rows: view.page.items.into_iter().map(Into::into).collect(),
        })
    }

    pub fn save_doctor(&self, input: FfiDoctorInput) -> Result<FfiSaveOutcome, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        FfiSaveOutcome::from_result(office.save_doctor(&input.into()))
    }

    pub fn delete_doctor(&self, id: i64) -> Result<FfiSaveOutcome, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        FfiSaveOutcome::from_delete(id, office.delete_doctor(id))
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// A patient's appointments. Without a valid `PatientID` the result
    /// carries only a redirect.
    pub fn list_appointments(&self, query: String) -> Result<FfiAppointmentList, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        let request = ListRequest::parse(&query, &APPOINTMENT_SCREEN);
        Ok(match office.list_appointments(&request)? {
            AppointmentIndex::List { patient, view } => FfiAppointmentList {
                patient_id: Some(patient.patient.id),
                patient_summary: Some(patient.patient.summary()),
                info: Some(FfiPageInfo::from_view(&view)),
                rows: view.page.items.into_iter().map(Into::into).collect(),
                redirect_url: None,
            },
            AppointmentIndex::Redirect(url) => FfiAppointmentList {
                patient_id: None,
                patient_summary: None,
                info: None,
                rows: Vec::new(),
                redirect_url: Some(url),
            },
        })
    }

    pub fn save_appointment(&self, input: FfiAppointmentInput) -> Result<FfiSaveOutcome, MedicalOfficeError> {
        let form = input.into_form()?;
        let mut office = self.office.lock()?;
        FfiSaveOutcome::from_result(office.save_appointment(&form))
    }

    pub fn delete_appointment(&self, id: i64) -> Result<FfiSaveOutcome, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        FfiSaveOutcome::from_delete(id, office.delete_appointment(id))
    }

    // =========================================================================
    // Lookup Operations
    // =========================================================================

    pub fn list_lookups(&self) -> Result<Vec<FfiLookup>, MedicalOfficeError> {
        let mut office = self.office.lock()?;
        let tables = office.list_lookups()?;
        Ok(tables
            .tables
            .into_iter()
            .flat_map(|(_, rows)| rows)
            .map(Into::into)
            .collect())
    }

    /// Insert (`id == 0`) or rename a lookup row.
    pub fn save_lookup(&self, lookup: FfiLookup) -> Result<FfiSaveOutcome, MedicalOfficeError> {
        let lookup = Lookup::try_from(lookup)?;
        let mut office = self.office.lock()?;
        FfiSaveOutcome::from_result(office.save_lookup(&lookup))
    }

    pub fn delete_lookup(&self, kind: String, id: i64) -> Result<FfiSaveOutcome, MedicalOfficeError> {
        let kind = parse_kind(&kind)?;
        let mut office = self.office.lock()?;
        FfiSaveOutcome::from_delete(id, office.delete_lookup(kind, id))
    }
}

fn parse_kind(kind: &str) -> Result<LookupKind, MedicalOfficeError> {
    kind.parse().map_err(MedicalOfficeError::InvalidInput)
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe list paging and sort state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPageInfo {
    pub page_index: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub page_size: u32,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub sort_field: String,
    pub sort_direction: String,
    pub url: String,
    pub filter_count: u32,
    pub filter_feedback: String,
    pub page_size_options: Vec<u32>,
}

impl FfiPageInfo {
    fn from_view<T>(view: &ListView<T>) -> Self {
        Self {
            page_index: view.page.page_index,
            total_pages: view.page.total_pages,
            total_count: view.page.total_count,
            page_size: view.page.page_size,
            has_previous_page: view.page.has_previous_page(),
            has_next_page: view.page.has_next_page(),
            sort_field: view.state.sort_field.clone(),
            sort_direction: view.state.sort_direction.to_string(),
            url: view.url.clone(),
            filter_count: view.filter_count as u32,
            filter_feedback: view.filter_feedback.clone(),
            page_size_options: view.page_size_options.clone(),
        }
    }
}

/// FFI-safe patient list row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientRow {
    pub id: i64,
    pub summary: String,
    pub age_summary: String,
    pub exp_yr_visits: u8,
    pub phone: String,
    pub coverage: String,
    pub doctor: String,
    pub medical_trial: Option<String>,
    pub conditions: Vec<String>,
    /// `data:` URI of the thumbnail
    pub thumbnail: Option<String>,
}

impl FfiPatientRow {
    fn from_item(item: PatientListItem, today: NaiveDate) -> Self {
        Self {
            id: item.patient.id,
            summary: item.patient.summary(),
            age_summary: item.patient.age_summary(today),
            exp_yr_visits: item.patient.exp_yr_visits,
            phone: item.patient.phone_formatted(),
            coverage: item.patient.coverage.display_name().to_string(),
            doctor: item.doctor_formal_name(),
            medical_trial: item.medical_trial,
            conditions: item.conditions.into_iter().map(|c| c.name).collect(),
            thumbnail: item.thumbnail.map(|t| t.data_uri()),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientList {
    pub info: FfiPageInfo,
    pub rows: Vec<FfiPatientRow>,
}

/// FFI-safe drop-down option.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOption {
    pub id: i64,
    pub name: String,
}

impl From<reconcile::SelectOption> for FfiOption {
    fn from(option: reconcile::SelectOption) -> Self {
        Self {
            id: option.id,
            name: option.name,
        }
    }
}

fn ffi_options(options: Vec<reconcile::SelectOption>) -> Vec<FfiOption> {
    options.into_iter().map(Into::into).collect()
}

/// FFI-safe patient form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientInput {
    pub id: Option<i64>,
    pub ohip: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// `yyyy-mm-dd`
    pub dob: Option<String>,
    pub exp_yr_visits: u8,
    pub phone: String,
    pub email: Option<String>,
    /// "OHIP", "OutOfProvince" or "International"
    pub coverage: String,
    pub medical_trial_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub selected_conditions: Option<Vec<i64>>,
    pub photo: Option<Vec<u8>>,
    pub photo_mime_type: Option<String>,
    pub remove_photo: bool,
    pub row_version: Option<String>,
}

impl FfiPatientInput {
    fn into_form(self) -> Result<PatientForm, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let dob = match self.dob.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add(models::patient_fields::DOB, "Please enter a valid date of birth.");
                    None
                }
            },
            None => None,
        };
        let coverage = match self.coverage.parse::<Coverage>() {
            Ok(coverage) => coverage,
            Err(message) => {
                errors.add(models::patient_fields::COVERAGE, message);
                Coverage::Ohip
            }
        };
        errors.into_result()?;

        Ok(PatientForm {
            id: self.id,
            ohip: self.ohip,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            dob,
            exp_yr_visits: self.exp_yr_visits,
            phone: self.phone,
            email: self.email,
            coverage,
            medical_trial_id: self.medical_trial_id,
            doctor_id: self.doctor_id,
            selected_conditions: self.selected_conditions,
            photo_upload: self.photo.map(|content| PhotoUpload {
                content,
                mime_type: self.photo_mime_type.unwrap_or_default(),
            }),
            remove_photo: self.remove_photo,
            row_version: self.row_version,
        })
    }
}

impl From<PatientForm> for FfiPatientInput {
    fn from(form: PatientForm) -> Self {
        Self {
            id: form.id,
            ohip: form.ohip,
            first_name: form.first_name,
            middle_name: form.middle_name,
            last_name: form.last_name,
            dob: form.dob.map(|d| d.format("%Y-%m-%d").to_string()),
            exp_yr_visits: form.exp_yr_visits,
            phone: form.phone,
            email: form.email,
            coverage: form.coverage.as_str().to_string(),
            medical_trial_id: form.medical_trial_id,
            doctor_id: form.doctor_id,
            selected_conditions: form.selected_conditions,
            photo: None,
            photo_mime_type: None,
            remove_photo: false,
            row_version: form.row_version,
        }
    }
}

/// FFI-safe patient edit screen.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientEditor {
    pub input: FfiPatientInput,
    pub doctors: Vec<FfiOption>,
    pub medical_trials: Vec<FfiOption>,
    pub selected_conditions: Vec<FfiOption>,
    pub available_conditions: Vec<FfiOption>,
    pub thumbnail: Option<String>,
    pub return_url: String,
}

impl FfiPatientEditor {
    fn from_screen(screen: Screen<office::PatientEditor>) -> Self {
        let editor = screen.model;
        Self {
            input: editor.form.into(),
            doctors: ffi_options(editor.doctor_options),
            medical_trials: ffi_options(editor.medical_trial_options),
            selected_conditions: ffi_options(editor.selected_conditions),
            available_conditions: ffi_options(editor.available_conditions),
            thumbnail: editor.thumbnail.map(|t| t.data_uri()),
            return_url: screen.return_url,
        }
    }
}

/// FFI-safe doctor list row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctorRow {
    pub id: i64,
    pub formal_name: String,
    pub specialties: Vec<String>,
    pub patient_count: u32,
}

impl From<DoctorListItem> for FfiDoctorRow {
    fn from(item: DoctorListItem) -> Self {
        Self {
            id: item.doctor.id,
            formal_name: item.doctor.formal_name(),
            specialties: item.specialties.into_iter().map(|s| s.name).collect(),
            patient_count: item.patient_count,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctorList {
    pub info: FfiPageInfo,
    pub rows: Vec<FfiDoctorRow>,
}

/// FFI-safe doctor form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctorInput {
    pub id: Option<i64>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub selected_specialties: Option<Vec<i64>>,
}

impl From<FfiDoctorInput> for DoctorForm {
    fn from(input: FfiDoctorInput) -> Self {
        DoctorForm {
            id: input.id,
            first_name: input.first_name,
            middle_name: input.middle_name,
            last_name: input.last_name,
            selected_specialties: input.selected_specialties,
        }
    }
}

/// FFI-safe appointment list row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointmentRow {
    pub id: i64,
    pub start_date: String,
    pub start_time: String,
    pub duration: String,
    pub reason: Option<String>,
    pub extra_fee: f64,
    pub doctor: String,
    pub notes: String,
}

impl From<AppointmentListItem> for FfiAppointmentRow {
    fn from(item: AppointmentListItem) -> Self {
        Self {
            id: item.appointment.id,
            start_date: item.appointment.start_date_summary(),
            start_time: item.appointment.start_time_summary(),
            duration: item.appointment.duration_summary(),
            reason: item.reason,
            extra_fee: item.appointment.extra_fee,
            doctor: item.doctor_formal_name,
            notes: item.appointment.notes,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointmentList {
    pub patient_id: Option<i64>,
    pub patient_summary: Option<String>,
    pub info: Option<FfiPageInfo>,
    pub rows: Vec<FfiAppointmentRow>,
    /// Set when there was no patient to list for
    pub redirect_url: Option<String>,
}

/// FFI-safe appointment form. Times are `yyyy-mm-ddThh:mm`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointmentInput {
    pub id: Option<i64>,
    pub patient_id: i64,
    pub doctor_id: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: String,
    pub extra_fee: f64,
    pub appointment_reason_id: Option<i64>,
}

fn parse_time(text: Option<&str>) -> Result<Option<chrono::NaiveDateTime>, MedicalOfficeError> {
    match text.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M")
            .map(Some)
            .map_err(|e| MedicalOfficeError::InvalidInput(format!("{}: {}", text, e))),
        None => Ok(None),
    }
}

impl FfiAppointmentInput {
    fn into_form(self) -> Result<AppointmentForm, MedicalOfficeError> {
        Ok(AppointmentForm {
            id: self.id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            start_time: parse_time(self.start_time.as_deref())?,
            end_time: parse_time(self.end_time.as_deref())?,
            notes: self.notes,
            extra_fee: self.extra_fee,
            appointment_reason_id: self.appointment_reason_id,
        })
    }
}

/// FFI-safe lookup row. `kind` is e.g. "Condition".
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLookup {
    pub kind: String,
    pub id: i64,
    pub name: String,
}

impl From<Lookup> for FfiLookup {
    fn from(lookup: Lookup) -> Self {
        Self {
            kind: lookup.kind.as_str().to_string(),
            id: lookup.id,
            name: lookup.name,
        }
    }
}

impl TryFrom<FfiLookup> for Lookup {
    type Error = MedicalOfficeError;

    fn try_from(lookup: FfiLookup) -> Result<Self, Self::Error> {
        Ok(Lookup {
            kind: parse_kind(&lookup.kind)?,
            id: lookup.id,
            name: lookup.name,
        })
    }
}

/// FFI-safe form error.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFieldError {
    /// `None` for whole-record errors
    pub field: Option<String>,
    pub message: String,
}

/// FFI-safe stored-vs-submitted difference.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFieldDifference {
    pub field: String,
    pub current_value: String,
    pub attempted_value: String,
}

/// Result of a save or delete.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSaveOutcome {
    pub id: Option<i64>,
    /// Where to go next; `None` when the user stays on the form
    pub redirect_url: Option<String>,
    pub message: Option<String>,
    pub field_errors: Vec<FfiFieldError>,
    /// Token to resubmit with after a concurrency conflict
    pub refreshed_version: Option<String>,
    pub differences: Vec<FfiFieldDifference>,
}

impl FfiSaveOutcome {
    fn saved(saved: Saved) -> Self {
        Self {
            id: Some(saved.id),
            redirect_url: Some(saved.redirect_url),
            message: None,
            field_errors: Vec::new(),
            refreshed_version: None,
            differences: Vec::new(),
        }
    }

    fn rejected(error: &OfficeError) -> Self {
        let (refreshed_version, differences) = match error {
            OfficeError::Concurrency(conflict) => (
                conflict.refreshed_version.clone(),
                conflict
                    .differences
                    .iter()
                    .map(|d| FfiFieldDifference {
                        field: d.field.clone(),
                        current_value: d.current_value.clone(),
                        attempted_value: d.attempted_value.clone(),
                    })
                    .collect(),
            ),
            _ => (None, Vec::new()),
        };
        Self {
            id: None,
            redirect_url: None,
            message: Some(error.user_message()),
            field_errors: error
                .form_errors()
                .into_iter()
                .map(|e| FfiFieldError {
                    field: e.field,
                    message: e.message,
                })
                .collect(),
            refreshed_version,
            differences,
        }
    }

    /// Fixable rejections become an outcome; the rest stay errors.
    fn from_result(result: OfficeResult<Saved>) -> Result<Self, MedicalOfficeError> {
        match result {
            Ok(saved) => Ok(Self::saved(saved)),
            Err(
                e @ (OfficeError::Validation(_)
                | OfficeError::Uniqueness { .. }
                | OfficeError::Referential { .. }
                | OfficeError::Concurrency(_)),
            ) => Ok(Self::rejected(&e)),
            Err(e) => Err(e.into()),
        }
    }

    fn from_delete(id: i64, result: OfficeResult<String>) -> Result<Self, MedicalOfficeError> {
        Self::from_result(result.map(|redirect_url| Saved { id, redirect_url }))
    }
}
