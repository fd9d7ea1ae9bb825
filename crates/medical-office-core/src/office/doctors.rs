//! Doctor screens. The list is small, so it is filtered, sorted and
//! paged in memory.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ListView, Office, Saved, Screen};
use crate::db::DbError;
use crate::error::{OfficeError, OfficeResult, StoreContext};
use crate::models::{normalize_optional, Doctor, LookupKind, Validate};
use crate::query::{
    filter_sort_page, sort_doctors, DoctorCriteria, DoctorListItem, DoctorSort, ListRequest, DOCTOR_SCREEN,
};
use crate::reconcile::{selection_lists, SelectOption};

/// Doctor create/edit form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorForm {
    pub id: Option<i64>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// Checked specialties; `None` when nothing was checked
    pub selected_specialties: Option<Vec<i64>>,
}

impl DoctorForm {
    pub fn from_doctor(doctor: &Doctor, specialties: &BTreeSet<i64>) -> Self {
        Self {
            id: Some(doctor.id),
            first_name: doctor.first_name.clone(),
            middle_name: doctor.middle_name.clone(),
            last_name: doctor.last_name.clone(),
            selected_specialties: Some(specialties.iter().copied().collect()),
        }
    }

    pub fn to_doctor(&self) -> Doctor {
        Doctor {
            id: self.id.unwrap_or(0),
            middle_name: normalize_optional(self.middle_name.clone()),
            ..Doctor::new(self.first_name.trim(), self.last_name.trim())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorEditor {
    pub form: DoctorForm,
    pub selected_specialties: Vec<SelectOption>,
    pub available_specialties: Vec<SelectOption>,
}

impl Office {
    pub fn list_doctors(&mut self, request: &ListRequest) -> OfficeResult<ListView<DoctorListItem>> {
        let (state, sort) = self.enter_list::<DoctorSort>(&DOCTOR_SCREEN, request);
        let criteria = DoctorCriteria::from_state(&state);
        let filters = criteria.filter_set();
        let items = self.read(self.db.doctor_list_items())?;
        let page = filter_sort_page(
            items,
            &filters,
            |rows| sort_doctors(rows, sort),
            state.page,
            state.page_size,
        );
        Ok(self.list_view(page, state, filters.len()))
    }

    /// Doctors for drop-downs, as "Last, First M", ordered by last then
    /// first name.
    pub fn doctor_options(&self) -> OfficeResult<Vec<SelectOption>> {
        Ok(self
            .read(self.db.list_doctors())?
            .into_iter()
            .map(|d| SelectOption {
                id: d.id,
                name: d.formal_name(),
            })
            .collect())
    }

    fn load_doctor_item(&self, id: i64) -> OfficeResult<DoctorListItem> {
        self.read(self.db.doctor_list_items())?
            .into_iter()
            .find(|item| item.doctor.id == id)
            .ok_or_else(|| OfficeError::not_found(format!("doctor {}", id)))
    }

    pub fn doctor_details(&mut self, id: i64, referrer: Option<&str>) -> OfficeResult<Screen<DoctorListItem>> {
        let item = self.load_doctor_item(id)?;
        Ok(self.screen(&DOCTOR_SCREEN, referrer, item))
    }

    pub fn doctor_editor(&self, form: DoctorForm) -> OfficeResult<DoctorEditor> {
        let current: BTreeSet<i64> = form.selected_specialties.iter().flatten().copied().collect();
        let specialties = self.read(self.db.lookup_options(LookupKind::Specialty))?;
        let (selected_specialties, available_specialties) = selection_lists(&specialties, &current);
        Ok(DoctorEditor {
            form,
            selected_specialties,
            available_specialties,
        })
    }

    pub fn begin_doctor_create(&mut self, referrer: Option<&str>) -> OfficeResult<Screen<DoctorEditor>> {
        let editor = self.doctor_editor(DoctorForm::default())?;
        Ok(self.screen(&DOCTOR_SCREEN, referrer, editor))
    }

    pub fn begin_doctor_edit(&mut self, id: i64, referrer: Option<&str>) -> OfficeResult<Screen<DoctorEditor>> {
        let doctor = self
            .read(self.db.get_doctor(id))?
            .ok_or_else(|| OfficeError::not_found(format!("doctor {}", id)))?;
        let specialties = self.read(self.db.doctor_specialty_ids(id))?;
        let editor = self.doctor_editor(DoctorForm::from_doctor(&doctor, &specialties))?;
        Ok(self.screen(&DOCTOR_SCREEN, referrer, editor))
    }

    /// Save a doctor and reconcile their specialties in one transaction.
    pub fn save_doctor(&mut self, form: &DoctorForm) -> OfficeResult<Saved> {
        let doctor = form.to_doctor();
        doctor.validate(&self.validation_context())?;

        let store = |e: DbError| OfficeError::from_store(e, &StoreContext::SAVE);
        let tx = self.db.begin().map_err(store)?;
        let id = match form.id {
            None => self.db.insert_doctor(&doctor).map_err(store)?.id,
            Some(id) => {
                if !self.db.update_doctor(&doctor).map_err(store)? {
                    return Err(OfficeError::not_found(format!("doctor {}", id)));
                }
                id
            }
        };
        self.db
            .reconcile_doctor_specialties(id, form.selected_specialties.as_deref())
            .map_err(store)?;
        tx.commit().map_err(|e| store(e.into()))?;

        info!(doctor_id = id, created = form.id.is_none(), "Saved doctor");
        Ok(Saved {
            id,
            redirect_url: self.finish(&DOCTOR_SCREEN),
        })
    }

    pub fn begin_doctor_delete(&mut self, id: i64, referrer: Option<&str>) -> OfficeResult<Screen<DoctorListItem>> {
        self.doctor_details(id, referrer)
    }

    /// Delete a doctor. Refused while any patient is assigned to them.
    pub fn delete_doctor(&mut self, id: i64) -> OfficeResult<String> {
        let deleted = self
            .db
            .delete_doctor(id)
            .map_err(|e| OfficeError::from_store(e, &StoreContext::DOCTOR_DELETE))?;
        if !deleted {
            return Err(OfficeError::not_found(format!("doctor {}", id)));
        }
        info!(doctor_id = id, "Deleted doctor");
        Ok(self.finish(&DOCTOR_SCREEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_trims_and_drops_blank_middle_name() {
        let form = DoctorForm {
            first_name: " Gregory ".into(),
            middle_name: Some("  ".into()),
            last_name: "House".into(),
            ..DoctorForm::default()
        };
        let doctor = form.to_doctor();
        assert_eq!(doctor.first_name, "Gregory");
        assert_eq!(doctor.middle_name, None);
        assert_eq!(doctor.formal_name(), "House, Gregory");
    }

    #[test]
    fn test_from_doctor_lists_specialties() {
        let mut doctor = Doctor::new("Gregory", "House");
        doctor.id = 4;
        let form = DoctorForm::from_doctor(&doctor, &[2, 1].into_iter().collect());
        assert_eq!(form.id, Some(4));
        assert_eq!(form.selected_specialties, Some(vec![1, 2]));
    }
}
