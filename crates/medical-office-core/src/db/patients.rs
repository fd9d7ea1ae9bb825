//! Patient database operations.
//!
//! Every insert and update stamps a fresh `row_version`. Updates only
//! apply when the caller's token still matches the stored one.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::sql::SelectBuilder;
use super::{Database, DbResult};
use crate::models::{AuditInfo, Coverage, Patient};
use crate::query::{
    Page, PageWindow, PatientCriteria, PatientListItem, PatientSort, SortDirection, SortState,
};

impl ToSql for Coverage {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Coverage {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Outcome of a token-checked update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedUpdate {
    /// Saved; carries the new token.
    Updated { row_version: String },
    /// The stored token no longer matches.
    Conflict,
    /// The row is gone.
    NotFound,
}

fn new_row_version() -> String {
    Uuid::new_v4().simple().to_string()
}

const PATIENT_COLUMNS: &str = "p.id, p.ohip, p.first_name, p.middle_name, p.last_name, p.dob, \
     p.exp_yr_visits, p.phone, p.email, p.coverage, p.medical_trial_id, p.doctor_id, \
     p.row_version, p.created_by, p.created_on, p.updated_by, p.updated_on";

/// Number of columns in [`PATIENT_COLUMNS`].
const PATIENT_COLUMN_COUNT: usize = 17;

const LIST_COLUMNS_EXTRA: &str = "d.first_name, d.middle_name, d.last_name, t.name";

const LIST_FROM: &str = "patients p \
     JOIN doctors d ON d.id = p.doctor_id \
     LEFT JOIN medical_trials t ON t.id = p.medical_trial_id";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        ohip: row.get(1)?,
        first_name: row.get(2)?,
        middle_name: row.get(3)?,
        last_name: row.get(4)?,
        dob: row.get(5)?,
        exp_yr_visits: row.get(6)?,
        phone: row.get(7)?,
        email: row.get(8)?,
        coverage: row.get(9)?,
        medical_trial_id: row.get(10)?,
        doctor_id: row.get(11)?,
        row_version: row.get(12)?,
        audit: AuditInfo {
            created_by: row.get(13)?,
            created_on: row.get(14)?,
            updated_by: row.get(15)?,
            updated_on: row.get(16)?,
        },
    })
}

/// Patient plus the joined doctor and trial columns; conditions and
/// thumbnail are filled in afterwards.
fn list_row(row: &Row<'_>) -> rusqlite::Result<PatientListItem> {
    let n = PATIENT_COLUMN_COUNT;
    Ok(PatientListItem {
        patient: patient_from_row(row)?,
        doctor_first_name: row.get(n)?,
        doctor_middle_name: row.get(n + 1)?,
        doctor_last_name: row.get(n + 2)?,
        medical_trial: row.get(n + 3)?,
        conditions: Vec::new(),
        thumbnail: None,
    })
}

/// WHERE clause for the patient list.
fn patient_filters(criteria: &PatientCriteria) -> SelectBuilder {
    let mut q = SelectBuilder::new(LIST_FROM);
    if let Some(search) = &criteria.search {
        q.and_contains_any(&["p.first_name", "p.last_name"], search);
    }
    if let Some(id) = criteria.doctor_id {
        q.and_where("p.doctor_id = ?", [Value::Integer(id)]);
    }
    if let Some(id) = criteria.medical_trial_id {
        q.and_where("p.medical_trial_id = ?", [Value::Integer(id)]);
    }
    if let Some(id) = criteria.condition_id {
        q.and_where(
            "EXISTS (SELECT 1 FROM patient_conditions pc WHERE pc.patient_id = p.id AND pc.condition_id = ?)",
            [Value::Integer(id)],
        );
    }
    if let Some(coverage) = criteria.coverage {
        q.and_where("p.coverage = ?", [Value::Text(coverage.as_str().to_string())]);
    }
    q
}

/// ORDER BY matching `PatientSort::compare` followed by `patient_tiebreak`.
fn patient_ordering(q: &mut SelectBuilder, sort: SortState<PatientSort>) {
    let dir = sort.direction.sql();
    match sort.field {
        PatientSort::Patient => {
            q.order_by(format!("p.last_name {}", dir));
            q.order_by(format!("p.first_name {}", dir));
        }
        // Youngest first when ascending; NULL birth dates sort last
        PatientSort::Age => {
            q.order_by(format!("p.dob {}", sort.direction.toggle().sql()));
        }
        PatientSort::VisitsPerYear => {
            q.order_by(format!("p.exp_yr_visits {}", dir));
        }
        PatientSort::Doctor => {
            q.order_by(format!("d.last_name {}", dir));
            q.order_by(format!("d.first_name {}", dir));
        }
    }
    let asc = SortDirection::Asc.sql();
    q.order_by(format!("p.last_name {}", asc));
    q.order_by(format!("p.first_name {}", asc));
    q.order_by(format!("p.id {}", asc));
}

impl Database {
    /// Insert a new patient. Returns it with ID, token and audit stamps.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<Patient> {
        let (user, now) = self.audit_stamp();
        let row_version = new_row_version();
        self.conn.execute(
            r#"
            INSERT INTO patients (
                ohip, first_name, middle_name, last_name, dob, exp_yr_visits,
                phone, email, coverage, medical_trial_id, doctor_id, row_version,
                created_by, created_on, updated_by, updated_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?13, ?14)
            "#,
            params![
                patient.ohip,
                patient.first_name,
                patient.middle_name,
                patient.last_name,
                patient.dob,
                patient.exp_yr_visits,
                patient.phone,
                patient.email,
                patient.coverage,
                patient.medical_trial_id,
                patient.doctor_id,
                row_version,
                user,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(patient_id = id, "Inserted patient");
        Ok(Patient {
            id,
            row_version: Some(row_version),
            audit: AuditInfo {
                created_by: Some(user.clone()),
                created_on: Some(now),
                updated_by: Some(user),
                updated_on: Some(now),
            },
            ..patient.clone()
        })
    }

    /// Update a patient if its stored token still equals
    /// `expected_version`.
    pub fn update_patient(&self, patient: &Patient, expected_version: &str) -> DbResult<VersionedUpdate> {
        let (user, now) = self.audit_stamp();
        let row_version = new_row_version();
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                ohip = ?2,
                first_name = ?3,
                middle_name = ?4,
                last_name = ?5,
                dob = ?6,
                exp_yr_visits = ?7,
                phone = ?8,
                email = ?9,
                coverage = ?10,
                medical_trial_id = ?11,
                doctor_id = ?12,
                row_version = ?13,
                updated_by = ?14,
                updated_on = ?15
            WHERE id = ?1 AND row_version = ?16
            "#,
            params![
                patient.id,
                patient.ohip,
                patient.first_name,
                patient.middle_name,
                patient.last_name,
                patient.dob,
                patient.exp_yr_visits,
                patient.phone,
                patient.email,
                patient.coverage,
                patient.medical_trial_id,
                patient.doctor_id,
                row_version,
                user,
                now,
                expected_version,
            ],
        )?;
        if rows_affected > 0 {
            return Ok(VersionedUpdate::Updated { row_version });
        }

        let exists = self
            .conn
            .query_row("SELECT 1 FROM patients WHERE id = ?", [patient.id], |_| Ok(()))
            .optional()?
            .is_some();
        if exists {
            debug!(patient_id = patient.id, "Stale row version");
            Ok(VersionedUpdate::Conflict)
        } else {
            Ok(VersionedUpdate::NotFound)
        }
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients p WHERE p.id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All patients by last name, then first name.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients p ORDER BY p.last_name, p.first_name, p.id",
            PATIENT_COLUMNS
        ))?;
        let patients = stmt.query_map([], patient_from_row)?;
        patients.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a patient with their conditions, photos and appointments.
    pub fn delete_patient(&self, id: i64) -> DbResult<bool> {
        let rows = self.conn.execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    /// One list row with conditions and thumbnail.
    pub fn patient_list_item(&self, id: i64) -> DbResult<Option<PatientListItem>> {
        let mut q = SelectBuilder::new(LIST_FROM);
        q.and_where("p.id = ?", [Value::Integer(id)]);
        let sql = q.select_sql(&format!("{}, {}", PATIENT_COLUMNS, LIST_COLUMNS_EXTRA), None);
        let row = self
            .conn
            .query_row(&sql, params_from_iter(q.params()), list_row)
            .optional()?;
        row.map(|r| self.complete_list_item(r)).transpose()
    }

    fn complete_list_item(&self, mut item: PatientListItem) -> DbResult<PatientListItem> {
        item.conditions = self.conditions_for_patient(item.patient.id)?;
        item.thumbnail = self.get_patient_thumbnail(item.patient.id)?;
        Ok(item)
    }

    /// Every patient as a list row, unsorted, for the in-memory pipeline.
    pub fn patient_list_items(&self) -> DbResult<Vec<PatientListItem>> {
        let q = SelectBuilder::new(LIST_FROM);
        let mut stmt = self
            .conn
            .prepare(&q.select_sql(&format!("{}, {}", PATIENT_COLUMNS, LIST_COLUMNS_EXTRA), None))?;
        let rows = stmt
            .query_map([], list_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|r| self.complete_list_item(r)).collect()
    }

    /// Number of patients matching `criteria`.
    pub fn count_patients(&self, criteria: &PatientCriteria) -> DbResult<u64> {
        let q = patient_filters(criteria);
        let count: i64 = self
            .conn
            .query_row(&q.count_sql(), params_from_iter(q.params()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Filter, sort and page patients in SQL. Only the requested page is
    /// loaded.
    pub fn query_patients(
        &self,
        criteria: &PatientCriteria,
        sort: SortState<PatientSort>,
        requested_page: u32,
        page_size: u32,
    ) -> DbResult<Page<PatientListItem>> {
        let total = self.count_patients(criteria)?;
        let window = PageWindow::new(total, requested_page, page_size);

        let mut q = patient_filters(criteria);
        patient_ordering(&mut q, sort);
        let sql = q.select_sql(
            &format!("{}, {}", PATIENT_COLUMNS, LIST_COLUMNS_EXTRA),
            Some((window.page_size, window.offset)),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(q.params()), list_row)?
            .collect::<Result<Vec<_>, _>>()?;
        let items = rows
            .into_iter()
            .map(|r| self.complete_list_item(r))
            .collect::<DbResult<Vec<_>>>()?;
        debug!(
            total,
            page = window.page_index,
            rows = items.len(),
            "Queried patient page"
        );
        Ok(window.into_page(items))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::StoreFailure;
    use crate::models::Doctor;

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let doc = db
            .insert_doctor(&Doctor::new("Gregory", "House").with_middle_name("A"))
            .unwrap();
        (db, doc.id)
    }

    fn fred(doctor_id: i64) -> Patient {
        let mut p = Patient::new("Fred", "Flintstone", "9055551212", doctor_id);
        p.ohip = Some("1231231234".into());
        p.dob = NaiveDate::from_ymd_opt(1955, 9, 1);
        p
    }

    #[test]
    fn test_insert_and_get_patient() {
        let (db, doc) = setup();
        let saved = db.insert_patient(&fred(doc)).unwrap();
        assert!(saved.id > 0);
        assert_eq!(saved.row_version.as_ref().map(String::len), Some(32));

        let loaded = db.get_patient(saved.id).unwrap().unwrap();
        assert_eq!(loaded.coverage, Coverage::Ohip);
        assert_eq!(loaded.dob, NaiveDate::from_ymd_opt(1955, 9, 1));
        assert_eq!(loaded.row_version, saved.row_version);
        assert!(db.get_patient(9999).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_ohip_rejected() {
        let (db, doc) = setup();
        db.insert_patient(&fred(doc)).unwrap();
        let mut dup = Patient::new("Dino", "Flintstone", "9055551212", doc);
        dup.ohip = Some("1231231234".into());
        let err = db.insert_patient(&dup).unwrap_err();
        assert_eq!(
            err.failure(),
            StoreFailure::Unique {
                columns: vec!["patients.ohip".to_string()]
            }
        );
        assert_eq!(db.list_patients().unwrap().len(), 1);
    }

    #[test]
    fn test_update_checks_row_version() {
        let (db, doc) = setup();
        let saved = db.insert_patient(&fred(doc)).unwrap();
        let token = saved.row_version.clone().unwrap();

        let mut edit = saved.clone();
        edit.exp_yr_visits = 6;
        let first = db.update_patient(&edit, &token).unwrap();
        let new_token = match first {
            VersionedUpdate::Updated { row_version } => row_version,
            other => panic!("expected update, got {:?}", other),
        };
        assert_ne!(new_token, token);

        // Second writer still holds the old token
        edit.exp_yr_visits = 9;
        assert_eq!(db.update_patient(&edit, &token).unwrap(), VersionedUpdate::Conflict);
        assert_eq!(db.get_patient(saved.id).unwrap().unwrap().exp_yr_visits, 6);

        assert!(matches!(
            db.update_patient(&edit, &new_token).unwrap(),
            VersionedUpdate::Updated { .. }
        ));

        db.delete_patient(saved.id).unwrap();
        assert_eq!(db.update_patient(&edit, &new_token).unwrap(), VersionedUpdate::NotFound);
    }

    #[test]
    fn test_query_patients_filters_sorts_pages() {
        let (db, doc) = setup();
        for (first, last) in [("Fred", "Flintstone"), ("Wilma", "Flintstone"), ("Barney", "Rubble"), ("Betty", "Rubble")] {
            let mut p = Patient::new(first, last, "9055551212", doc);
            p.coverage = Coverage::International;
            db.insert_patient(&p).unwrap();
        }

        let criteria = PatientCriteria {
            search: Some("RUB".into()),
            ..Default::default()
        };
        let page = db
            .query_patients(&criteria, SortState::default(), 1, 10)
            .unwrap();
        let names: Vec<&str> = page.items.iter().map(|r| r.patient.first_name.as_str()).collect();
        assert_eq!(names, vec!["Barney", "Betty"]);
        assert_eq!(page.items[0].doctor_formal_name(), "House, Gregory A");

        let page = db
            .query_patients(
                &PatientCriteria::default(),
                SortState::new(PatientSort::Patient, SortDirection::Desc),
                99,
                3,
            )
            .unwrap();
        assert_eq!(page.page_index, 2);
        assert_eq!(page.total_count, 4);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].patient.first_name, "Fred");
    }

    #[test]
    fn test_patient_list_item() {
        let (db, doc) = setup();
        let saved = db.insert_patient(&fred(doc)).unwrap();
        let item = db.patient_list_item(saved.id).unwrap().unwrap();
        assert_eq!(item.patient.id, saved.id);
        assert!(item.medical_trial.is_none());
        assert!(db.patient_list_item(saved.id + 1).unwrap().is_none());
    }
}
