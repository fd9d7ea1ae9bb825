//! Appointment database operations.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::sql::SelectBuilder;
use super::{Database, DbResult};
use crate::models::{Appointment, Doctor};
use crate::query::{
    AppointmentCriteria, AppointmentListItem, AppointmentSort, Page, PageWindow, SortDirection,
    SortState,
};

const APPOINTMENT_COLUMNS: &str = "a.id, a.start_time, a.end_time, a.notes, a.extra_fee, \
     a.doctor_id, a.patient_id, a.appointment_reason_id";

const LIST_COLUMNS: &str = "a.id, a.start_time, a.end_time, a.notes, a.extra_fee, \
     a.doctor_id, a.patient_id, a.appointment_reason_id, \
     r.name, d.first_name, d.middle_name, d.last_name";

const LIST_FROM: &str = "appointments a \
     JOIN doctors d ON d.id = a.doctor_id \
     LEFT JOIN appointment_reasons r ON r.id = a.appointment_reason_id";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        start_time: row.get(1)?,
        end_time: row.get(2)?,
        notes: row.get(3)?,
        extra_fee: row.get(4)?,
        doctor_id: row.get(5)?,
        patient_id: row.get(6)?,
        appointment_reason_id: row.get(7)?,
    })
}

fn list_row(row: &Row<'_>) -> rusqlite::Result<AppointmentListItem> {
    let doctor = Doctor {
        middle_name: row.get(10)?,
        ..Doctor::new(row.get::<_, String>(9)?, row.get::<_, String>(11)?)
    };
    Ok(AppointmentListItem {
        appointment: appointment_from_row(row)?,
        reason: row.get(8)?,
        doctor_formal_name: doctor.formal_name(),
    })
}

fn appointment_filters(criteria: &AppointmentCriteria) -> SelectBuilder {
    let mut q = SelectBuilder::new(LIST_FROM);
    if let Some(id) = criteria.patient_id {
        q.and_where("a.patient_id = ?", [Value::Integer(id)]);
    }
    if let Some(id) = criteria.appointment_reason_id {
        q.and_where("a.appointment_reason_id = ?", [Value::Integer(id)]);
    }
    if let Some(search) = &criteria.search {
        q.and_contains_any(&["a.notes"], search);
    }
    q
}

/// ORDER BY matching `AppointmentSort::compare` then
/// `appointment_tiebreak`.
fn appointment_ordering(q: &mut SelectBuilder, sort: SortState<AppointmentSort>) {
    let dir = sort.direction.sql();
    let column = match sort.field {
        AppointmentSort::Appointment => "a.start_time",
        AppointmentSort::Reason => "r.name",
        AppointmentSort::ExtraFees => "a.extra_fee",
    };
    q.order_by(format!("{} {}", column, dir));
    let asc = SortDirection::Asc.sql();
    q.order_by(format!("a.start_time {}", asc));
    q.order_by(format!("a.id {}", asc));
}

impl Database {
    /// Insert an appointment and return it with its new ID.
    pub fn insert_appointment(&self, appointment: &Appointment) -> DbResult<Appointment> {
        self.conn.execute(
            r#"
            INSERT INTO appointments (
                start_time, end_time, notes, extra_fee,
                doctor_id, patient_id, appointment_reason_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                appointment.start_time,
                appointment.end_time,
                appointment.notes,
                appointment.extra_fee,
                appointment.doctor_id,
                appointment.patient_id,
                appointment.appointment_reason_id,
            ],
        )?;
        Ok(Appointment {
            id: self.conn.last_insert_rowid(),
            ..appointment.clone()
        })
    }

    /// Update an existing appointment.
    pub fn update_appointment(&self, appointment: &Appointment) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE appointments SET
                start_time = ?2,
                end_time = ?3,
                notes = ?4,
                extra_fee = ?5,
                doctor_id = ?6,
                patient_id = ?7,
                appointment_reason_id = ?8
            WHERE id = ?1
            "#,
            params![
                appointment.id,
                appointment.start_time,
                appointment.end_time,
                appointment.notes,
                appointment.extra_fee,
                appointment.doctor_id,
                appointment.patient_id,
                appointment.appointment_reason_id,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_appointment(&self, id: i64) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM appointments a WHERE a.id = ?", APPOINTMENT_COLUMNS),
                [id],
                appointment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn delete_appointment(&self, id: i64) -> DbResult<bool> {
        let rows = self.conn.execute("DELETE FROM appointments WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    /// Appointments matching `criteria` as list rows, unsorted.
    pub fn appointment_list_items(&self, criteria: &AppointmentCriteria) -> DbResult<Vec<AppointmentListItem>> {
        let q = appointment_filters(criteria);
        let mut stmt = self.conn.prepare(&q.select_sql(LIST_COLUMNS, None))?;
        let rows = stmt.query_map(params_from_iter(q.params()), list_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Filter, sort and page appointments in SQL.
    pub fn query_appointments(
        &self,
        criteria: &AppointmentCriteria,
        sort: SortState<AppointmentSort>,
        requested_page: u32,
        page_size: u32,
    ) -> DbResult<Page<AppointmentListItem>> {
        let mut q = appointment_filters(criteria);
        let total: i64 = self
            .conn
            .query_row(&q.count_sql(), params_from_iter(q.params()), |row| row.get(0))?;
        let window = PageWindow::new(total.max(0) as u64, requested_page, page_size);

        appointment_ordering(&mut q, sort);
        let sql = q.select_sql(LIST_COLUMNS, Some((window.page_size, window.offset)));
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(q.params()), list_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(window.into_page(items))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::db::StoreFailure;
    use crate::models::{Lookup, LookupKind, Patient, Coverage};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let doc = db.insert_doctor(&Doctor::new("Gregory", "House")).unwrap();
        let mut p = Patient::new("Fred", "Flintstone", "9055551212", doc.id);
        p.coverage = Coverage::International;
        let p = db.insert_patient(&p).unwrap();
        (db, doc.id, p.id)
    }

    #[test]
    fn test_appointment_crud() {
        let (db, doc, pat) = setup();
        let mut appt = db
            .insert_appointment(&Appointment::new(pat, doc, at("2024-06-15 09:00"), "Checkup"))
            .unwrap();
        assert!(appt.id > 0);
        appt.end_time = Some(at("2024-06-15 09:30"));
        assert!(db.update_appointment(&appt).unwrap());
        assert_eq!(db.get_appointment(appt.id).unwrap(), Some(appt.clone()));
        assert!(db.delete_appointment(appt.id).unwrap());
        assert!(db.get_appointment(appt.id).unwrap().is_none());
    }

    #[test]
    fn test_query_appointments() {
        let (db, doc, pat) = setup();
        let flu = db
            .insert_lookup(&Lookup::new(LookupKind::AppointmentReason, "Illness"))
            .unwrap();
        for (start, notes, reason) in [
            ("2024-01-10 09:00", "Flu symptoms", Some(flu.id)),
            ("2024-03-10 09:00", "Annual physical", None),
            ("2024-02-10 09:00", "Flu follow-up", Some(flu.id)),
        ] {
            let mut a = Appointment::new(pat, doc, at(start), notes);
            a.appointment_reason_id = reason;
            db.insert_appointment(&a).unwrap();
        }

        let criteria = AppointmentCriteria {
            patient_id: Some(pat),
            ..Default::default()
        };
        let page = db.query_appointments(&criteria, SortState::default(), 1, 10).unwrap();
        let notes: Vec<&str> = page.items.iter().map(|r| r.appointment.notes.as_str()).collect();
        assert_eq!(notes, vec!["Annual physical", "Flu follow-up", "Flu symptoms"]);
        assert_eq!(page.items[0].doctor_formal_name, "House, Gregory");

        let criteria = AppointmentCriteria {
            patient_id: Some(pat),
            appointment_reason_id: Some(flu.id),
            search: Some("follow".into()),
        };
        let items = db.appointment_list_items(&criteria).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].reason.as_deref(), Some("Illness"));

        // A reason in use cannot be deleted
        let err = db.delete_lookup(LookupKind::AppointmentReason, flu.id).unwrap_err();
        assert_eq!(err.failure(), StoreFailure::ForeignKey);
    }

    #[test]
    fn test_deleting_patient_removes_appointments() {
        let (db, doc, pat) = setup();
        db.insert_appointment(&Appointment::new(pat, doc, at("2024-06-15 09:00"), "Checkup"))
            .unwrap();
        db.delete_patient(pat).unwrap();
        let all = db.appointment_list_items(&AppointmentCriteria::default()).unwrap();
        assert!(all.is_empty());
    }
}
