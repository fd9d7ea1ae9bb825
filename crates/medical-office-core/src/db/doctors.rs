//! Doctor database operations.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{AuditInfo, Doctor};
use crate::query::DoctorListItem;

const DOCTOR_COLUMNS: &str = "d.id, d.first_name, d.middle_name, d.last_name, \
     d.created_by, d.created_on, d.updated_by, d.updated_on";

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        first_name: row.get(1)?,
        middle_name: row.get(2)?,
        last_name: row.get(3)?,
        audit: AuditInfo {
            created_by: row.get(4)?,
            created_on: row.get(5)?,
            updated_by: row.get(6)?,
            updated_on: row.get(7)?,
        },
    })
}

impl Database {
    /// Insert a new doctor, stamping the audit columns.
    pub fn insert_doctor(&self, doctor: &Doctor) -> DbResult<Doctor> {
        let (user, now) = self.audit_stamp();
        self.conn.execute(
            r#"
            INSERT INTO doctors (
                first_name, middle_name, last_name,
                created_by, created_on, updated_by, updated_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?4, ?5)
            "#,
            params![doctor.first_name, doctor.middle_name, doctor.last_name, user, now],
        )?;
        Ok(Doctor {
            id: self.conn.last_insert_rowid(),
            audit: AuditInfo {
                created_by: Some(user.clone()),
                created_on: Some(now),
                updated_by: Some(user),
                updated_on: Some(now),
            },
            ..doctor.clone()
        })
    }

    /// Update an existing doctor.
    pub fn update_doctor(&self, doctor: &Doctor) -> DbResult<bool> {
        let (user, now) = self.audit_stamp();
        let rows_affected = self.conn.execute(
            r#"
            UPDATE doctors SET
                first_name = ?2,
                middle_name = ?3,
                last_name = ?4,
                updated_by = ?5,
                updated_on = ?6
            WHERE id = ?1
            "#,
            params![
                doctor.id,
                doctor.first_name,
                doctor.middle_name,
                doctor.last_name,
                user,
                now
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a doctor by ID.
    pub fn get_doctor(&self, id: i64) -> DbResult<Option<Doctor>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM doctors d WHERE d.id = ?", DOCTOR_COLUMNS),
                [id],
                doctor_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All doctors ordered by last name, then first name.
    pub fn list_doctors(&self) -> DbResult<Vec<Doctor>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM doctors d ORDER BY d.last_name, d.first_name, d.id",
            DOCTOR_COLUMNS
        ))?;
        let doctors = stmt.query_map([], doctor_from_row)?;
        doctors.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a doctor. Fails with a foreign-key error while patients or
    /// appointments reference them.
    pub fn delete_doctor(&self, id: i64) -> DbResult<bool> {
        let rows = self.conn.execute("DELETE FROM doctors WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    pub fn doctor_patient_count(&self, doctor_id: i64) -> DbResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE doctor_id = ?",
            [doctor_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Every doctor with specialties and patient count, unsorted, for the
    /// in-memory list pipeline.
    pub fn doctor_list_items(&self) -> DbResult<Vec<DoctorListItem>> {
        let mut counts: HashMap<i64, u32> = HashMap::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT doctor_id, COUNT(*) FROM patients GROUP BY doctor_id")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, u32>(1)?)))?;
            for row in rows {
                let (id, count) = row?;
                counts.insert(id, count);
            }
        }

        self.list_doctors()?
            .into_iter()
            .map(|doctor| {
                Ok(DoctorListItem {
                    specialties: self.specialties_for_doctor(doctor.id)?,
                    patient_count: counts.get(&doctor.id).copied().unwrap_or(0),
                    doctor,
                })
            })
            .collect()
    }
}
