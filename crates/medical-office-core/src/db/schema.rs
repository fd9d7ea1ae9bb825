//! SQLite schema definition.

/// Complete database schema for the medical office.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Lookups
-- ============================================================================

CREATE TABLE IF NOT EXISTS medical_trials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conditions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS specialties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS appointment_reasons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

-- ============================================================================
-- Doctors
-- ============================================================================

CREATE TABLE IF NOT EXISTS doctors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    middle_name TEXT,
    last_name TEXT NOT NULL,
    created_by TEXT,
    created_on TEXT,
    updated_by TEXT,
    updated_on TEXT
);

CREATE INDEX IF NOT EXISTS idx_doctors_name ON doctors(last_name, first_name);

-- Deleting a doctor drops their specialty links; a specialty in use cannot be deleted
CREATE TABLE IF NOT EXISTS doctor_specialties (
    doctor_id INTEGER NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
    specialty_id INTEGER NOT NULL REFERENCES specialties(id) ON DELETE RESTRICT,
    PRIMARY KEY (doctor_id, specialty_id)
);

CREATE INDEX IF NOT EXISTS idx_doctor_specialties_specialty ON doctor_specialties(specialty_id);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ohip TEXT UNIQUE,                            -- NULL unless coverage is OHIP
    first_name TEXT NOT NULL,
    middle_name TEXT,
    last_name TEXT NOT NULL,
    dob TEXT,                                    -- yyyy-mm-dd
    exp_yr_visits INTEGER NOT NULL CHECK (exp_yr_visits BETWEEN 1 AND 12),
    phone TEXT NOT NULL,
    email TEXT,
    coverage TEXT NOT NULL CHECK (coverage IN ('OHIP', 'OutOfProvince', 'International')),
    medical_trial_id INTEGER REFERENCES medical_trials(id) ON DELETE SET NULL,
    doctor_id INTEGER NOT NULL REFERENCES doctors(id) ON DELETE RESTRICT,
    row_version TEXT NOT NULL,
    created_by TEXT,
    created_on TEXT,
    updated_by TEXT,
    updated_on TEXT
);

-- Multiple births guard
CREATE UNIQUE INDEX IF NOT EXISTS idx_patients_dob_name ON patients(dob, last_name, first_name);
CREATE INDEX IF NOT EXISTS idx_patients_doctor ON patients(doctor_id);
CREATE INDEX IF NOT EXISTS idx_patients_trial ON patients(medical_trial_id);

-- Deleting a patient drops their history; a condition in a history cannot be deleted
CREATE TABLE IF NOT EXISTS patient_conditions (
    patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    condition_id INTEGER NOT NULL REFERENCES conditions(id) ON DELETE RESTRICT,
    PRIMARY KEY (condition_id, patient_id)
);

CREATE INDEX IF NOT EXISTS idx_patient_conditions_patient ON patient_conditions(patient_id);

-- Photo and thumbnail live in separate tables so list screens never load the full photo
CREATE TABLE IF NOT EXISTS patient_photos (
    patient_id INTEGER PRIMARY KEY REFERENCES patients(id) ON DELETE CASCADE,
    content BLOB NOT NULL,
    mime_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patient_thumbnails (
    patient_id INTEGER PRIMARY KEY REFERENCES patients(id) ON DELETE CASCADE,
    content BLOB NOT NULL,
    mime_type TEXT NOT NULL
);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time TEXT NOT NULL,
    end_time TEXT,
    notes TEXT NOT NULL,
    extra_fee REAL NOT NULL DEFAULT 20,
    doctor_id INTEGER NOT NULL REFERENCES doctors(id) ON DELETE RESTRICT,
    patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    appointment_reason_id INTEGER REFERENCES appointment_reasons(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id, start_time);
CREATE INDEX IF NOT EXISTS idx_appointments_reason ON appointments(appointment_reason_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO doctors (first_name, last_name) VALUES ('Gregory', 'House')",
            [],
        )
        .unwrap();
        conn
    }

    fn insert_patient(conn: &Connection, ohip: Option<&str>, first: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO patients (ohip, first_name, last_name, dob, exp_yr_visits, phone, coverage, doctor_id, row_version)
             VALUES (?1, ?2, 'Flintstone', '1955-09-01', 2, '9055551212', 'OHIP', 1, 'v1')",
            rusqlite::params![ohip, first],
        )
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
        // Re-running is harmless
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_ohip_unique_but_null_repeatable() {
        let conn = setup();
        insert_patient(&conn, Some("1231231234"), "Fred").unwrap();
        assert!(insert_patient(&conn, Some("1231231234"), "Pebbles").is_err());

        conn.execute("UPDATE patients SET dob = NULL", []).unwrap();
        insert_patient(&conn, None, "Dino").unwrap();
        conn.execute("UPDATE patients SET dob = NULL WHERE first_name = 'Dino'", []).unwrap();
        insert_patient(&conn, None, "Bamm").unwrap();
    }

    #[test]
    fn test_duplicate_birth_guard() {
        let conn = setup();
        insert_patient(&conn, Some("1111111111"), "Fred").unwrap();
        assert!(insert_patient(&conn, Some("2222222222"), "Fred").is_err());
    }

    #[test]
    fn test_doctor_delete_restricted() {
        let conn = setup();
        insert_patient(&conn, Some("1231231234"), "Fred").unwrap();
        assert!(conn.execute("DELETE FROM doctors WHERE id = 1", []).is_err());
    }
}
