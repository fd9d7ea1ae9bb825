//! Many-to-many join rows: patient conditions and doctor specialties.

use std::collections::BTreeSet;

use rusqlite::params;
use tracing::debug;

use super::{Database, DbResult};
use crate::models::{Lookup, LookupKind};
use crate::reconcile::{reconcile, AssociationDelta};

/// One join table: owner column, option column, option lookup.
struct JoinTable {
    table: &'static str,
    owner_column: &'static str,
    option_column: &'static str,
    option_kind: LookupKind,
}

const PATIENT_CONDITIONS: JoinTable = JoinTable {
    table: "patient_conditions",
    owner_column: "patient_id",
    option_column: "condition_id",
    option_kind: LookupKind::Condition,
};

const DOCTOR_SPECIALTIES: JoinTable = JoinTable {
    table: "doctor_specialties",
    owner_column: "doctor_id",
    option_column: "specialty_id",
    option_kind: LookupKind::Specialty,
};

impl Database {
    fn linked_ids(&self, join: &JoinTable, owner_id: i64) -> DbResult<BTreeSet<i64>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ?",
            join.option_column, join.table, join.owner_column
        ))?;
        let ids = stmt.query_map([owner_id], |row| row.get(0))?;
        ids.collect::<Result<BTreeSet<_>, _>>().map_err(Into::into)
    }

    fn linked_lookups(&self, join: &JoinTable, owner_id: i64) -> DbResult<Vec<Lookup>> {
        let kind = join.option_kind;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT o.id, o.name FROM {opts} o JOIN {join} j ON j.{opt_col} = o.id
             WHERE j.{owner_col} = ? ORDER BY o.name, o.id",
            opts = kind.table(),
            join = join.table,
            opt_col = join.option_column,
            owner_col = join.owner_column,
        ))?;
        let rows = stmt.query_map([owner_id], |row| {
            Ok(Lookup {
                kind,
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn apply_delta(&self, join: &JoinTable, owner_id: i64, delta: &AssociationDelta) -> DbResult<()> {
        if delta.is_empty() {
            return Ok(());
        }
        let insert_sql = format!(
            "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)",
            join.table, join.owner_column, join.option_column
        );
        let delete_sql = format!(
            "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
            join.table, join.owner_column, join.option_column
        );
        for id in &delta.to_add {
            self.conn.execute(&insert_sql, params![owner_id, id])?;
        }
        for id in &delta.to_remove {
            self.conn.execute(&delete_sql, params![owner_id, id])?;
        }
        debug!(
            table = join.table,
            owner_id,
            added = delta.to_add.len(),
            removed = delta.to_remove.len(),
            "Applied association delta"
        );
        Ok(())
    }

    /// Diff `desired` against the stored links over every option of the
    /// join's lookup, and stage the changes. Does not commit.
    fn reconcile_links(
        &self,
        join: &JoinTable,
        owner_id: i64,
        desired: Option<&[i64]>,
    ) -> DbResult<AssociationDelta> {
        let options: Vec<i64> = self
            .lookup_options(join.option_kind)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let current = self.linked_ids(join, owner_id)?;
        let delta = reconcile(&options, &current, desired);
        self.apply_delta(join, owner_id, &delta)?;
        Ok(delta)
    }

    pub fn patient_condition_ids(&self, patient_id: i64) -> DbResult<BTreeSet<i64>> {
        self.linked_ids(&PATIENT_CONDITIONS, patient_id)
    }

    /// A patient's conditions, by name.
    pub fn conditions_for_patient(&self, patient_id: i64) -> DbResult<Vec<Lookup>> {
        self.linked_lookups(&PATIENT_CONDITIONS, patient_id)
    }

    pub fn apply_patient_conditions(&self, patient_id: i64, delta: &AssociationDelta) -> DbResult<()> {
        self.apply_delta(&PATIENT_CONDITIONS, patient_id, delta)
    }

    /// Make a patient's conditions match the checked set. `None` clears
    /// them all.
    pub fn reconcile_patient_conditions(
        &self,
        patient_id: i64,
        desired: Option<&[i64]>,
    ) -> DbResult<AssociationDelta> {
        self.reconcile_links(&PATIENT_CONDITIONS, patient_id, desired)
    }

    pub fn doctor_specialty_ids(&self, doctor_id: i64) -> DbResult<BTreeSet<i64>> {
        self.linked_ids(&DOCTOR_SPECIALTIES, doctor_id)
    }

    /// A doctor's specialties, by name.
    pub fn specialties_for_doctor(&self, doctor_id: i64) -> DbResult<Vec<Lookup>> {
        self.linked_lookups(&DOCTOR_SPECIALTIES, doctor_id)
    }

    pub fn apply_doctor_specialties(&self, doctor_id: i64, delta: &AssociationDelta) -> DbResult<()> {
        self.apply_delta(&DOCTOR_SPECIALTIES, doctor_id, delta)
    }

    /// Make a doctor's specialties match the selected set. `None` clears
    /// them all.
    pub fn reconcile_doctor_specialties(
        &self,
        doctor_id: i64,
        desired: Option<&[i64]>,
    ) -> DbResult<AssociationDelta> {
        self.reconcile_links(&DOCTOR_SPECIALTIES, doctor_id, desired)
    }
}
