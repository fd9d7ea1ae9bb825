//! Lookup table operations (reasons, conditions, specialties, trials).

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Lookup, LookupKind};

impl Database {
    /// Insert a lookup row and return it with its new ID.
    pub fn insert_lookup(&self, lookup: &Lookup) -> DbResult<Lookup> {
        self.conn.execute(
            &format!("INSERT INTO {} (name) VALUES (?1)", lookup.kind.table()),
            [&lookup.name],
        )?;
        Ok(Lookup {
            id: self.conn.last_insert_rowid(),
            ..lookup.clone()
        })
    }

    /// Rename a lookup row.
    pub fn update_lookup(&self, lookup: &Lookup) -> DbResult<bool> {
        let rows = self.conn.execute(
            &format!("UPDATE {} SET name = ?2 WHERE id = ?1", lookup.kind.table()),
            params![lookup.id, lookup.name],
        )?;
        Ok(rows > 0)
    }

    pub fn get_lookup(&self, kind: LookupKind, id: i64) -> DbResult<Option<Lookup>> {
        self.conn
            .query_row(
                &format!("SELECT id, name FROM {} WHERE id = ?", kind.table()),
                [id],
                |row| {
                    Ok(Lookup {
                        kind,
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// All rows of one lookup, by name.
    pub fn list_lookups(&self, kind: LookupKind) -> DbResult<Vec<Lookup>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name FROM {} ORDER BY name, id",
            kind.table()
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(Lookup {
                kind,
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// `(id, name)` pairs for drop-downs and pickers.
    pub fn lookup_options(&self, kind: LookupKind) -> DbResult<Vec<(i64, String)>> {
        Ok(self
            .list_lookups(kind)?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect())
    }

    /// Delete a lookup row. Fails with a foreign-key error while the row
    /// is in use, except medical trials, whose patients are unenrolled.
    pub fn delete_lookup(&self, kind: LookupKind, id: i64) -> DbResult<bool> {
        let rows = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?", kind.table()), [id])?;
        Ok(rows > 0)
    }
}
