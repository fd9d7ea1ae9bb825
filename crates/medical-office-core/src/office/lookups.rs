//! Lookup maintenance: appointment reasons, conditions, specialties and
//! medical trials, all on one screen.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Office, Saved, Screen};
use crate::db::DbError;
use crate::error::{OfficeError, OfficeResult, StoreContext};
use crate::models::{Lookup, LookupKind, Validate};
use crate::query::LOOKUP_SCREEN;

/// Every lookup table with its rows, in [`LookupKind::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTables {
    pub tables: Vec<(LookupKind, Vec<Lookup>)>,
}

impl LookupTables {
    pub fn rows(&self, kind: LookupKind) -> &[Lookup] {
        self.tables
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }
}

impl Office {
    /// The maintenance screen. Clears the remembered return URL.
    pub fn list_lookups(&mut self) -> OfficeResult<LookupTables> {
        self.session.return_urls.clear(LOOKUP_SCREEN.key);
        let tables = LookupKind::ALL
            .into_iter()
            .map(|kind| Ok((kind, self.read(self.db.list_lookups(kind))?)))
            .collect::<OfficeResult<Vec<_>>>()?;
        Ok(LookupTables { tables })
    }

    pub fn begin_lookup_create(&mut self, kind: LookupKind, referrer: Option<&str>) -> Screen<Lookup> {
        self.screen(&LOOKUP_SCREEN, referrer, Lookup::new(kind, ""))
    }

    fn load_lookup(&self, kind: LookupKind, id: i64) -> OfficeResult<Lookup> {
        self.read(self.db.get_lookup(kind, id))?
            .ok_or_else(|| OfficeError::not_found(format!("{} {}", kind, id)))
    }

    pub fn begin_lookup_edit(
        &mut self,
        kind: LookupKind,
        id: i64,
        referrer: Option<&str>,
    ) -> OfficeResult<Screen<Lookup>> {
        let lookup = self.load_lookup(kind, id)?;
        Ok(self.screen(&LOOKUP_SCREEN, referrer, lookup))
    }

    /// Insert (`id == 0`) or rename a lookup row.
    pub fn save_lookup(&mut self, lookup: &Lookup) -> OfficeResult<Saved> {
        let lookup = Lookup {
            name: lookup.name.trim().to_string(),
            ..lookup.clone()
        };
        lookup.validate(&self.validation_context())?;

        let store = |e: DbError| OfficeError::from_store(e, &StoreContext::SAVE);
        let id = if lookup.id == 0 {
            self.db.insert_lookup(&lookup).map_err(store)?.id
        } else if self.db.update_lookup(&lookup).map_err(store)? {
            lookup.id
        } else {
            return Err(OfficeError::not_found(format!("{} {}", lookup.kind, lookup.id)));
        };
        info!(kind = %lookup.kind, id, "Saved lookup");
        Ok(Saved {
            id,
            redirect_url: self.finish(&LOOKUP_SCREEN),
        })
    }

    pub fn begin_lookup_delete(
        &mut self,
        kind: LookupKind,
        id: i64,
        referrer: Option<&str>,
    ) -> OfficeResult<Screen<Lookup>> {
        self.begin_lookup_edit(kind, id, referrer)
    }

    /// Delete a lookup row; refused while it is in use.
    pub fn delete_lookup(&mut self, kind: LookupKind, id: i64) -> OfficeResult<String> {
        let deleted = self
            .db
            .delete_lookup(kind, id)
            .map_err(|e| OfficeError::from_store(e, &StoreContext::delete_with(kind.in_use_message())))?;
        if !deleted {
            return Err(OfficeError::not_found(format!("{} {}", kind, id)));
        }
        info!(kind = %kind, id, "Deleted lookup");
        Ok(self.finish(&LOOKUP_SCREEN))
    }
}
