//! Database layer for the medical office.
//!
//! One [`Database`] wraps one SQLite connection. Per-table operations are
//! `impl Database` blocks in the sibling modules. [`Database::begin`]
//! opens a transaction on the same connection, so every operation issued
//! while the guard is alive joins it; dropping the guard without
//! committing rolls back.

mod appointments;
mod associations;
mod doctors;
mod lookups;
mod patients;
mod photos;
mod schema;
mod seed;
mod sql;

pub use patients::VersionedUpdate;
pub use schema::*;
pub use seed::SeedSummary;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{ffi, Connection, ErrorCode};
use thiserror::Error;
use tracing::debug;

/// Acting user recorded in audit columns when nobody is signed in.
pub const SEED_USER: &str = "Seed Data";

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// What kind of store failure a [`DbError`] is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFailure {
    /// A unique constraint or index rejected the write. `columns` are
    /// `table.column` names as reported by SQLite.
    Unique { columns: Vec<String> },
    /// A foreign key rejected the write or delete.
    ForeignKey,
    /// The database was busy or locked.
    Busy,
    Other,
}

impl DbError {
    pub fn failure(&self) -> StoreFailure {
        match self {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, message)) => match err.code {
                ErrorCode::ConstraintViolation => match err.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        StoreFailure::Unique {
                            columns: unique_columns(message.as_deref().unwrap_or_default()),
                        }
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => StoreFailure::ForeignKey,
                    // ON DELETE RESTRICT reports through the trigger code
                    ffi::SQLITE_CONSTRAINT_TRIGGER
                        if is_foreign_key_message(message.as_deref()) =>
                    {
                        StoreFailure::ForeignKey
                    }
                    _ => StoreFailure::Other,
                },
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => StoreFailure::Busy,
                _ => StoreFailure::Other,
            },
            _ => StoreFailure::Other,
        }
    }
}

fn is_foreign_key_message(message: Option<&str>) -> bool {
    message.is_some_and(|m| m.contains("FOREIGN KEY constraint failed"))
}

/// Columns named in "UNIQUE constraint failed: t.a, t.b".
fn unique_columns(message: &str) -> Vec<String> {
    message
        .split_once(':')
        .map(|(_, cols)| {
            cols.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
    acting_user: String,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        let db = Self {
            conn,
            acting_user: SEED_USER.to_string(),
        };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        debug!("Schema initialized");
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction on this connection.
    pub fn begin(&self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// User recorded in audit columns.
    pub fn acting_user(&self) -> &str {
        &self.acting_user
    }

    pub fn set_acting_user(&mut self, user: impl Into<String>) {
        let user = user.into();
        self.acting_user = if user.trim().is_empty() {
            SEED_USER.to_string()
        } else {
            user
        };
    }

    pub fn with_acting_user(mut self, user: impl Into<String>) -> Self {
        self.set_acting_user(user);
        self
    }

    /// Audit stamp for a write happening now.
    pub(crate) fn audit_stamp(&self) -> (String, DateTime<Utc>) {
        (self.acting_user.clone(), Utc::now())
    }
}
