//! Audit stamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who created and last changed a record.
///
/// Only the persistence gateway writes these, right before a commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditInfo {
    pub created_by: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub updated_on: Option<DateTime<Utc>>,
}
