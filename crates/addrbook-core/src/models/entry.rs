//! Address book entry model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{EntryVersion, UserId};

/// A unique identifier for an entry, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Create a new unique entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Contact attributes of an entry, already cleaned and validated.
///
/// Blank optional text is an empty string; blank dates are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFields {
    pub last_name: String,
    pub first_name: String,
    pub birthday: Option<NaiveDate>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub email: String,
    pub home_phone: String,
    pub cell_phone: String,
    pub fax: String,
    pub spouse_last: String,
    pub spouse_first: String,
    pub spouse_birth: Option<NaiveDate>,
    pub spouse_cell: String,
    pub spouse_email: String,
}

/// An address book entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier
    pub id: EntryId,
    /// Contact attributes
    #[serde(flatten)]
    pub fields: EntryFields,
    /// User who created the entry
    pub created_by: UserId,
    /// Creation timestamp (Unix ms)
    pub creation_time: i64,
    /// User who last saved the entry
    pub updated_by: UserId,
    /// Last save timestamp (Unix ms), doubles as the edit version
    pub update_time: i64,
}

impl Entry {
    /// Create a new entry owned by `creator`
    #[must_use]
    pub fn new(fields: EntryFields, creator: &UserId) -> Self {
        let now = crate::util::unix_millis_now();
        Self {
            id: EntryId::new(),
            fields,
            created_by: creator.clone(),
            creation_time: now,
            updated_by: creator.clone(),
            update_time: now,
        }
    }

    /// Current version token
    pub const fn version(&self) -> EntryVersion {
        EntryVersion::from_millis(self.update_time)
    }

    /// "Last, First" display name, or just the last name when first is blank
    pub fn display_name(&self) -> String {
        if self.fields.first_name.is_empty() {
            self.fields.last_name.clone()
        } else {
            format!("{}, {}", self.fields.last_name, self.fields.first_name)
        }
    }
}
