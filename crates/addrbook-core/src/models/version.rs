//! Entry version stamps

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Optimistic-concurrency token for an entry.
///
/// Wraps the entry's `update_time` (Unix ms). Callers capture it when they
/// start editing and hand it back on submit; any difference from the stored
/// value means someone else saved in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryVersion(i64);

impl EntryVersion {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// The stamp to store on the next successful save.
    ///
    /// Uses the wall clock when it has moved past this stamp, otherwise
    /// bumps by one so versions never repeat or go backwards.
    #[must_use]
    pub fn successor(self, now_millis: i64) -> Self {
        Self(now_millis.max(self.0.saturating_add(1)))
    }
}

impl fmt::Display for EntryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryVersion {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}
