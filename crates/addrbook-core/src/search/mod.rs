//! Last-name search for Addrbook
//!
//! Matching itself is a `LIKE` prefix query in the repository layer; this
//! module builds the pattern and classifies the results the way clients
//! present them: nothing found, a single entry opened for editing, or a list.

use serde::Serialize;

use crate::edit::EditSession;
use crate::models::Entry;
use crate::util::compact_text;

/// Build a `LIKE` pattern matching values that start with `prefix`.
///
/// `%`, `_` and the escape character itself are escaped with `\`, so the
/// query must use `ESCAPE '\'`.
pub fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.trim().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Result of a last-name search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Nothing matched
    NoMatches { message: String },
    /// Exactly one match, ready to edit
    Single(EditSession),
    /// Several matches
    Many { entries: Vec<Entry> },
}

impl SearchOutcome {
    /// Classify the entries that matched `query`.
    pub fn from_matches(query: &str, mut entries: Vec<Entry>) -> Self {
        match entries.len() {
            0 => Self::NoMatches {
                message: format!("No entries with last name = \"{}\"", compact_text(query)),
            },
            1 => {
                let entry = entries.remove(0);
                Self::Single(EditSession::new(entry))
            }
            _ => Self::Many { entries },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryFields, UserId};

    fn entry(last: &str) -> Entry {
        let fields = EntryFields {
            last_name: last.to_string(),
            ..EntryFields::default()
        };
        Entry::new(fields, &UserId::new("sub-1"))
    }

    #[test]
    fn test_like_prefix_pattern() {
        assert_eq!(like_prefix_pattern("Smi"), "Smi%");
        assert_eq!(like_prefix_pattern(" Smi "), "Smi%");
        assert_eq!(like_prefix_pattern(""), "%");
        assert_eq!(like_prefix_pattern("5%_\\"), "5\\%\\_\\\\%");
    }

    #[test]
    fn test_no_matches_message() {
        let outcome = SearchOutcome::from_matches("Zed", Vec::new());
        assert_eq!(
            outcome,
            SearchOutcome::NoMatches {
                message: "No entries with last name = \"Zed\"".to_string()
            }
        );
    }

    #[test]
    fn test_single_match_opens_edit_session() {
        let found = entry("Smith");
        let SearchOutcome::Single(session) = SearchOutcome::from_matches("Smi", vec![found.clone()])
        else {
            panic!("expected single match");
        };
        assert_eq!(session.version, found.version());
        assert_eq!(session.entry, found);
    }

    #[test]
    fn test_many_matches() {
        let outcome = SearchOutcome::from_matches("S", vec![entry("Smith"), entry("Stone")]);
        assert!(matches!(outcome, SearchOutcome::Many { entries } if entries.len() == 2));
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_value(SearchOutcome::from_matches("Zed", Vec::new())).unwrap();
        assert_eq!(json["kind"], "no_matches");

        let json = serde_json::to_value(SearchOutcome::from_matches("S", vec![entry("Smith")])).unwrap();
        assert_eq!(json["kind"], "single");
        assert_eq!(json["entry"]["last_name"], "Smith");
    }
}
