//! Shared utility functions used across multiple modules.

/// Truncate text to at most 180 characters for log and error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Unicode lowercase used for case-insensitive keys and prefix search.
///
/// `SQLite`'s `LIKE` and `NOCASE` only fold ASCII letters.
pub fn fold_case(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
