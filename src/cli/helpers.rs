//! Shared helper functions for CLI commands

use std::collections::BTreeSet;

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Comma-separated ids, or "-" when there are none
pub fn format_ids(ids: &BTreeSet<i64>) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
    }
}

/// Header label to JSON key ("Org Code" -> "org_code")
pub fn json_key(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}
