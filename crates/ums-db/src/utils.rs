//! Shared utility functions

use chrono::{DateTime, SecondsFormat, Utc};

/// Parse a datetime string (RFC3339 format) or return current time
///
/// Timestamps are stored as RFC3339 text; a malformed value falls back to
/// the current time instead of failing the whole row.
pub fn parse_datetime_or_now(s: &str) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Format a timestamp with a fixed width so stored values sort chronologically
///
/// Used for columns compared in SQL (session expiry).
pub fn format_sortable(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Normalize a role label: trims surrounding whitespace.
///
/// Returns `None` for labels that are empty after trimming.
pub fn normalize_role_label(label: &str) -> Option<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_or_now() {
        let valid_time = "2024-01-01T12:00:00Z";
        let parsed = parse_datetime_or_now(valid_time);
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");

        // Invalid time should return current time
        let now_before = Utc::now();
        let parsed = parse_datetime_or_now("invalid");
        let now_after = Utc::now();
        assert!(parsed >= now_before && parsed <= now_after);
    }

    #[test]
    fn test_format_sortable_orders_lexicographically() {
        let early = parse_datetime_or_now("2024-01-01T12:00:00Z");
        let later = parse_datetime_or_now("2024-01-01T12:00:00.5Z");
        assert_eq!(format_sortable(early), "2024-01-01T12:00:00.000000Z");
        assert!(format_sortable(early) < format_sortable(later));
        assert_eq!(parse_datetime_or_now(&format_sortable(later)), later);
    }

    #[test]
    fn test_normalize_role_label() {
        assert_eq!(normalize_role_label("ADMIN"), Some("ADMIN".to_string()));
        assert_eq!(normalize_role_label("  USER \n"), Some("USER".to_string()));
        assert_eq!(normalize_role_label("   "), None);
        assert_eq!(normalize_role_label(""), None);
    }
}
