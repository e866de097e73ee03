//! Date/time utilities for feedmerge.
//!
//! Every timestamp leaving the pipeline is UTC with second precision and is
//! rendered as `YYYY-MM-DDTHH:MM:SSZ`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};

/// Canonical timestamp format used by the snapshot and status output.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Naive layouts accepted when a timestamp carries no offset (assumed UTC).
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a timestamp string into UTC.
///
/// Accepts RFC 3339, RFC 2822 and the common naive layouts. A value without
/// an offset is taken as UTC; a bare date is midnight UTC. Returns `None` for
/// blank or unparseable input.
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Drop sub-second precision so a value survives a trip through the snapshot.
pub fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(0)
}

/// Render a UTC timestamp in the canonical `YYYY-MM-DDTHH:MM:SSZ` form.
pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format(CANONICAL_FORMAT).to_string()
}

/// Current time, truncated to whole seconds.
pub fn now_utc() -> DateTime<Utc> {
    truncate_to_seconds(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_utc("2024-01-15T10:30:00+09:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 1, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc2822() {
        let dt = parse_utc("Mon, 15 Jan 2024 10:30:00 +0100").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_assumes_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_utc("2024-01-15T10:30:00"), Some(expected));
        assert_eq!(parse_utc("2024-01-15 10:30:00"), Some(expected));
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_utc("2024-01-15").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_utc(""), None);
        assert_eq!(parse_utc("   "), None);
        assert_eq!(parse_utc("not a date"), None);
        assert_eq!(parse_utc("NaT"), None);
    }

    #[test]
    fn test_format_utc() {
        let dt = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(format_utc(&dt), "2024-12-31T23:59:59Z");
    }

    #[test]
    fn test_canonical_form_round_trips() {
        let dt = parse_utc("2024-03-01T08:00:00.750Z").unwrap();
        let text = format_utc(&truncate_to_seconds(dt));
        assert_eq!(text, "2024-03-01T08:00:00Z");
        assert_eq!(parse_utc(&text), Some(truncate_to_seconds(dt)));
    }
}
