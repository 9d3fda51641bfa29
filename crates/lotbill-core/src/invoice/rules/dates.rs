//! Date normalization to ISO-8601 `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

use super::patterns::{DATE_DMY, DATE_ISO};

/// Formats tried by the general parser for dates carrying a time and offset.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

/// Formats tried by the general parser for naive date-times.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Formats tried by the general parser for plain dates.
const DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y-%m-%e",
    "%d %B %Y",
    "%d %b %Y",
    "%e %B %Y",
    "%e %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%A, %d %B %Y",
    "%a, %d %b %Y",
    "%a %b %d %Y",
];

/// Normalize a date string to `YYYY-MM-DD`.
///
/// `None` and empty strings pass through. Strings already in ISO form are
/// returned untouched, day-first dates (`20/11/25`, `1.2.2025`) are
/// reordered, and anything else goes through a general parser. Input that
/// cannot be understood is returned unchanged.
pub fn normalize_date(input: Option<&str>) -> Option<String> {
    let input = input?;
    Some(normalize_date_str(input))
}

/// [`normalize_date`] for a value known to be present.
pub fn normalize_date_str(input: &str) -> String {
    if input.is_empty() || DATE_ISO.is_match(input) {
        return input.to_string();
    }

    let trimmed = input.trim();
    if DATE_ISO.is_match(trimmed) {
        return trimmed.to_string();
    }

    if let Some(date) = parse_day_first(trimmed).or_else(|| parse_general(trimmed)) {
        return format_iso(date);
    }

    warn!(input, "could not normalize date, passing through unchanged");
    input.to_string()
}

/// Parse a date to a calendar value using the same rules as [`normalize_date`].
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if DATE_ISO.is_match(trimmed) {
        return NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok();
    }
    parse_day_first(trimmed).or_else(|| parse_general(trimmed))
}

fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `D{1,2}[/-.]M{1,2}[/-.]Y{2,4}`, two-digit years fixed to the 2000s.
fn parse_day_first(s: &str) -> Option<NaiveDate> {
    let caps = DATE_DMY.captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = parse_year(&caps[3])?;

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    if s.len() == 2 { Some(2000 + year) } else { Some(year) }
}

/// Fallback parser. Zoned timestamps resolve to their UTC calendar date.
fn parse_general(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc).date_naive());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}
