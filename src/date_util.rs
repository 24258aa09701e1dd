use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};

/// Get the last day of a given month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }?;
    first_of_next.checked_sub_signed(Duration::days(1))
}

/// Get the quarter (1-4) for a given date.
pub fn quarter_of(d: NaiveDate) -> u8 {
    ((d.month() - 1) / 3 + 1) as u8
}

/// Parse an ISO-8601 timestamp as produced by the upstream services.
///
/// Accepts RFC 3339 (`2025-01-10T09:30:00Z`, `+02:00` offsets), naive
/// datetimes with `T` or space separators and optional fractional seconds,
/// and bare dates. Offsets are dropped and the wall-clock value as written is
/// kept, which is what date-only comparisons want. Use [`parse_instant`] to
/// measure the span between two stamps.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Like [`parse_timestamp`], but RFC 3339 values are converted to UTC so
/// stamps written with different offsets can be subtracted.
pub fn parse_instant(s: &str) -> Option<NaiveDateTime> {
    match DateTime::parse_from_rfc3339(s.trim()) {
        Ok(dt) => Some(dt.naive_utc()),
        Err(_) => parse_timestamp(s),
    }
}

/// Date part of an optional ISO-8601 string; `None` when absent or unparseable.
pub fn parse_date(s: Option<&str>) -> Option<NaiveDate> {
    s.and_then(parse_timestamp).map(|dt| dt.date())
}

/// Format a date the way reports carry it (`YYYY-MM-DD`).
pub fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// `part / total * 100`, or 0 when there is nothing to divide by.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Arithmetic mean, `None` for an empty sample.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2025, 1), Some(ymd(2025, 1, 31)));
        assert_eq!(last_day_of_month(2025, 2), Some(ymd(2025, 2, 28)));
        assert_eq!(last_day_of_month(2024, 2), Some(ymd(2024, 2, 29))); // Leap year
        assert_eq!(last_day_of_month(2025, 12), Some(ymd(2025, 12, 31)));
    }

    #[test]
    fn test_quarter_of() {
        assert_eq!(quarter_of(ymd(2025, 1, 15)), 1);
        assert_eq!(quarter_of(ymd(2025, 4, 1)), 2);
        assert_eq!(quarter_of(ymd(2025, 9, 30)), 3);
        assert_eq!(quarter_of(ymd(2025, 12, 31)), 4);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = ymd(2025, 3, 4).and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-04T10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-04 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-04T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-04T10:30:00+05:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-04T10:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-03-04T10:30:00.123456").map(|d| d.date()),
            Some(ymd(2025, 3, 4))
        );
        assert_eq!(
            parse_timestamp("2025-03-04"),
            ymd(2025, 3, 4).and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn test_parse_instant_applies_offsets() {
        let utc = ymd(2025, 3, 4).and_hms_opt(5, 30, 0).unwrap();
        assert_eq!(parse_instant("2025-03-04T10:30:00+05:00"), Some(utc));
        assert_eq!(parse_instant("2025-03-04T05:30:00Z"), Some(utc));
        assert_eq!(parse_instant("2025-03-04 05:30:00"), Some(utc));
        assert_eq!(parse_instant("soon"), None);
    }

    #[test]
    fn test_parse_timestamp_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("next tuesday"), None);
        assert_eq!(parse_timestamp("2025-13-40"), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn test_percentage_zero_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 4), 75.0);
    }

    #[test]
    fn test_mean_and_round() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0, 6.0]), Some(4.0));
        assert_eq!(round1(87.46), 87.5);
        assert_eq!(round1(100.0), 100.0);
    }
}
