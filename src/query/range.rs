use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_util::parse_date;
use crate::error::{Error, Result};
use crate::query::period::Period;

/// Inclusive `[start, end]` filter on creation dates. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(Error::Validation(format!(
                    "start date {s} is after end date {e}"
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds as supplied by a caller.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        Self::new(parse_bound(start, "start")?, parse_bound(end, "end")?)
    }

    /// Resolve period shorthand (`2025-Q1`, `30d`, `ytd`, ...) to a range.
    pub fn from_period(s: &str, today: NaiveDate) -> Result<Self> {
        let (start, end) = Period::parse(s, today)?.date_range()?;
        Self::new(Some(start), Some(end))
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Whether a record created at `created_at` passes the filter. With any
    /// bound set, records without a parseable creation date are excluded.
    pub fn admits(&self, created_at: Option<&str>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        parse_date(created_at).is_some_and(|d| self.contains(d))
    }
}

fn parse_bound(value: Option<&str>, which: &str) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| Error::Validation(format!("invalid {which} date '{v}', expected YYYY-MM-DD"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_bounds() {
        let r = DateRange::parse(Some("2025-01-01"), Some("2025-01-31")).unwrap();
        assert_eq!(r.start, Some(d(2025, 1, 1)));
        assert_eq!(r.end, Some(d(2025, 1, 31)));

        let open = DateRange::parse(None, Some("")).unwrap();
        assert!(open.is_unbounded());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            DateRange::parse(Some("01/02/2025"), None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            DateRange::parse(Some("2025-02-01"), Some("2025-01-01")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_admits_is_inclusive() {
        let r = DateRange::parse(Some("2025-01-01"), Some("2025-01-31")).unwrap();
        assert!(r.admits(Some("2025-01-01T00:00:00")));
        assert!(r.admits(Some("2025-01-31T23:59:59")));
        assert!(!r.admits(Some("2025-02-01")));
        assert!(!r.admits(None));
        assert!(!r.admits(Some("not a date")));
        assert!(DateRange::unbounded().admits(None));
    }

    #[test]
    fn test_from_period() {
        let r = DateRange::from_period("2025-Q2", d(2026, 1, 1)).unwrap();
        assert_eq!(r.start, Some(d(2025, 4, 1)));
        assert_eq!(r.end, Some(d(2025, 6, 30)));
    }
}
