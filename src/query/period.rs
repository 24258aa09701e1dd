use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;

use crate::date_util::{last_day_of_month, quarter_of};
use crate::error::{Error, Result};

static RE_HALF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-H([12])$").unwrap());
static RE_QUARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap());
static RE_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{1,2})$").unwrap());
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static RE_ROLLING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,4})[dD]$").unwrap());

/// Shorthand for a reporting window, resolved against a fixed "today".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Year(i32),
    Half(i32, u8),
    Quarter(i32, u8),
    Month(i32, u8),
    Week(i32, u8),
    Rolling(u32, NaiveDate),
    YearToDate(NaiveDate),
    QuarterToDate(NaiveDate),
    MonthToDate(NaiveDate),
}

impl Period {
    /// Parse a period string.
    ///
    /// Supported formats:
    /// - `2025`: year
    /// - `2025-H1`: half
    /// - `2025-Q1`: quarter
    /// - `2025-01`: month
    /// - `2025-W05`: ISO week
    /// - `30d`: the last N days, today included
    /// - `ytd`, `qtd`, `mtd`: to date
    pub fn parse(s: &str, today: NaiveDate) -> Result<Self> {
        let s = s.trim();

        match s.to_lowercase().as_str() {
            "ytd" => return Ok(Period::YearToDate(today)),
            "qtd" => return Ok(Period::QuarterToDate(today)),
            "mtd" => return Ok(Period::MonthToDate(today)),
            _ => {}
        }

        if let Some(caps) = RE_ROLLING.captures(s) {
            let n = parse_num::<u32>(&caps[1], s)?;
            if n == 0 {
                return Err(Error::Validation(format!("empty rolling period: {s}")));
            }
            return Ok(Period::Rolling(n, today));
        }

        if s.len() == 4 {
            if let Ok(year) = s.parse::<i32>() {
                return Ok(Period::Year(year));
            }
        }

        if let Some(caps) = RE_HALF.captures(s) {
            return Ok(Period::Half(parse_num(&caps[1], s)?, parse_num(&caps[2], s)?));
        }

        if let Some(caps) = RE_QUARTER.captures(s) {
            return Ok(Period::Quarter(parse_num(&caps[1], s)?, parse_num(&caps[2], s)?));
        }

        if let Some(caps) = RE_WEEK.captures(s) {
            let week: u8 = parse_num(&caps[2], s)?;
            if (1..=53).contains(&week) {
                return Ok(Period::Week(parse_num(&caps[1], s)?, week));
            }
        }

        if let Some(caps) = RE_MONTH.captures(s) {
            let month: u8 = parse_num(&caps[2], s)?;
            if (1..=12).contains(&month) {
                return Ok(Period::Month(parse_num(&caps[1], s)?, month));
            }
        }

        Err(Error::Validation(format!("unrecognized period: {s}")))
    }

    /// Inclusive first and last day of the period.
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        let range = match self {
            Period::Year(y) => ymd(*y, 1, 1).zip(ymd(*y, 12, 31)),
            Period::Half(y, 1) => ymd(*y, 1, 1).zip(ymd(*y, 6, 30)),
            Period::Half(y, _) => ymd(*y, 7, 1).zip(ymd(*y, 12, 31)),
            Period::Quarter(y, q) => {
                let start_month = (*q as u32 - 1) * 3 + 1;
                ymd(*y, start_month, 1).zip(last_day_of_month(*y, start_month + 2))
            }
            Period::Month(y, m) => ymd(*y, *m as u32, 1).zip(last_day_of_month(*y, *m as u32)),
            Period::Week(y, w) => NaiveDate::from_isoywd_opt(*y, *w as u32, Weekday::Mon)
                .map(|start| (start, start + Duration::days(6))),
            Period::Rolling(n, as_of) => as_of
                .checked_sub_signed(Duration::days(*n as i64 - 1))
                .map(|start| (start, *as_of)),
            Period::YearToDate(today) => ymd(today.year(), 1, 1).map(|s| (s, *today)),
            Period::QuarterToDate(today) => {
                let start_month = (quarter_of(*today) as u32 - 1) * 3 + 1;
                ymd(today.year(), start_month, 1).map(|s| (s, *today))
            }
            Period::MonthToDate(today) => ymd(today.year(), today.month(), 1).map(|s| (s, *today)),
        };
        range.ok_or_else(|| Error::Validation(format!("period out of range: {self:?}")))
    }
}

fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn parse_num<T: std::str::FromStr>(digits: &str, input: &str) -> Result<T> {
    digits
        .parse()
        .map_err(|_| Error::Validation(format!("invalid period: {input}")))
}
