//! Proleptic-Gregorian date handling
//!
//! Years use astronomical numbering: year 0 is 1 BCE, year -1 is 2 BCE and
//! so on. Leap years follow the Gregorian rule extended backwards, so year 0
//! and year -4 are leap years while year -100 is not.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::DataError;

/// A date that may be known only to the year or month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    #[serde(alias = "y")]
    pub year: i32,
    #[serde(default, alias = "m")]
    pub month: Option<u32>,
    #[serde(default, alias = "d")]
    pub day: Option<u32>,
    /// Approximate ("circa") date
    #[serde(default, alias = "f")]
    pub fuzzy: bool,
}

impl PartialDate {
    pub fn year(year: i32) -> Self {
        Self { year, month: None, day: None, fuzzy: false }
    }

    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self { year, month: Some(month), day: Some(day), fuzzy: false }
    }

    pub fn ym(year: i32, month: u32) -> Self {
        Self { year, month: Some(month), day: None, fuzzy: false }
    }

    /// First day covered by this date
    pub fn start(&self) -> Result<NaiveDate, DataError> {
        let month = self.month.unwrap_or(1);
        let day = self.day.unwrap_or(1);
        make_date(self.year, month, day)
    }

    /// Last day covered by this date
    pub fn end(&self) -> Result<NaiveDate, DataError> {
        let month = self.month.unwrap_or(12);
        let day = match self.day {
            Some(day) => day,
            None => days_in_month(self.year, month)?,
        };
        make_date(self.year, month, day)
    }

    /// Text form (`~1925-03`, `-44-3-15`)
    pub fn display(&self) -> String {
        let mut text = String::new();
        if self.fuzzy {
            text.push('~');
        }
        text.push_str(&self.year.to_string());
        if let Some(month) = self.month {
            text.push_str(&format!("-{}", month));
            if let Some(day) = self.day {
                text.push_str(&format!("-{}", day));
            }
        }
        text
    }
}

/// Whether `year` is a leap year in the proleptic Gregorian calendar
pub fn is_leap_year(year: i32) -> bool {
    year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0)
}

/// Number of days in a month (1-12)
pub fn days_in_month(year: i32, month: u32) -> Result<u32, DataError> {
    const DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    match month {
        2 if is_leap_year(year) => Ok(29),
        1..=12 => Ok(DAYS[(month - 1) as usize]),
        _ => Err(DataError::DataFormat(format!("month {} out of range", month))),
    }
}

/// Build a calendar date, rejecting impossible combinations
pub fn make_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, DataError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        DataError::DataFormat(format!("invalid date {}-{}-{}", year, month, day))
    })
}

/// Parse `[~][-]YYYY[-MM[-DD]]`
pub fn parse_partial_date(text: &str) -> Result<PartialDate, DataError> {
    let malformed = || DataError::DataFormat(format!("cannot parse '{}' as a date", text));

    let mut rest = text.trim();
    let fuzzy = rest.starts_with('~');
    if fuzzy {
        rest = &rest[1..];
    }
    let negative = rest.starts_with('-');
    if negative {
        rest = &rest[1..];
    }

    let mut parts = rest.split('-');
    let year_text = parts.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
    let year: i32 = year_text.parse().map_err(|_| malformed())?;
    let year = if negative { -year } else { year };

    let month = match parts.next() {
        Some(p) => Some(p.parse::<u32>().map_err(|_| malformed())?),
        None => None,
    };
    let day = match parts.next() {
        Some(p) => Some(p.parse::<u32>().map_err(|_| malformed())?),
        None => None,
    };
    if parts.next().is_some() {
        return Err(malformed());
    }

    let date = PartialDate { year, month, day, fuzzy };
    // Validates month and day against the calendar
    date.start()?;
    Ok(date)
}

/// Step sizes for computed date categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGranularity {
    Day,
    Month,
    Year,
    Decade,
    Century,
}

impl DateGranularity {
    /// Start of the period `periods` steps after the one opened by `origin`
    ///
    /// Only the first period starts at `origin`; later ones start on the
    /// first of a month (or of January for year steps), so a bucket's
    /// label always names the period it holds.
    pub fn step(&self, origin: NaiveDate, periods: u32) -> Result<NaiveDate, DataError> {
        if periods == 0 {
            return Ok(origin);
        }
        let overflow = || DataError::DataFormat("date overflow".to_string());
        let years = |per: i32| -> Result<i32, DataError> {
            i32::try_from(periods)
                .ok()
                .and_then(|p| p.checked_mul(per))
                .and_then(|p| origin.year().checked_add(p))
                .ok_or_else(overflow)
        };
        match self {
            DateGranularity::Day => origin
                .checked_add_days(Days::new(u64::from(periods)))
                .ok_or_else(overflow),
            DateGranularity::Month => {
                let months =
                    i64::from(origin.year()) * 12 + i64::from(origin.month0()) + i64::from(periods);
                let year = i32::try_from(months.div_euclid(12)).map_err(|_| overflow())?;
                make_date(year, months.rem_euclid(12) as u32 + 1, 1)
            }
            DateGranularity::Year => make_date(years(1)?, 1, 1),
            DateGranularity::Decade => make_date(years(10)?, 1, 1),
            DateGranularity::Century => make_date(years(100)?, 1, 1),
        }
    }

    /// Category label for a period starting at `date`
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            DateGranularity::Day => format!("{}-{}-{}", date.year(), date.month(), date.day()),
            DateGranularity::Month => format!("{}-{}", date.year(), date.month()),
            _ => date.year().to_string(),
        }
    }
}
