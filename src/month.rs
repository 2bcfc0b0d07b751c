//! Calendar month arithmetic on `YYYY-MM` strings.

use crate::error::{ReportError, ReportResult};
use chrono::Datelike;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, ReportError> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(ReportError::InvalidMonth(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Shift by `n` months; negative values move backwards across years.
    /// Fails when the result leaves the four-digit year range.
    pub fn add_months(self, n: i32) -> ReportResult<Self> {
        let index = i64::from(self.year) * 12 + i64::from(self.month) - 1 + i64::from(n);
        let out_of_range = || ReportError::MonthOutOfRange {
            month: self.to_string(),
            offset: n,
        };
        let year = i32::try_from(index.div_euclid(12)).map_err(|_| out_of_range())?;
        let month = index.rem_euclid(12) as u32 + 1;
        Month::new(year, month).map_err(|_| out_of_range())
    }

    /// The month before the current local date.
    pub fn previous() -> ReportResult<Self> {
        let today = chrono::Local::now().date_naive();
        Month::new(today.year(), today.month())?.add_months(-1)
    }

    /// Exclusive end of a usage window starting at this month.
    pub fn window_end(self) -> ReportResult<Month> {
        self.add_months(1)
    }
}

impl FromStr for Month {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReportError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || month.len() != 2 || !digits(year) || !digits(month) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Month::new(year, month).map_err(|_| invalid())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
