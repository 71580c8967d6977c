//! Calendar month arithmetic.
//!
//! Budgets are kept per calendar month only. A [`BudgetMonth`] is always a
//! valid (year, month) pair, so date boundaries derived from it never fail.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::error::BudgetError;

/// Earliest year accepted for a budget month.
pub const MIN_YEAR: i32 = 1;
/// Latest year accepted for a budget month.
pub const MAX_YEAR: i32 = 9999;

/// A validated calendar month.
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BudgetMonth {
    year: i32,
    month: u32,
}

impl BudgetMonth {
    /// Creates a month, rejecting a month outside `1..=12` or a year outside
    /// `1..=9999`.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidInput` for an out-of-range year or month.
    pub fn new(year: i32, month: u32) -> Result<Self, BudgetError> {
        if !(1..=12).contains(&month) {
            return Err(BudgetError::InvalidInput(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(BudgetError::InvalidInput(format!(
                "year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Creates a month from raw signed inputs as they arrive from storage or
    /// query strings.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidInput` when the pair is not a valid month.
    pub fn from_parts(year: i32, month: i32) -> Result<Self, BudgetError> {
        let month = u32::try_from(month)
            .map_err(|_| BudgetError::InvalidInput(format!("invalid month: {month}")))?;
        Self::new(year, month)
    }

    /// The month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current month in UTC.
    #[must_use]
    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Month of the year, 1-based.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// Month of the year as stored in integer columns.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn month_number(self) -> i32 {
        // Always 1..=12.
        self.month as i32
    }

    /// The month before this one, rolling January back to December of the
    /// previous year.
    #[must_use]
    pub const fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The month after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First day of the month (inclusive bound).
    #[must_use]
    pub fn start_date(self) -> NaiveDate {
        // Year and month were validated on construction.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First day of the following month (exclusive bound).
    #[must_use]
    pub fn end_exclusive(self) -> NaiveDate {
        self.next().start_date()
    }

    /// Returns true if `date` falls inside this month.
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start_date() && date < self.end_exclusive()
    }

    /// Months from `self` through `last`, inclusive, oldest first.
    ///
    /// Empty when `last` precedes `self`.
    pub fn through(self, last: Self) -> impl Iterator<Item = Self> {
        let mut cursor = Some(self);
        std::iter::from_fn(move || {
            let current = cursor.filter(|m| *m <= last)?;
            cursor = Some(current.next());
            Some(current)
        })
    }
}

impl FromStr for BudgetMonth {
    type Err = BudgetError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BudgetError::InvalidInput(format!("expected YYYY-MM, got {s:?}"));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl fmt::Display for BudgetMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
