use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeDelta, TimeZone};
use serde::Serialize;

use crate::error::HabitError;

/// Canonical on-disk and lookup representation of a calendar day.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Calendar day of `instant` as seen in its own offset. Time of day is dropped.
pub fn date_key<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    format_date(instant.date_naive())
}

/// Parses exactly `YYYY-MM-DD`, zero-padded.
pub fn parse_date(input: &str) -> Result<NaiveDate, HabitError> {
    let trimmed = input.trim();
    if trimmed.len() != 10 {
        return Err(HabitError::InvalidDate(input.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| HabitError::InvalidDate(input.to_string()))
}

pub fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

pub fn month_name(month0: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month0 as usize).copied()
}

pub fn days_in_month(year: i32, month0: u32) -> Result<u32, HabitError> {
    Ok(MonthRef::new(year, month0)?.day_count())
}

pub fn enumerate_month_dates(year: i32, month0: u32) -> Result<Vec<NaiveDate>, HabitError> {
    Ok(MonthRef::new(year, month0)?.dates())
}

/// A validated calendar month. Month indices are 0-based; anything above 11 is rejected
/// rather than rolled into the following year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthRef {
    first: NaiveDate,
}

impl MonthRef {
    pub fn new(year: i32, month0: u32) -> Result<Self, HabitError> {
        if month0 > 11 {
            return Err(HabitError::MonthOutOfRange(month0));
        }
        let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)
            .ok_or_else(|| HabitError::InvalidDate(format!("{year}-{:02}-01", month0 + 1)))?;
        Ok(Self { first })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month0(&self) -> u32 {
        self.first.month0()
    }

    pub fn name(&self) -> &'static str {
        MONTH_NAMES[self.month0() as usize]
    }

    /// Number of days, measured as the distance to the first of the next month.
    pub fn day_count(&self) -> u32 {
        // Only December can fail at the far end of chrono's range, and December has 31 days.
        self.first
            .checked_add_months(Months::new(1))
            .map(|next| (next - self.first).num_days() as u32)
            .unwrap_or(31)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.first
            .iter_days()
            .take(self.day_count() as usize)
            .collect()
    }

    pub fn next(&self) -> Self {
        self.first
            .checked_add_months(Months::new(1))
            .map(|first| Self { first })
            .unwrap_or(*self)
    }

    pub fn previous(&self) -> Self {
        self.first
            .checked_sub_months(Months::new(1))
            .map(|first| Self { first })
            .unwrap_or(*self)
    }
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.year())
    }
}

impl FromStr for MonthRef {
    type Err = HabitError;

    /// Parses `YYYY-MM` with a 1-based month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HabitError::InvalidDate(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if month == 0 {
            return Err(invalid());
        }
        Self::new(year, month - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekDay {
    pub date: NaiveDate,
    pub is_today: bool,
    pub is_future: bool,
}

/// Monday-first week containing `today`, shifted by `offset_weeks` (negative looks back).
/// Returns `None` when the shift leaves the representable calendar.
pub fn week_dates(today: NaiveDate, offset_weeks: i64) -> Option<Vec<WeekDay>> {
    let monday = today.checked_sub_days(Days::new(
        u64::from(today.weekday().num_days_from_monday()),
    ))?;
    let monday = monday.checked_add_signed(TimeDelta::try_weeks(offset_weeks)?)?;
    let days = monday
        .iter_days()
        .take(7)
        .map(|date| WeekDay {
            date,
            is_today: date == today,
            is_future: date > today,
        })
        .collect::<Vec<_>>();
    (days.len() == 7).then_some(days)
}
