//! Year-month references and the calendar arithmetic built on them.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// An accounting month (`YYYY-MM`), e.g. the invoice period of a card purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthRef {
    year: i32,
    month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Result<Self, MonthRefError> {
        if !(1..=12).contains(&month) {
            return Err(MonthRefError::InvalidMonth(month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(MonthRefError::InvalidYear(year));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_index(date.year() * 12 + date.month0() as i32)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    fn index(&self) -> i32 {
        self.year * 12 + self.month as i32 - 1
    }

    fn from_index(index: i32) -> Self {
        let clamped = index.clamp(MIN_YEAR * 12, MAX_YEAR * 12 + 11);
        Self {
            year: clamped.div_euclid(12),
            month: clamped.rem_euclid(12) as u32 + 1,
        }
    }

    /// Moves `months` calendar months forward (or backward when negative).
    pub fn shift(self, months: i32) -> Self {
        Self::from_index(self.index() + months)
    }

    pub fn next(self) -> Self {
        self.shift(1)
    }

    pub fn previous(self) -> Self {
        self.shift(-1)
    }

    /// Number of months from `self` to `other` (negative when `other` is earlier).
    pub fn months_until(&self, other: MonthRef) -> i32 {
        other.index() - self.index()
    }

    pub fn days_in_month(&self) -> u32 {
        let first = self.first_day();
        let next_first = self.next().first_day();
        if next_first > first {
            (next_first - first).num_days() as u32
        } else {
            31
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        calendar_date(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.day(31)
    }

    /// Returns `day` within this month, clamped to the last valid day.
    pub fn day(&self, day: u32) -> NaiveDate {
        let clamped = day.clamp(1, self.days_in_month());
        calendar_date(self.year, self.month, clamped)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        MonthRef::from_date(date) == *self
    }

    /// Iterates `count` consecutive months starting at `self`.
    pub fn range(self, count: u32) -> impl Iterator<Item = MonthRef> {
        (0..count as i32).map(move |offset| self.shift(offset))
    }
}

/// Moves `date` by `months` calendar months, clamping the day to the target month.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    MonthRef::from_date(date).shift(months).day(date.day())
}

/// Last date of the look-ahead window that starts on `reference`.
pub fn window_end(reference: NaiveDate, days: i64) -> NaiveDate {
    reference + Duration::days(days)
}

fn calendar_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 28))
        .unwrap_or(NaiveDate::MIN)
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthRef {
    type Err = MonthRefError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (year, month) = trimmed
            .split_once('-')
            .ok_or_else(|| MonthRefError::Malformed(trimmed.to_string()))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| MonthRefError::Malformed(trimmed.to_string()))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| MonthRefError::Malformed(trimmed.to_string()))?;
        MonthRef::new(year, month)
    }
}

impl Serialize for MonthRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        MonthRef::from_str(&raw).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Errors that can occur when constructing [`MonthRef`] values.
pub enum MonthRefError {
    InvalidMonth(u32),
    InvalidYear(i32),
    Malformed(String),
}

impl fmt::Display for MonthRefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthRefError::InvalidMonth(month) => write!(f, "month {month} is outside 1-12"),
            MonthRefError::InvalidYear(year) => write!(f, "year {year} is out of range"),
            MonthRefError::Malformed(raw) => write!(f, "`{raw}` is not a YYYY-MM month"),
        }
    }
}

impl std::error::Error for MonthRefError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> MonthRef {
        MonthRef::new(year, month).unwrap()
    }

    #[test]
    fn shift_rolls_over_year_boundaries() {
        assert_eq!(month(2025, 12).next(), month(2026, 1));
        assert_eq!(month(2026, 1).previous(), month(2025, 12));
        assert_eq!(month(2026, 3).shift(-15), month(2024, 12));
    }

    #[test]
    fn day_is_clamped_to_month_length() {
        assert_eq!(
            month(2026, 2).day(31),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
        assert_eq!(
            month(2024, 2).day(30),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(month(2026, 4).last_day().day(), 30);
        assert_eq!(month(2026, 12).days_in_month(), 31);
    }

    #[test]
    fn add_months_clamps_end_of_month() {
        let jan_31 = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(
            add_months(jan_31, 1),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
        assert_eq!(
            add_months(jan_31, 2),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()
        );
    }

    #[test]
    fn parses_and_displays_year_month() {
        let parsed: MonthRef = "2026-02".parse().unwrap();
        assert_eq!(parsed, month(2026, 2));
        assert_eq!(parsed.to_string(), "2026-02");
        assert!("2026-13".parse::<MonthRef>().is_err());
        assert!("february".parse::<MonthRef>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&month(2026, 7)).unwrap();
        assert_eq!(json, "\"2026-07\"");
        let back: MonthRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, month(2026, 7));
    }
}
