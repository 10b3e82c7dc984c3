use super::{BillingError, BillingResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// Calendar month without day or time of day
///
/// Ordering is by `(year, month)`, which the derive gives us from the field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month value, rejecting months outside 1-12
    pub fn new(year: i32, month: u32) -> BillingResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(BillingError::InvalidDateFormat(format!(
                "month {} is out of range",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months since year zero, used for month arithmetic
    pub(crate) fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// First day of this month, the form stored in the database
    pub fn first_day(&self) -> NaiveDate {
        // Always valid: month is 1-12 and day 1 exists in every month
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month, self.year)
    }
}

impl FromStr for YearMonth {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_month(s)
    }
}

/// Parse a strict "MM-YYYY" month
pub fn parse_month(text: &str) -> BillingResult<YearMonth> {
    let invalid = || BillingError::InvalidDateFormat(text.to_string());

    let bytes = text.as_bytes();
    if bytes.len() != 7 || bytes[2] != b'-' {
        return Err(invalid());
    }
    let (month, year) = (&text[..2], &text[3..]);
    if !month.bytes().chain(year.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let month: u32 = month.parse().map_err(|_| invalid())?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    YearMonth::new(year, month).map_err(|_| invalid())
}

/// Format a month as "MM-YYYY"; an open bound stays absent
pub fn format_month(month: Option<YearMonth>) -> Option<String> {
    month.map(|m| m.to_string())
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_month(&text).map_err(de::Error::custom)
    }
}
