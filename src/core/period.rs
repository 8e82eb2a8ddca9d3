use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::error::DeclarationError;

/// Earliest year accepted in a period.
pub const MIN_YEAR: i32 = 2000;
/// Latest year accepted in a period.
pub const MAX_YEAR: i32 = 2030;
/// Day of the following month on which payment falls due.
pub const PAYMENT_DAY: u32 = 14;

/// A declaration period: one calendar month, written `YYYYMM`.
///
/// ```
/// use dds::core::Period;
///
/// let p: Period = "202103".parse().unwrap();
/// assert_eq!(p.year(), 2021);
/// assert_eq!(p.month(), 3);
/// assert_eq!(p.to_string(), "202103");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    pub(crate) year: i32,
    pub(crate) month: u32,
}

impl Period {
    /// Create a period, rejecting months outside 1–12 and years outside
    /// [`MIN_YEAR`]–[`MAX_YEAR`].
    pub fn new(year: i32, month: u32) -> Result<Self, DeclarationError> {
        let invalid = |reason: String| DeclarationError::InvalidPeriod {
            value: format!("{year:04}{month:02}"),
            reason,
        };
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(invalid(format!(
                "year {year} outside {MIN_YEAR}..={MAX_YEAR}"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(invalid(format!("month {month} outside 1..=12")));
        }
        Ok(Self { year, month })
    }

    /// Parse a `YYYYMM` string. Out-of-range values are errors, never clamped.
    pub fn parse(value: &str) -> Result<Self, DeclarationError> {
        if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DeclarationError::InvalidPeriod {
                value: value.to_string(),
                reason: "expected 6 digits in YYYYMM format".into(),
            });
        }
        let year: i32 = value[..4].parse().map_err(|_| DeclarationError::InvalidPeriod {
            value: value.to_string(),
            reason: "year is not numeric".into(),
        })?;
        let month: u32 = value[4..].parse().map_err(|_| DeclarationError::InvalidPeriod {
            value: value.to_string(),
            reason: "month is not numeric".into(),
        })?;
        Self::new(year, month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month after this one, rolling the year after December.
    ///
    /// Not range-checked: the month after `203012` is still representable.
    pub fn next(&self) -> Period {
        if self.month == 12 {
            Period {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Period {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First calendar day of the period.
    pub fn first_day(&self) -> NaiveDate {
        self.day(1)
    }

    /// Last calendar day of the period.
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(self.first_day())
    }

    /// Whether `date` falls within this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The period a date belongs to, if its year is in range.
    pub fn of(date: NaiveDate) -> Result<Self, DeclarationError> {
        Self::new(date.year(), date.month())
    }

    /// Payment deadline: the 14th of the following month, moved to Monday when
    /// it falls on a weekend.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use dds::core::Period;
    ///
    /// let p = Period::parse("202103").unwrap();
    /// assert_eq!(p.payment_deadline(), NaiveDate::from_ymd_opt(2021, 4, 14).unwrap());
    /// ```
    pub fn payment_deadline(&self) -> NaiveDate {
        next_weekday(self.next().day(PAYMENT_DAY))
    }

    // `month` is always 1..=12 and `day` is at most 14, so the fallback is never taken.
    fn day(&self, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or(NaiveDate::MIN)
    }
}

/// Shift Saturday and Sunday forward to the following Monday.
pub fn next_weekday(date: NaiveDate) -> NaiveDate {
    let shift = match date.weekday() {
        Weekday::Sat => 2,
        Weekday::Sun => 1,
        _ => 0,
    };
    date.checked_add_days(Days::new(shift)).unwrap_or(date)
}

/// Payment deadline for a `YYYYMM` period string.
pub fn payment_deadline(period: &str) -> Result<NaiveDate, DeclarationError> {
    Ok(Period::parse(period)?.payment_deadline())
}

/// Count weekdays from `from` (inclusive) up to `deadline` (exclusive).
/// Zero when the deadline is not in the future.
pub fn business_days_until(from: NaiveDate, deadline: NaiveDate) -> u32 {
    from.iter_days()
        .take_while(|d| *d < deadline)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as u32
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Period {
    type Error = DeclarationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}
