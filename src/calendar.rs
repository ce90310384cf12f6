use chrono::{DateTime, Datelike, Duration, Month, NaiveDate, Utc, Weekday};
use derive_more::{Display, From};
use num_traits::FromPrimitive;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::provider::{Error, ErrorKind, Result, Tz};

pub fn days_of_month(month: &Month, year: i32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month.number_from_month(), 1)?;
    let next = if month.number_from_month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month.number_from_month() + 1, 1)?
    };

    Some(next.signed_duration_since(first).num_days() as u32)
}

/// A date in the local calendar, used to group photos by the day they were taken.
#[derive(Clone, Copy, Debug, Display, From, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(DayKey)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

/// A calendar month independent of any day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearMonth {
    month: Month,
    year: i32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let month = Month::from_u32(month).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidMonth,
                &format!("month {} out of range", month),
            )
        })?;

        Self::from_month(month, year)
    }

    pub fn from_month(month: Month, year: i32) -> Result<Self> {
        // Both ends of the month must be representable for a full layout.
        if days_of_month(&month, year).is_none() {
            return Err(Error::new(
                ErrorKind::InvalidMonth,
                &format!("{:04}-{:02} out of range", year, month.number_from_month()),
            ));
        }

        Ok(YearMonth { month, year })
    }

    pub fn containing<T: Datelike>(date: &T) -> Self {
        YearMonth {
            month: Month::from_u32(date.month()).unwrap_or(Month::January),
            year: date.year(),
        }
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn first_day(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.number_from_month(), 1)
            .ok_or_else(|| Error::new(ErrorKind::InvalidMonth, &self.to_string()))
    }

    pub fn num_days(&self) -> Result<u32> {
        days_of_month(&self.month, self.year)
            .ok_or_else(|| Error::new(ErrorKind::InvalidMonth, &self.to_string()))
    }

    pub fn contains(&self, day: &DayKey) -> bool {
        day.date().year() == self.year && day.date().month() == self.month.number_from_month()
    }

    /// Shifts by `months`, crossing year boundaries as needed.
    pub fn offset(&self, months: i32) -> Result<Self> {
        let out_of_range = || {
            Error::new(
                ErrorKind::InvalidMonth,
                &format!("{} shifted by {} months out of range", self, months),
            )
        };

        let index = i64::from(self.year) * 12 + i64::from(self.month.number_from_month()) - 1
            + i64::from(months);
        let year = i32::try_from(index.div_euclid(12)).map_err(|_| out_of_range())?;

        Self::new(year, index.rem_euclid(12) as u32 + 1)
    }

    pub fn succ(&self) -> Result<Self> {
        self.offset(1)
    }

    pub fn pred(&self) -> Result<Self> {
        self.offset(-1)
    }
}

impl Add<u32> for YearMonth {
    type Output = Result<YearMonth>;
    fn add(self, rhs: u32) -> Self::Output {
        let months = i32::try_from(rhs)
            .map_err(|_| Error::new(ErrorKind::InvalidMonth, &format!("{} + {}", self, rhs)))?;
        self.offset(months)
    }
}

impl Sub<u32> for YearMonth {
    type Output = Result<YearMonth>;
    fn sub(self, rhs: u32) -> Self::Output {
        let months = i32::try_from(rhs)
            .map_err(|_| Error::new(ErrorKind::InvalidMonth, &format!("{} - {}", self, rhs)))?;
        self.offset(-months)
    }
}

impl PartialOrd for YearMonth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for YearMonth {
    fn cmp(&self, other: &Self) -> Ordering {
        self.year.cmp(&other.year).then_with(|| {
            self.month
                .number_from_month()
                .cmp(&other.month.number_from_month())
        })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month.number_from_month())
    }
}

impl FromStr for YearMonth {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::new(
                ErrorKind::InvalidMonth,
                &format!("'{}' is not of the form YYYY-MM", s),
            )
        };

        let (year, month) = s.trim().rsplit_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;

        YearMonth::new(year, month)
    }
}

/// Calendar rules used for bucketing and layout.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocalCalendar {
    #[serde(rename = "timezone")]
    pub tz: Tz,
    #[serde_as(as = "DisplayFromStr")]
    pub week_start: Weekday,
}

impl Default for LocalCalendar {
    fn default() -> Self {
        LocalCalendar {
            tz: Tz::Local,
            week_start: Weekday::Sun,
        }
    }
}

impl LocalCalendar {
    pub fn new(tz: Tz, week_start: Weekday) -> Self {
        LocalCalendar { tz, week_start }
    }

    pub fn day_key(&self, instant: &DateTime<Utc>) -> DayKey {
        DayKey(self.tz.local_date(instant))
    }

    pub fn today(&self) -> DayKey {
        DayKey(self.tz.today())
    }

    pub fn current_month(&self) -> YearMonth {
        YearMonth::containing(&self.tz.today())
    }

    /// Column of `date` in a week beginning at `week_start`, 0 to 6.
    pub fn weekday_offset(&self, date: &NaiveDate) -> u32 {
        (date.weekday().num_days_from_monday() + 7 - self.week_start.num_days_from_monday()) % 7
    }

    /// The seven weekdays in column order.
    pub fn weekdays(&self) -> impl Iterator<Item = Weekday> {
        std::iter::successors(Some(self.week_start), |day| Some(day.succ())).take(7)
    }

    pub fn date_after(&self, first: &NaiveDate, days: u32) -> Option<NaiveDate> {
        first.checked_add_signed(Duration::days(days as i64))
    }
}
