use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_with::DeserializeFromStr;
use std::fmt::Display;
use std::str::FromStr;

use super::error::*;

/// Time zone used to decide which local calendar day an instant belongs to.
#[derive(Clone, Debug, DeserializeFromStr, PartialEq)]
pub enum Tz {
    Local,
    Iana(chrono_tz::Tz),
    Fixed(FixedOffset),
}

impl Default for Tz {
    fn default() -> Self {
        Tz::Local
    }
}

impl Tz {
    const LOCAL_ID: &'static str = "Localtime";

    pub fn utc() -> Self {
        Self::Iana(chrono_tz::UTC)
    }

    pub fn id(&self) -> String {
        match self {
            Tz::Local => Self::LOCAL_ID.to_owned(),
            Tz::Iana(tz) => tz.name().to_owned(),
            Tz::Fixed(offset) => offset.to_string(),
        }
    }

    pub fn local_datetime(&self, instant: &DateTime<Utc>) -> NaiveDateTime {
        match self {
            Tz::Local => instant.with_timezone(&chrono::Local).naive_local(),
            Tz::Iana(tz) => instant.with_timezone(tz).naive_local(),
            Tz::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }

    /// The instant at which the wall clock of this zone shows `local`. The
    /// earlier instant wins on ambiguous times.
    pub fn to_utc(&self, local: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Tz::Local => chrono::Local
                .from_local_datetime(local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            Tz::Iana(tz) => tz
                .from_local_datetime(local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            Tz::Fixed(offset) => offset
                .from_local_datetime(local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    pub fn local_date(&self, instant: &DateTime<Utc>) -> NaiveDate {
        self.local_datetime(instant).date()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(&Utc::now())
    }
}

impl Display for Tz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

fn parse_fixed_offset(s: &str) -> Option<FixedOffset> {
    let s = s.strip_prefix("UTC").unwrap_or(s);
    if !s.is_ascii() {
        return None;
    }
    let (sign, rest) = match s.chars().next()? {
        '+' => (1, &s[1..]),
        '-' => (-1, &s[1..]),
        _ => return None,
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };

    let hours = hours.parse::<i32>().ok()?;
    let minutes = minutes.parse::<i32>().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl FromStr for Tz {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowercase = s.to_lowercase();

        if matches!(lowercase.as_str(), "localtime" | "local") {
            Ok(Tz::Local)
        } else if let Ok(tz) = s.parse::<chrono_tz::Tz>() {
            Ok(Tz::Iana(tz))
        } else if let Some(offset) = parse_fixed_offset(s) {
            Ok(Tz::Fixed(offset))
        } else {
            Err(Error::new(
                ErrorKind::InvalidTimezone,
                &format!("Timezone '{}' not recognized", s),
            ))
        }
    }
}
