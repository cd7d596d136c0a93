use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{CoreError, CoreResult};

const MICROS_PER_SECOND: i64 = 1_000_000;

/// A UTC instant with microsecond resolution.
///
/// `microseconds` is always normalized into `0..1_000_000`, so instants
/// before the epoch carry a negative `seconds` and a positive fraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    seconds: i64,
    microseconds: i32,
}

impl Time {
    pub fn new(seconds: i64, microseconds: i64) -> Self {
        let total = seconds
            .saturating_mul(MICROS_PER_SECOND)
            .saturating_add(microseconds);
        Self {
            seconds: total.div_euclid(MICROS_PER_SECOND),
            microseconds: total.rem_euclid(MICROS_PER_SECOND) as i32,
        }
    }

    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn microseconds(&self) -> i32 {
        self.microseconds
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.microseconds as u32 * 1000)
    }

    /// ISO-8601 representation, e.g. `2024-03-01T12:00:00.250000Z`.
    pub fn iso(&self) -> String {
        match self.to_datetime() {
            Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            None => format!("{}.{:06}", self.seconds, self.microseconds),
        }
    }

    /// Parse an ISO-8601 UTC timestamp. The fractional part, the trailing `Z`
    /// and the time of day are optional, and a space may replace the `T`.
    pub fn from_iso(text: &str) -> CoreResult<Self> {
        let trimmed = text.trim();
        let body = trimmed.strip_suffix('Z').unwrap_or(trimmed);
        let parsed = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(body, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(body, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| CoreError::InvalidTime(text.to_string()))?;
        Ok(Self::from(parsed.and_utc()))
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::new(dt.timestamp(), i64::from(dt.timestamp_subsec_micros()))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso())
    }
}

impl FromStr for Time {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_iso(s)
    }
}
