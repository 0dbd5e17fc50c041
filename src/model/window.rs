//! Inclusive UTC date windows
//!
//! Every filtering decision in the harvester goes through [`DateWindow`]:
//! discovery uses a wide window to pick topics, filtering uses a narrower one
//! to pick posts.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::fmt;
use thiserror::Error;

/// Errors raised while building a window or parsing a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window start {start} is after window end {end}")]
    Inverted { start: String, end: String },

    #[error("invalid date '{0}', expected YYYY-MM-DD or RFC 3339")]
    InvalidDate(String),
}

/// A forum timestamp that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable timestamp '{raw}'")]
pub struct TimestampError {
    pub raw: String,
}

/// An inclusive `[start, end]` interval in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateWindow {
    /// Creates a window from two instants; fails if `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates a window covering whole calendar days
    ///
    /// The window starts at `00:00:00` on `start` and ends at
    /// `23:59:59.999999` on `end`, both UTC.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        Self::new(start_of_day(start), end_of_day(end))
    }

    /// Parses a pair of bounds as they appear in the config file
    ///
    /// Plain dates expand to whole days; RFC 3339 values are taken as-is.
    pub fn parse(start: &str, end: &str) -> Result<Self, WindowError> {
        let start = parse_bound(start, false)?;
        let end = parse_bound(end, true)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if `t` lies in the window, both bounds included
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    /// Parses a raw forum timestamp and checks it against the window
    pub fn contains_raw(&self, raw: &str) -> Result<bool, TimestampError> {
        parse_timestamp(raw).map(|t| self.contains(t))
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Parses a forum timestamp such as `2025-02-01T10:15:00.000Z`
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimestampError {
            raw: raw.to_string(),
        })
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

// Last representable microsecond of the day
fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::microseconds(1)
}

fn parse_bound(raw: &str, is_end: bool) -> Result<DateTime<Utc>, WindowError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(if is_end {
            end_of_day(date)
        } else {
            start_of_day(date)
        });
    }
    parse_timestamp(trimmed).map_err(|_| WindowError::InvalidDate(raw.to_string()))
}
