//! Instants in the transit agency's local time zone.
//!
//! Feeds deliver absolute instants, but every rider-facing rule (service
//! days, end of service, "later this week") is phrased in Boston local time.
//! [`EasternTime`] stores the instant in UTC and converts on demand.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use std::fmt;
use std::ops::{Add, Sub};

/// Local hour at which one service day ends and the next begins.
pub const SERVICE_DAY_START_HOUR: u32 = 3;

/// Error returned when a local time cannot be turned into an instant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// How to assign a service date to an instant that falls exactly on the
/// service day boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceDateRounding {
    /// 03:00 belongs to the service day that starts at 03:00.
    Forwards,
    /// 03:00 belongs to the service day that ends at 03:00. Used for the
    /// end of an alert's active period.
    Backwards,
}

/// An instant, displayed and reasoned about in America/New_York.
///
/// # Examples
///
/// ```
/// use board_engine::domain::EasternTime;
/// use chrono::{NaiveDate, NaiveTime};
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// let time = NaiveTime::from_hms_opt(1, 30, 0).unwrap();
/// let t = EasternTime::from_local(date, time).unwrap();
///
/// // 01:30 still belongs to the previous day's service
/// assert_eq!(t.service_date(), NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
/// assert_eq!(t.to_string(), "01:30");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EasternTime(DateTime<Utc>);

impl EasternTime {
    /// Wrap a UTC instant.
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Build an instant from a Boston wall-clock date and time.
    ///
    /// Ambiguous times (the repeated hour in November) resolve to the
    /// earlier instant. Times skipped by the spring-forward transition are
    /// rejected.
    pub fn from_local(date: NaiveDate, time: NaiveTime) -> Result<Self, TimeError> {
        New_York
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|local| Self(local.with_timezone(&Utc)))
            .ok_or_else(|| TimeError::new("local time does not exist"))
    }

    /// Parse an RFC 3339 timestamp such as `2024-03-19T14:16:17-04:00`.
    pub fn parse_rfc3339(s: &str) -> Result<Self, TimeError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|_| TimeError::new("expected RFC 3339 timestamp"))
    }

    /// Returns the instant in UTC.
    pub fn utc(&self) -> DateTime<Utc> {
        self.0
    }

    /// Returns the instant in Boston local time.
    pub fn local(&self) -> DateTime<Tz> {
        self.0.with_timezone(&New_York)
    }

    /// Returns the service date, with 03:00 starting a new service day.
    pub fn service_date(&self) -> NaiveDate {
        self.service_date_rounded(ServiceDateRounding::Forwards)
    }

    /// Returns the service date using the given boundary rounding.
    pub fn service_date_rounded(&self, rounding: ServiceDateRounding) -> NaiveDate {
        let local = self.local();
        let date = local.date_naive();
        let on_boundary =
            local.hour() == SERVICE_DAY_START_HOUR && local.minute() == 0 && local.second() == 0;
        let previous = local.hour() < SERVICE_DAY_START_HOUR
            || (on_boundary && rounding == ServiceDateRounding::Backwards);
        if previous {
            date.pred_opt().unwrap_or(date)
        } else {
            date
        }
    }

    /// Returns the ISO weekday number (Monday = 1) of the local date.
    pub fn local_weekday(&self) -> u32 {
        self.local().weekday().number_from_monday()
    }

    /// Add a duration, returning `None` on overflow.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Self)
    }

    /// Returns the duration between two instants.
    ///
    /// Returns a negative duration if `other` is after `self`.
    pub fn signed_duration_since(&self, other: Self) -> Duration {
        self.0.signed_duration_since(other.0)
    }
}

impl Add<Duration> for EasternTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<Duration> for EasternTime {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl Sub for EasternTime {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.signed_duration_since(rhs)
    }
}

impl fmt::Debug for EasternTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EasternTime({})", self.local().format("%Y-%m-%d %H:%M:%S"))
    }
}

impl fmt::Display for EasternTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local = self.local();
        write!(f, "{:02}:{:02}", local.hour(), local.minute())
    }
}
