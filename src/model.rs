// Core structs: ListingId, DateRange, PriceObservation, ListingReport, ScheduleSpec
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Deserialize;
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

/// Text written in place of a price when extraction failed.
pub const NOT_AVAILABLE: &str = "Not Available";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contiguous run of calendar dates, never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    dates: Vec<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, days: NonZeroU32) -> Self {
        let dates = start.iter_days().take(days.get() as usize).collect();
        Self { dates }
    }

    pub fn start(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceValue {
    Price(String),
    Unavailable,
}

impl PriceValue {
    pub fn is_available(&self) -> bool {
        matches!(self, PriceValue::Price(_))
    }
}

impl fmt::Display for PriceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceValue::Price(text) => f.write_str(text),
            PriceValue::Unavailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub value: PriceValue,
}

/// All observations for one listing, in date-range order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingReport {
    pub listing: ListingId,
    pub observations: Vec<PriceObservation>,
}

impl ListingReport {
    /// Report with every date marked unavailable.
    pub fn unavailable(listing: ListingId, dates: &DateRange) -> Self {
        let observations = dates
            .iter()
            .map(|date| PriceObservation { date, value: PriceValue::Unavailable })
            .collect();
        Self { listing, observations }
    }

    pub fn available_count(&self) -> usize {
        self.observations.iter().filter(|o| o.value.is_available()).count()
    }
}

/// Daily trigger time (minute precision) plus how many days to scrape from the trigger date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawScheduleSpec")]
pub struct ScheduleSpec {
    trigger: NaiveTime,
    days: NonZeroU32,
}

impl ScheduleSpec {
    pub fn new(trigger: NaiveTime, days: NonZeroU32) -> Self {
        let trigger = trigger.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(trigger);
        Self { trigger, days }
    }

    /// Accepts `HH:MM` or `YYYY-MM-DD HH:MM`; only the time of day is kept.
    pub fn parse_time(input: &str) -> Result<NaiveTime, ScheduleError> {
        let input = input.trim();
        if let Ok(time) = NaiveTime::parse_from_str(input, "%H:%M") {
            return Ok(time);
        }
        NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
            .map(|dt| dt.time())
            .map_err(|_| ScheduleError::InvalidTime(input.to_string()))
    }

    pub fn parse_days(input: &str) -> Result<NonZeroU32, ScheduleError> {
        let input = input.trim();
        input
            .parse::<NonZeroU32>()
            .map_err(|_| ScheduleError::InvalidDays(input.to_string()))
    }

    pub fn parse(time: &str, days: &str) -> Result<Self, ScheduleError> {
        Ok(Self::new(Self::parse_time(time)?, Self::parse_days(days)?))
    }

    pub fn trigger(&self) -> NaiveTime {
        self.trigger
    }

    pub fn days(&self) -> NonZeroU32 {
        self.days
    }

    /// True when `time` falls inside the trigger minute.
    pub fn matches(&self, time: NaiveTime) -> bool {
        time.hour() == self.trigger.hour() && time.minute() == self.trigger.minute()
    }
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "daily at {} for {} day(s)", self.trigger.format("%H:%M"), self.days)
    }
}

#[derive(Debug, Deserialize)]
struct RawScheduleSpec {
    time: String,
    days: u32,
}

impl TryFrom<RawScheduleSpec> for ScheduleSpec {
    type Error = ScheduleError;

    fn try_from(raw: RawScheduleSpec) -> Result<Self, Self::Error> {
        let trigger = Self::parse_time(&raw.time)?;
        let days = NonZeroU32::new(raw.days).ok_or_else(|| ScheduleError::InvalidDays(raw.days.to_string()))?;
        Ok(Self::new(trigger, days))
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("{what} timed out after {after:?}")]
    Timeout { what: &'static str, after: Duration },
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram api responded {status}: {body}")]
    Api { status: u16, body: String },
    #[error("telegram unreachable")]
    Unreachable,
    #[error("cannot read report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid time '{0}', expected HH:MM or YYYY-MM-DD HH:MM")]
    InvalidTime(String),
    #[error("invalid day count '{0}', expected a positive integer")]
    InvalidDays(String),
}
