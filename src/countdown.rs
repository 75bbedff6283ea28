use chrono::{DateTime, Local, NaiveDate, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::COUNTDOWN_FIELD_IDS;

static TARGET_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日").expect("valid date pattern"));

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

#[derive(Debug, Error, PartialEq)]
pub enum CountdownError {
    #[error("target date attribute missing")]
    MissingAttribute,
    #[error("invalid date format: {0}")]
    InvalidFormat(String),
    #[error("invalid date created from: {0}")]
    InvalidDate(String),
}

/// Parses a date written as `2025年11月10日`. The pattern may appear anywhere in
/// the text.
pub fn parse_target_date(text: &str) -> Result<NaiveDate, CountdownError> {
    let captures = TARGET_DATE_PATTERN
        .captures(text)
        .ok_or_else(|| CountdownError::InvalidFormat(text.to_string()))?;
    let field = |index: usize| -> Result<u32, CountdownError> {
        captures[index]
            .parse()
            .map_err(|_| CountdownError::InvalidDate(text.to_string()))
    };
    let year = i32::try_from(field(1)?).map_err(|_| CountdownError::InvalidDate(text.to_string()))?;
    NaiveDate::from_ymd_opt(year, field(2)?, field(3)?).ok_or_else(|| CountdownError::InvalidDate(text.to_string()))
}

/// Midnight at the start of `date` in the browser's time zone.
pub fn local_midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local.from_local_datetime(&midnight).earliest()
}

pub fn target_from_attribute(value: Option<String>) -> Result<DateTime<Local>, CountdownError> {
    let value = value.ok_or(CountdownError::MissingAttribute)?;
    let date = parse_target_date(&value)?;
    local_midnight(date).ok_or(CountdownError::InvalidDate(value))
}

/// Whole units left until the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    pub fn between<Tz: TimeZone>(target: &DateTime<Tz>, now: &DateTime<Tz>) -> Self {
        let diff = target.clone().signed_duration_since(now.clone()).num_milliseconds();
        if diff <= 0 {
            return Self::default();
        }
        Self {
            days: diff / DAY_MS,
            hours: diff % DAY_MS / HOUR_MS,
            minutes: diff % HOUR_MS / MINUTE_MS,
            seconds: diff % MINUTE_MS / SECOND_MS,
        }
    }

    /// True once the target has been reached; the display stops ticking.
    pub fn is_finished(&self) -> bool {
        *self == Self::default()
    }

    /// Days, hours, minutes, seconds padded to at least two digits.
    pub fn fields(&self) -> [String; 4] {
        [self.days, self.hours, self.minutes, self.seconds].map(|value| format!("{:02}", value))
    }
}

/// Looks up the days/hours/minutes/seconds fields in that order; `None` when
/// any one of them is missing.
pub fn display_fields<T>(mut lookup: impl FnMut(&str) -> Option<T>) -> Option<[T; 4]> {
    let [days, hours, minutes, seconds] = COUNTDOWN_FIELD_IDS;
    Some([lookup(days)?, lookup(hours)?, lookup(minutes)?, lookup(seconds)?])
}

/// Decides what each one-second tick shows. Once the target is reached it
/// hands out the all-zero reading one last time and then stops.
#[derive(Clone, Debug)]
pub struct CountdownClock<Tz: TimeZone> {
    target: DateTime<Tz>,
    running: bool,
}

impl<Tz: TimeZone> CountdownClock<Tz> {
    pub fn new(target: DateTime<Tz>) -> Self {
        Self { target, running: true }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The reading to display at `now`, or `None` once the clock has stopped.
    pub fn tick(&mut self, now: &DateTime<Tz>) -> Option<Remaining> {
        if !self.running {
            return None;
        }
        let remaining = Remaining::between(&self.target, now);
        if remaining.is_finished() {
            self.running = false;
        }
        Some(remaining)
    }
}
