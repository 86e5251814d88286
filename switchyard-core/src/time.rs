//! clock times and timespans as used by scoped values, frequencies and stop_times.
//!
//! times are stored as seconds since midnight and may exceed 24:00 to express
//! service continuing into the following day. terminology for comparing two
//! timespans:
//!
//! - `contains`: one timespan inclusively contains the other.
//! - `overlaps`: the two timespans share at least one instant.
//! - `conflicting` (see [`crate::scope`]): overlapping but not containing.

use std::fmt;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    #[error("time strings must be in the format HH:MM or HH:MM:SS: '{0}'")]
    TimeFormat(String),
    #[error("timespan must be a list of exactly two time strings: {0:?}")]
    TimespanFormat(Vec<String>),
    #[error("timespan is not in increasing order: ['{0}', '{1}']")]
    TimespanOrder(Time, Time),
}

/// a clock time measured in seconds since midnight. hours of 24 and above
/// denote the following day(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Time(u32);

impl Time {
    pub fn from_secs(seconds: u32) -> Time {
        Time(seconds)
    }

    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Time {
        Time((hours * 60 + minutes) * 60 + seconds)
    }

    /// parse a HH:MM or HH:MM:SS string. hours may be 24 or greater.
    pub fn parse(value: &str) -> Result<Time, TimeError> {
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(TimeError::TimeFormat(value.to_string()));
        }
        let mut fields = [0u32; 3];
        for (i, part) in parts.iter().enumerate() {
            fields[i] = part
                .parse::<u32>()
                .map_err(|_| TimeError::TimeFormat(value.to_string()))?;
        }
        let (hours, minutes, seconds) = (fields[0], fields[1], fields[2]);
        if minutes > 59 || seconds > 59 {
            return Err(TimeError::TimeFormat(value.to_string()));
        }
        Ok(Time::from_hms(hours, minutes, seconds))
    }

    /// the clock hour. can exceed 23 for times on the following day.
    pub fn hour(&self) -> u32 {
        self.0 / 3600
    }

    pub fn minute(&self) -> u32 {
        (self.0 / 60) % 60
    }

    pub fn second(&self) -> u32 {
        self.0 % 60
    }

    pub fn to_secs(&self) -> u32 {
        self.0
    }

    /// resolve this time against a base date, rolling hours of 24+ over into
    /// the following day(s). when no base date is given, today is used.
    pub fn to_datetime(&self, base_date: Option<NaiveDate>) -> NaiveDateTime {
        let base = base_date.unwrap_or_else(|| chrono::Local::now().date_naive());
        let days = self.hour() / 24;
        let time = chrono::NaiveTime::from_hms_opt(self.hour() % 24, self.minute(), self.second())
            .unwrap_or(chrono::NaiveTime::MIN);
        base.and_time(time) + Days::new(days as u64)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour(), self.minute(), self.second())
    }
}

impl TryFrom<String> for Time {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Time::parse(&value)
    }
}

impl From<Time> for String {
    fn from(value: Time) -> Self {
        value.to_string()
    }
}

/// an inclusive span of clock time. end times earlier than start times are
/// rejected at parse time; programmatically constructed spans with end < start
/// are treated as crossing midnight when computing durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Timespan {
    pub start: Time,
    pub end: Time,
}

/// the default timespan, ["00:00", "24:00"], denoting "all times".
pub const DEFAULT_TIMESPAN: Timespan = Timespan {
    start: Time(0),
    end: Time(24 * 3600),
};

impl Timespan {
    pub fn new(start: Time, end: Time) -> Timespan {
        Timespan { start, end }
    }

    /// parse a pair of HH:MM[:SS] strings into a timespan.
    pub fn parse(values: &[String]) -> Result<Timespan, TimeError> {
        if values.len() != 2 {
            return Err(TimeError::TimespanFormat(values.to_vec()));
        }
        let start = Time::parse(&values[0])?;
        let end = Time::parse(&values[1])?;
        if end < start {
            return Err(TimeError::TimespanOrder(start, end));
        }
        Ok(Timespan { start, end })
    }

    /// true for the ["00:00", "24:00"] default scope.
    pub fn is_default(&self) -> bool {
        *self == DEFAULT_TIMESPAN
    }

    /// true if this timespan inclusively contains the other.
    pub fn contains(&self, other: &Timespan) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// true if the two timespans share at least one instant.
    pub fn overlaps(&self, other: &Timespan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// whole minutes of intersection between the two spans, zero when disjoint.
    pub fn overlap_minutes(&self, other: &Timespan) -> u32 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end <= start {
            return 0;
        }
        (end.to_secs() - start.to_secs()) / 60
    }

    /// duration of the span in seconds. an end before the start is assumed to
    /// cross midnight.
    pub fn duration_secs(&self) -> u32 {
        if self.end < self.start {
            24 * 3600 - self.start.to_secs() + self.end.to_secs()
        } else {
            self.end.to_secs() - self.start.to_secs()
        }
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "['{}', '{}']", self.start, self.end)
    }
}

impl TryFrom<Vec<String>> for Timespan {
    type Error = TimeError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Timespan::parse(&value)
    }
}

impl From<Timespan> for Vec<String> {
    fn from(value: Timespan) -> Self {
        vec![value.start.to_string(), value.end.to_string()]
    }
}

/// filter a list of timespans to those overlapping the query timespan.
pub fn filter_to_overlapping<'a>(
    timespans: &'a [Timespan],
    query: &Timespan,
) -> Vec<&'a Timespan> {
    timespans.iter().filter(|ts| ts.overlaps(query)).collect()
}

/// true if any pair within the list overlaps. n is expected to be small.
pub fn any_overlap(timespans: &[Timespan]) -> bool {
    for i in 0..timespans.len() {
        for j in (i + 1)..timespans.len() {
            if timespans[i].overlaps(&timespans[j]) {
                return true;
            }
        }
    }
    false
}
