//! Minute-precision time of day used for dose schedules.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A dose time could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid dose time '{0}': expected HH:MM")]
pub struct TimeParseError(pub String);

/// A daily dose time such as `08:00`.
///
/// Always rendered zero-padded, so ordering matches string ordering of the
/// persisted form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DoseTime(NaiveTime);

impl DoseTime {
    /// Build from hour and minute.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Truncate a wall-clock time to the minute.
    pub fn from_time(time: NaiveTime) -> Self {
        time.with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .map_or(Self(time), Self)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl fmt::Display for DoseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for DoseTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .map(Self)
            .map_err(|_| TimeParseError(s.to_string()))
    }
}

impl TryFrom<String> for DoseTime {
    type Error = TimeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DoseTime> for String {
    fn from(time: DoseTime) -> Self {
        time.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let time: DoseTime = "08:00".parse().unwrap();
        assert_eq!(time.to_string(), "08:00");
        assert_eq!(time.hour(), 8);
        assert_eq!(time.minute(), 0);
    }

    #[test]
    fn test_single_digit_hour_is_padded() {
        let time: DoseTime = "8:05".parse().unwrap();
        assert_eq!(time.to_string(), "08:05");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("".parse::<DoseTime>().is_err());
        assert!("25:00".parse::<DoseTime>().is_err());
        assert!("08:60".parse::<DoseTime>().is_err());
        assert!("eight".parse::<DoseTime>().is_err());
        assert!("08:00:30".parse::<DoseTime>().is_err());
    }

    #[test]
    fn test_ordering_matches_string_ordering() {
        let mut times: Vec<DoseTime> = ["20:00", "08:00", "13:30", "00:15"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        times.sort();
        let rendered: Vec<String> = times.iter().map(|t| t.to_string()).collect();
        let mut sorted = rendered.clone();
        sorted.sort();
        assert_eq!(rendered, sorted);
    }

    #[test]
    fn test_from_time_truncates_seconds() {
        let wall = NaiveTime::from_hms_opt(8, 0, 42).unwrap();
        assert_eq!(DoseTime::from_time(wall), DoseTime::from_hm(8, 0).unwrap());

        let precise = NaiveTime::from_hms_nano_opt(20, 15, 59, 999_000_000).unwrap();
        assert_eq!(DoseTime::from_time(precise), DoseTime::from_hm(20, 15).unwrap());
    }

    #[test]
    fn test_serde_as_string() {
        let time = DoseTime::from_hm(20, 0).unwrap();
        assert_eq!(serde_json::to_string(&time).unwrap(), "\"20:00\"");
        let back: DoseTime = serde_json::from_str("\"20:00\"").unwrap();
        assert_eq!(back, time);
        assert!(serde_json::from_str::<DoseTime>("\"later\"").is_err());
    }
}
