//! Calendar date and time-of-day parsing for reservation slots.
//!
//! Times are kept as minutes since midnight so that `"7:00 PM"` and
//! `"19:00"` name the same slot. They travel over the wire as `HH:MM`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid time '{0}'")]
    InvalidTime(String),
    #[error("invalid date '{0}'")]
    InvalidDate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.minutes() / 60
    }

    pub fn minute(self) -> u16 {
        self.minutes() % 60
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[derive(Clone, Copy)]
enum Meridiem {
    Am,
    Pm,
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    /// Accepts `H:MM`, `HH:MM`, `HH:MM:SS` and 12-hour forms such as
    /// `7:00 PM`, `7pm` or `12:30am`. Seconds are dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());

        let lowered = s.trim().to_ascii_lowercase();
        let (body, meridiem) = if let Some(rest) = lowered.strip_suffix("am") {
            (rest.trim_end(), Some(Meridiem::Am))
        } else if let Some(rest) = lowered.strip_suffix("pm") {
            (rest.trim_end(), Some(Meridiem::Pm))
        } else {
            (lowered.as_str(), None)
        };

        let mut parts = body.split(':');
        let hour = parts.next().and_then(|p| parse_field(p, 1)).ok_or_else(invalid)?;
        let minute = match parts.next() {
            Some(p) => parse_field(p, 2).ok_or_else(invalid)?,
            // A bare hour is only unambiguous with an am/pm suffix.
            None if meridiem.is_some() => 0,
            None => return Err(invalid()),
        };
        if let Some(p) = parts.next() {
            let second = parse_field(p, 2).ok_or_else(invalid)?;
            if second >= 60 || meridiem.is_some() {
                return Err(invalid());
            }
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        let hour = match meridiem {
            Some(_) if !(1..=12).contains(&hour) => return Err(invalid()),
            Some(Meridiem::Am) => hour % 12,
            Some(Meridiem::Pm) => hour % 12 + 12,
            None => hour,
        };

        TimeOfDay::from_hm(hour, minute).ok_or_else(invalid)
    }
}

/// Parses one or two ASCII digits; `min_len` rejects e.g. `19:5`.
fn parse_field(part: &str, min_len: usize) -> Option<u16> {
    if part.len() < min_len || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses a calendar date. `YYYY-MM-DD` is canonical; an RFC 3339
/// timestamp is accepted and truncated to its date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ScheduleError> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
        .map_err(|_| ScheduleError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn twenty_four_hour_forms() {
        assert_eq!(t("19:00").minutes(), 19 * 60);
        assert_eq!(t("9:05").to_string(), "09:05");
        assert_eq!(t("00:00").minutes(), 0);
        assert_eq!(t("23:59:59").to_string(), "23:59");
    }

    #[test]
    fn twelve_hour_forms_match_their_24h_equivalents() {
        assert_eq!(t("7:00 PM"), t("19:00"));
        assert_eq!(t("7pm"), t("19:00"));
        assert_eq!(t("12:30am"), t("00:30"));
        assert_eq!(t("12 PM"), t("12:00"));
        assert_eq!(t("11:15 am"), t("11:15"));
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in [
            "", "19", "24:00", "7:60", "19:5", "13pm", "0am", "7:00:00 pm", "7.30", "1:2:3:4",
            "ab:cd",
        ] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn serializes_as_padded_string() {
        let json = serde_json::to_string(&t("8:30 pm")).unwrap();
        assert_eq!(json, "\"20:30\"");
        let back: TimeOfDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t("20:30"));
    }

    #[test]
    fn dates_accept_plain_and_rfc3339() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(parse_date("2025-06-15").unwrap(), expected);
        assert_eq!(parse_date("2025-06-15T19:00:00Z").unwrap(), expected);
        assert!(parse_date("15/06/2025").is_err());
        assert!(parse_date("2025-02-30").is_err());
    }
}
