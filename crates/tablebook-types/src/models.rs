use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::TimeOfDay;

/// A registered user. The stored credential never leaves the DB layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: i64,
    pub name: String,
    pub capacity: i64,
    /// False while the table is bound to an active reservation.
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Booked,
    Seated,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub const ACTIVE: [ReservationStatus; 2] =
        [ReservationStatus::Booked, ReservationStatus::Seated];

    /// Active reservations hold their table and count towards conflicts.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Booked | Self::Seated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Seated => "seated",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reservation status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ReservationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "booked" => Ok(Self::Booked),
            "seated" => Ok(Self::Seated),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// A reservation as returned over the API, always carrying its user and
/// (when bound) its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i64,
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub people: i64,
    pub status: ReservationStatus,
    pub user_id: i64,
    pub table_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: User,
    pub table: Option<Table>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_booked_and_seated_are_active() {
        assert!(ReservationStatus::Booked.is_active());
        assert!(ReservationStatus::Seated.is_active());
        assert!(!ReservationStatus::Cancelled.is_active());
        assert!(!ReservationStatus::Completed.is_active());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Seated".parse::<ReservationStatus>(), Ok(ReservationStatus::Seated));
        assert_eq!(" cancelled ".parse::<ReservationStatus>(), Ok(ReservationStatus::Cancelled));
        assert!("waitlisted".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ReservationStatus::Booked).unwrap();
        assert_eq!(json, "\"booked\"");
    }
}
