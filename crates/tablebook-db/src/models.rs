//! Database row types. These map directly to SQLite rows and are kept
//! distinct from the tablebook-types API models.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::warn;

use tablebook_types::schedule::parse_date;
use tablebook_types::{Reservation, ReservationStatus, Table, TimeOfDay, User};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct TableRow {
    pub id: i64,
    pub name: String,
    pub capacity: i64,
    pub is_available: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ReservationRow {
    pub id: i64,
    pub date: String,
    pub time: String,
    pub people: i64,
    pub status: String,
    pub user_id: i64,
    pub table_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// A reservation joined with its user and, when bound, its table.
pub struct ReservationDetailRow {
    pub reservation: ReservationRow,
    pub user: UserRow,
    pub table: Option<TableRow>,
}

pub struct NewReservation<'a> {
    pub date: &'a str,
    pub time: &'a str,
    pub people: i64,
    pub status: ReservationStatus,
    pub user_id: i64,
    pub table_id: Option<i64>,
}

#[derive(Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.is_admin.is_none()
    }
}

#[derive(Debug, Default)]
pub struct TableChanges {
    pub name: Option<String>,
    pub capacity: Option<i64>,
    pub is_available: Option<bool>,
}

impl TableChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.capacity.is_none() && self.is_available.is_none()
    }
}

#[derive(Debug, Default)]
pub struct ReservationChanges {
    pub date: Option<String>,
    pub time: Option<String>,
    pub people: Option<i64>,
    pub status: Option<ReservationStatus>,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            created_at: parse_timestamp(&self.created_at, "user", self.id),
            updated_at: parse_timestamp(&self.updated_at, "user", self.id),
            id: self.id,
            username: self.username,
            email: self.email,
            is_admin: self.is_admin,
        }
    }
}

impl TableRow {
    pub fn into_table(self) -> Table {
        Table {
            created_at: parse_timestamp(&self.created_at, "table", self.id),
            updated_at: parse_timestamp(&self.updated_at, "table", self.id),
            id: self.id,
            name: self.name,
            capacity: self.capacity,
            is_available: self.is_available,
        }
    }
}

impl ReservationRow {
    pub fn status(&self) -> Result<ReservationStatus> {
        self.status
            .parse()
            .with_context(|| format!("corrupt status on reservation {}", self.id))
    }
}

impl ReservationDetailRow {
    pub fn into_reservation(self) -> Result<Reservation> {
        let row = self.reservation;
        let status = row.status()?;
        let date = parse_date(&row.date)
            .with_context(|| format!("corrupt date on reservation {}", row.id))?;
        let time: TimeOfDay = row
            .time
            .parse()
            .with_context(|| format!("corrupt time on reservation {}", row.id))?;

        Ok(Reservation {
            id: row.id,
            date,
            time,
            people: row.people,
            status,
            user_id: row.user_id,
            table_id: row.table_id,
            created_at: parse_timestamp(&row.created_at, "reservation", row.id),
            updated_at: parse_timestamp(&row.updated_at, "reservation", row.id),
            user: self.user.into_user(),
            table: self.table.map(TableRow::into_table),
        })
    }
}

/// Current time in the format every `*_at` column is written with.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str, kind: &str, id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; treat it as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {} {}: {}", raw, kind, id, e);
            DateTime::default()
        })
}
