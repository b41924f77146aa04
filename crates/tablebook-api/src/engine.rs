//! Reservation assignment engine.
//!
//! Binds reservations to tables and keeps each table's availability flag
//! in step with the reservations holding it. Every operation runs in one
//! store transaction, so the reservation write and the table write land
//! together or not at all, and two concurrent bookings cannot both claim
//! the same table.

use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{info, warn};

use tablebook_db::Database;
use tablebook_db::models::{NewReservation, ReservationChanges};
use tablebook_db::queries;
use tablebook_types::api::{CreateReservationRequest, UpdateReservationRequest};
use tablebook_types::schedule::parse_date;
use tablebook_types::{Reservation, ReservationStatus, TimeOfDay};

use crate::error::{AppError, AppResult};

/// A validated booking request.
#[derive(Debug, Clone)]
pub struct Booking {
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub people: i64,
    pub user_id: i64,
}

impl TryFrom<CreateReservationRequest> for Booking {
    type Error = AppError;

    fn try_from(req: CreateReservationRequest) -> AppResult<Self> {
        let missing = || {
            AppError::Validation("Missing required fields: date, time, people, userId".into())
        };

        let date = req.date.filter(|d| !d.trim().is_empty()).ok_or_else(missing)?;
        let time = req.time.filter(|t| !t.trim().is_empty()).ok_or_else(missing)?;
        let people = req.people.ok_or_else(missing)?;
        let user_id = req.user_id.ok_or_else(missing)?;

        Ok(Self {
            date: parse_slot_date(&date)?,
            time: parse_slot_time(&time)?,
            people: validate_people(people)?,
            user_id,
        })
    }
}

/// A validated partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ReservationUpdate {
    pub date: Option<NaiveDate>,
    pub time: Option<TimeOfDay>,
    pub people: Option<i64>,
    pub status: Option<ReservationStatus>,
}

impl TryFrom<UpdateReservationRequest> for ReservationUpdate {
    type Error = AppError;

    fn try_from(req: UpdateReservationRequest) -> AppResult<Self> {
        Ok(Self {
            date: req.date.as_deref().map(parse_slot_date).transpose()?,
            time: req.time.as_deref().map(parse_slot_time).transpose()?,
            people: req.people.map(validate_people).transpose()?,
            status: req
                .status
                .as_deref()
                .map(|s| {
                    s.parse::<ReservationStatus>()
                        .map_err(|e| AppError::Validation(capitalize(&e.to_string())))
                })
                .transpose()?,
        })
    }
}

impl ReservationUpdate {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none() && self.people.is_none() && self.status.is_none()
    }
}

pub struct ReservationEngine {
    db: Arc<Database>,
}

impl ReservationEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Books the first available table that seats the party and marks it
    /// unavailable.
    pub fn create(&self, booking: &Booking) -> AppResult<Reservation> {
        let date = format_date(booking.date);
        let time = booking.time.to_string();

        let reservation = self.db.transaction(|tx| -> AppResult<Reservation> {
            if queries::get_user(tx, booking.user_id)?.is_none() {
                return Err(AppError::Validation(format!(
                    "User {} does not exist",
                    booking.user_id
                )));
            }

            let table = queries::find_available_table(tx, booking.people)?.ok_or_else(|| {
                warn!(people = booking.people, "No table available");
                AppError::NoTableAvailable
            })?;

            if let Some(existing) = queries::find_conflict(tx, table.id, &date, &time, None)? {
                warn!(table_id = table.id, existing, %date, %time, "Table already reserved");
                return Err(AppError::TableConflict);
            }

            let id = queries::insert_reservation(
                tx,
                &NewReservation {
                    date: &date,
                    time: &time,
                    people: booking.people,
                    status: ReservationStatus::Booked,
                    user_id: booking.user_id,
                    table_id: Some(table.id),
                },
            )?;

            if !queries::claim_table(tx, table.id)? {
                warn!(table_id = table.id, "Table claimed by a concurrent booking");
                return Err(AppError::TableConflict);
            }

            load(tx, id)
        })?;

        info!(
            reservation_id = reservation.id,
            table_id = ?reservation.table_id,
            %date,
            %time,
            "Reservation booked"
        );
        Ok(reservation)
    }

    /// Marks the reservation cancelled and frees its table.
    pub fn cancel(&self, id: i64) -> AppResult<Reservation> {
        let reservation = self.db.transaction(|tx| -> AppResult<Reservation> {
            let current = queries::get_reservation(tx, id)?.ok_or_else(reservation_not_found)?;

            queries::set_reservation_status(tx, id, ReservationStatus::Cancelled)?;
            if let Some(table_id) = current.table_id {
                queries::release_table(tx, table_id)?;
            }

            load(tx, id)
        })?;

        info!(reservation_id = id, table_id = ?reservation.table_id, "Reservation cancelled");
        Ok(reservation)
    }

    /// Removes the reservation and frees its table.
    pub fn delete(&self, id: i64) -> AppResult<()> {
        let table_id = self.db.transaction(|tx| -> AppResult<Option<i64>> {
            let current = queries::get_reservation(tx, id)?.ok_or_else(reservation_not_found)?;

            queries::delete_reservation(tx, id)?;
            if let Some(table_id) = current.table_id {
                queries::release_table(tx, table_id)?;
            }

            Ok(current.table_id)
        })?;

        info!(reservation_id = id, ?table_id, "Reservation deleted");
        Ok(())
    }

    /// Applies a partial update. Moving an active reservation re-checks the
    /// slot; leaving or re-entering an active status frees or re-claims the
    /// table.
    pub fn update(&self, id: i64, update: &ReservationUpdate) -> AppResult<Reservation> {
        self.db.transaction(|tx| -> AppResult<Reservation> {
            let current = queries::get_reservation(tx, id)?.ok_or_else(reservation_not_found)?;
            if update.is_empty() {
                return load(tx, id);
            }

            let current_status = current.status()?;
            let status = update.status.unwrap_or(current_status);
            let date = update.date.map(format_date).unwrap_or_else(|| current.date.clone());
            let time = update.time.map(|t| t.to_string()).unwrap_or_else(|| current.time.clone());

            if let Some(table_id) = current.table_id {
                if let Some(people) = update.people {
                    let table = queries::get_table(tx, table_id)?;
                    if table.is_some_and(|t| people > t.capacity) {
                        return Err(AppError::Validation(
                            "Party size exceeds table capacity".into(),
                        ));
                    }
                }

                let moved = date != current.date || time != current.time;
                let reactivated = status.is_active() && !current_status.is_active();
                if status.is_active()
                    && (moved || reactivated)
                    && queries::find_conflict(tx, table_id, &date, &time, Some(id))?.is_some()
                {
                    return Err(AppError::TableConflict);
                }

                match (current_status.is_active(), status.is_active()) {
                    (true, false) => queries::release_table(tx, table_id)?,
                    (false, true) => {
                        if !queries::claim_table(tx, table_id)? {
                            return Err(AppError::TableConflict);
                        }
                    }
                    _ => {}
                }
            }

            queries::update_reservation(
                tx,
                id,
                &ReservationChanges {
                    date: update.date.map(format_date),
                    time: update.time.map(|t| t.to_string()),
                    people: update.people,
                    status: update.status,
                },
            )?;

            info!(reservation_id = id, %status, "Reservation updated");
            load(tx, id)
        })
    }
}

fn load(conn: &Connection, id: i64) -> AppResult<Reservation> {
    let detail = queries::get_reservation_detail(conn, id)?.ok_or_else(reservation_not_found)?;
    Ok(detail.into_reservation()?)
}

fn reservation_not_found() -> AppError {
    AppError::NotFound("Reservation not found".into())
}

fn parse_slot_date(raw: &str) -> AppResult<NaiveDate> {
    parse_date(raw).map_err(|e| AppError::Validation(capitalize(&e.to_string())))
}

fn parse_slot_time(raw: &str) -> AppResult<TimeOfDay> {
    raw.parse::<TimeOfDay>()
        .map_err(|e| AppError::Validation(capitalize(&e.to_string())))
}

fn validate_people(people: i64) -> AppResult<i64> {
    if people < 1 {
        return Err(AppError::Validation("Party size must be a positive number".into()));
    }
    Ok(people)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
