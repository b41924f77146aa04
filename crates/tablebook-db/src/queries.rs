use crate::Database;
use crate::models::{
    NewReservation, ReservationChanges, ReservationDetailRow, ReservationRow, TableChanges,
    TableRow, UserChanges, UserRow, timestamp,
};
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use tablebook_types::ReservationStatus;

const USER_COLUMNS: &str = "id, username, email, password, is_admin, created_at, updated_at";
const TABLE_COLUMNS: &str = "id, name, capacity, is_available, created_at, updated_at";
const RESERVATION_COLUMNS: &str =
    "id, date, time, people, status, user_id, table_id, created_at, updated_at";

// Reservation columns at 0..9, user at 9..16, table at 16..22.
const RESERVATION_DETAIL_SELECT: &str =
    "SELECT r.id, r.date, r.time, r.people, r.status, r.user_id, r.table_id, r.created_at, r.updated_at,
            u.id, u.username, u.email, u.password, u.is_admin, u.created_at, u.updated_at,
            t.id, t.name, t.capacity, t.is_available, t.created_at, t.updated_at
     FROM reservations r
     JOIN users u ON u.id = r.user_id
     LEFT JOIN dining_tables t ON t.id = r.table_id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<UserRow> {
        self.with_conn(|conn| insert_user(conn, username, email, password_hash, is_admin))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| get_user(conn, id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(list_users)
    }

    pub fn update_user(&self, id: i64, changes: &UserChanges) -> Result<Option<UserRow>> {
        self.with_conn(|conn| update_user(conn, id, changes))
    }

    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| delete_row(conn, "users", id))
    }

    // -- Tables --

    pub fn create_table(&self, name: &str, capacity: i64) -> Result<TableRow> {
        self.with_conn(|conn| insert_table(conn, name, capacity))
    }

    pub fn get_table(&self, id: i64) -> Result<Option<TableRow>> {
        self.with_conn(|conn| get_table(conn, id))
    }

    pub fn list_tables(&self) -> Result<Vec<TableRow>> {
        self.with_conn(list_tables)
    }

    pub fn update_table(&self, id: i64, changes: &TableChanges) -> Result<Option<TableRow>> {
        self.with_conn(|conn| update_table(conn, id, changes))
    }

    pub fn delete_table(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| delete_row(conn, "dining_tables", id))
    }

    // -- Reservations --

    pub fn get_reservation(&self, id: i64) -> Result<Option<ReservationDetailRow>> {
        self.with_conn(|conn| get_reservation_detail(conn, id))
    }

    pub fn list_reservations(&self) -> Result<Vec<ReservationDetailRow>> {
        self.with_conn(list_reservation_details)
    }
}

// -- Users --

pub fn insert_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
    is_admin: bool,
) -> Result<UserRow> {
    let now = timestamp();
    conn.execute(
        "INSERT INTO users (username, email, password, is_admin, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![username, email, password_hash, is_admin, now],
    )?;
    Ok(UserRow {
        id: conn.last_insert_rowid(),
        username: username.to_string(),
        email: email.to_string(),
        password: password_hash.to_string(),
        is_admin,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], |row| user_from_row(row, 0)).optional()?)
}

pub fn list_users(conn: &Connection) -> Result<Vec<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| user_from_row(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns `None` when no user has `id`.
pub fn update_user(conn: &Connection, id: i64, changes: &UserChanges) -> Result<Option<UserRow>> {
    let mut sets = Vec::new();
    if let Some(username) = &changes.username {
        sets.push(("username", Value::Text(username.clone())));
    }
    if let Some(email) = &changes.email {
        sets.push(("email", Value::Text(email.clone())));
    }
    if let Some(hash) = &changes.password_hash {
        sets.push(("password", Value::Text(hash.clone())));
    }
    if let Some(is_admin) = changes.is_admin {
        sets.push(("is_admin", Value::Integer(is_admin.into())));
    }

    if !update_row(conn, "users", id, sets)? {
        return Ok(None);
    }
    get_user(conn, id)
}

// -- Tables --

pub fn insert_table(conn: &Connection, name: &str, capacity: i64) -> Result<TableRow> {
    let now = timestamp();
    conn.execute(
        "INSERT INTO dining_tables (name, capacity, is_available, created_at, updated_at)
         VALUES (?1, ?2, 1, ?3, ?3)",
        params![name, capacity, now],
    )?;
    Ok(TableRow {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        capacity,
        is_available: true,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn get_table(conn: &Connection, id: i64) -> Result<Option<TableRow>> {
    let sql = format!("SELECT {TABLE_COLUMNS} FROM dining_tables WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], |row| table_from_row(row, 0)).optional()?)
}

pub fn list_tables(conn: &Connection) -> Result<Vec<TableRow>> {
    let sql = format!("SELECT {TABLE_COLUMNS} FROM dining_tables ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| table_from_row(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns `None` when no table has `id`.
pub fn update_table(
    conn: &Connection,
    id: i64,
    changes: &TableChanges,
) -> Result<Option<TableRow>> {
    let mut sets = Vec::new();
    if let Some(name) = &changes.name {
        sets.push(("name", Value::Text(name.clone())));
    }
    if let Some(capacity) = changes.capacity {
        sets.push(("capacity", Value::Integer(capacity)));
    }
    if let Some(is_available) = changes.is_available {
        sets.push(("is_available", Value::Integer(is_available.into())));
    }

    if !update_row(conn, "dining_tables", id, sets)? {
        return Ok(None);
    }
    get_table(conn, id)
}

/// First available table seating at least `min_capacity`, in id order.
pub fn find_available_table(conn: &Connection, min_capacity: i64) -> Result<Option<TableRow>> {
    let sql = format!(
        "SELECT {TABLE_COLUMNS} FROM dining_tables
         WHERE capacity >= ?1 AND is_available = 1
         ORDER BY id
         LIMIT 1"
    );
    Ok(conn
        .query_row(&sql, [min_capacity], |row| table_from_row(row, 0))
        .optional()?)
}

/// Marks the table unavailable only if it is still available.
/// Returns false when another writer got there first.
pub fn claim_table(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE dining_tables SET is_available = 0, updated_at = ?2
         WHERE id = ?1 AND is_available = 1",
        params![id, timestamp()],
    )?;
    Ok(changed == 1)
}

pub fn release_table(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE dining_tables SET is_available = 1, updated_at = ?2 WHERE id = ?1",
        params![id, timestamp()],
    )?;
    Ok(())
}

// -- Reservations --

pub fn insert_reservation(conn: &Connection, new: &NewReservation<'_>) -> Result<i64> {
    let now = timestamp();
    conn.execute(
        "INSERT INTO reservations (date, time, people, status, user_id, table_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            new.date,
            new.time,
            new.people,
            new.status.as_str(),
            new.user_id,
            new.table_id,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_reservation(conn: &Connection, id: i64) -> Result<Option<ReservationRow>> {
    let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1");
    Ok(conn
        .query_row(&sql, [id], |row| reservation_from_row(row, 0))
        .optional()?)
}

pub fn get_reservation_detail(conn: &Connection, id: i64) -> Result<Option<ReservationDetailRow>> {
    let sql = format!("{RESERVATION_DETAIL_SELECT} WHERE r.id = ?1");
    Ok(conn.query_row(&sql, [id], detail_from_row).optional()?)
}

pub fn list_reservation_details(conn: &Connection) -> Result<Vec<ReservationDetailRow>> {
    let sql = format!("{RESERVATION_DETAIL_SELECT} ORDER BY r.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], detail_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Id of an active reservation holding `table_id` at the given slot,
/// ignoring `exclude` (the reservation being edited, if any).
pub fn find_conflict(
    conn: &Connection,
    table_id: i64,
    date: &str,
    time: &str,
    exclude: Option<i64>,
) -> Result<Option<i64>> {
    let [booked, seated] = ReservationStatus::ACTIVE.map(ReservationStatus::as_str);
    Ok(conn
        .query_row(
            "SELECT id FROM reservations
             WHERE table_id = ?1 AND date = ?2 AND time = ?3
               AND status IN (?4, ?5)
               AND (?6 IS NULL OR id != ?6)
             LIMIT 1",
            params![table_id, date, time, booked, seated, exclude],
            |row| row.get(0),
        )
        .optional()?)
}

/// Returns false when no reservation has `id`.
pub fn update_reservation(
    conn: &Connection,
    id: i64,
    changes: &ReservationChanges,
) -> Result<bool> {
    let mut sets = Vec::new();
    if let Some(date) = &changes.date {
        sets.push(("date", Value::Text(date.clone())));
    }
    if let Some(time) = &changes.time {
        sets.push(("time", Value::Text(time.clone())));
    }
    if let Some(people) = changes.people {
        sets.push(("people", Value::Integer(people)));
    }
    if let Some(status) = changes.status {
        sets.push(("status", Value::Text(status.as_str().to_string())));
    }
    update_row(conn, "reservations", id, sets)
}

pub fn set_reservation_status(
    conn: &Connection,
    id: i64,
    status: ReservationStatus,
) -> Result<bool> {
    let changes = ReservationChanges {
        status: Some(status),
        ..Default::default()
    };
    update_reservation(conn, id, &changes)
}

pub fn delete_reservation(conn: &Connection, id: i64) -> Result<bool> {
    delete_row(conn, "reservations", id)
}

// -- Helpers --

/// `UPDATE <table> SET ... , updated_at = now WHERE id = ?`, reporting
/// whether a row matched. `table` is always one of our own table names.
fn update_row(
    conn: &Connection,
    table: &str,
    id: i64,
    sets: Vec<(&'static str, Value)>,
) -> Result<bool> {
    let mut assignments: Vec<String> = sets
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
        .collect();
    assignments.push(format!("updated_at = ?{}", sets.len() + 1));

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        table,
        assignments.join(", "),
        sets.len() + 2
    );

    let mut values: Vec<Value> = sets.into_iter().map(|(_, value)| value).collect();
    values.push(Value::Text(timestamp()));
    values.push(Value::Integer(id));

    let changed = conn.execute(&sql, params_from_iter(values))?;
    Ok(changed > 0)
}

fn delete_row(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let changed = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), [id])?;
    Ok(changed > 0)
}

fn user_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(at)?,
        username: row.get(at + 1)?,
        email: row.get(at + 2)?,
        password: row.get(at + 3)?,
        is_admin: row.get(at + 4)?,
        created_at: row.get(at + 5)?,
        updated_at: row.get(at + 6)?,
    })
}

fn table_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<TableRow> {
    Ok(TableRow {
        id: row.get(at)?,
        name: row.get(at + 1)?,
        capacity: row.get(at + 2)?,
        is_available: row.get(at + 3)?,
        created_at: row.get(at + 4)?,
        updated_at: row.get(at + 5)?,
    })
}

fn reservation_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<ReservationRow> {
    Ok(ReservationRow {
        id: row.get(at)?,
        date: row.get(at + 1)?,
        time: row.get(at + 2)?,
        people: row.get(at + 3)?,
        status: row.get(at + 4)?,
        user_id: row.get(at + 5)?,
        table_id: row.get(at + 6)?,
        created_at: row.get(at + 7)?,
        updated_at: row.get(at + 8)?,
    })
}

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<ReservationDetailRow> {
    let table = match row.get::<_, Option<i64>>(16)? {
        Some(_) => Some(table_from_row(row, 16)?),
        None => None,
    };
    Ok(ReservationDetailRow {
        reservation: reservation_from_row(row, 0)?,
        user: user_from_row(row, 9)?,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn reserve(
        conn: &Connection,
        user_id: i64,
        table_id: i64,
        time: &str,
        status: ReservationStatus,
    ) -> i64 {
        insert_reservation(
            conn,
            &NewReservation {
                date: "2025-06-15",
                time,
                people: 2,
                status,
                user_id,
                table_id: Some(table_id),
            },
        )
        .unwrap()
    }

    #[test]
    fn available_table_is_first_by_id_with_enough_seats() {
        let db = db();
        db.create_table("Bar", 2).unwrap();
        let big = db.create_table("Booth", 6).unwrap();
        db.create_table("Terrace", 8).unwrap();

        let picked = db.with_conn(|c| find_available_table(c, 4)).unwrap().unwrap();
        assert_eq!(picked.id, big.id);

        db.with_conn(|c| claim_table(c, big.id)).unwrap();
        let picked = db.with_conn(|c| find_available_table(c, 4)).unwrap().unwrap();
        assert_eq!(picked.name, "Terrace");

        assert!(db.with_conn(|c| find_available_table(c, 9)).unwrap().is_none());
    }

    #[test]
    fn claim_only_succeeds_once() {
        let db = db();
        let table = db.create_table("Window", 4).unwrap();

        assert!(db.with_conn(|c| claim_table(c, table.id)).unwrap());
        assert!(!db.with_conn(|c| claim_table(c, table.id)).unwrap());

        db.with_conn(|c| release_table(c, table.id)).unwrap();
        assert!(db.get_table(table.id).unwrap().unwrap().is_available);
    }

    #[test]
    fn conflicts_only_count_active_reservations() {
        let db = db();
        let user = db.create_user("ana", "ana@example.com", "hash", false).unwrap();
        let table = db.create_table("Window", 4).unwrap();

        db.with_conn(|c| {
            reserve(c, user.id, table.id, "19:00", ReservationStatus::Cancelled);
            assert_eq!(find_conflict(c, table.id, "2025-06-15", "19:00", None)?, None);

            let seated = reserve(c, user.id, table.id, "19:00", ReservationStatus::Seated);
            assert_eq!(find_conflict(c, table.id, "2025-06-15", "19:00", None)?, Some(seated));
            assert_eq!(find_conflict(c, table.id, "2025-06-15", "19:00", Some(seated))?, None);
            assert_eq!(find_conflict(c, table.id, "2025-06-15", "20:00", None)?, None);
            assert_eq!(find_conflict(c, table.id, "2025-06-16", "19:00", None)?, None);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn update_reports_missing_rows() {
        let db = db();
        let changes = TableChanges {
            name: Some("Corner".into()),
            ..Default::default()
        };
        assert!(db.update_table(42, &changes).unwrap().is_none());

        let table = db.create_table("Window", 4).unwrap();
        let updated = db.update_table(table.id, &changes).unwrap().unwrap();
        assert_eq!(updated.name, "Corner");
        assert_eq!(updated.capacity, 4);
    }

    #[test]
    fn user_update_touches_only_given_fields() {
        let db = db();
        let user = db.create_user("ana", "ana@example.com", "hash", false).unwrap();
        let changes = UserChanges {
            is_admin: Some(true),
            ..Default::default()
        };
        let updated = db.update_user(user.id, &changes).unwrap().unwrap();
        assert!(updated.is_admin);
        assert_eq!(updated.email, "ana@example.com");
        assert_eq!(updated.password, "hash");
    }

    #[test]
    fn duplicate_email_is_rejected_by_the_store() {
        let db = db();
        db.create_user("ana", "ana@example.com", "hash", false).unwrap();
        assert!(db.create_user("ana2", "ana@example.com", "hash", false).is_err());
    }

    #[test]
    fn deleting_a_table_unbinds_its_reservations() {
        let db = db();
        let user = db.create_user("ana", "ana@example.com", "hash", false).unwrap();
        let table = db.create_table("Window", 4).unwrap();
        let id = db
            .with_conn(|c| Ok(reserve(c, user.id, table.id, "19:00", ReservationStatus::Booked)))
            .unwrap();

        assert!(db.delete_table(table.id).unwrap());

        let detail = db.get_reservation(id).unwrap().unwrap();
        assert_eq!(detail.reservation.table_id, None);
        assert!(detail.table.is_none());
    }

    #[test]
    fn deleting_a_user_with_reservations_fails() {
        let db = db();
        let user = db.create_user("ana", "ana@example.com", "hash", false).unwrap();
        let table = db.create_table("Window", 4).unwrap();
        db.with_conn(|c| Ok(reserve(c, user.id, table.id, "19:00", ReservationStatus::Booked)))
            .unwrap();

        assert!(db.delete_user(user.id).is_err());
        assert!(!db.delete_user(999).unwrap());
    }

    #[test]
    fn reservation_details_join_user_and_table() {
        let db = db();
        let user = db.create_user("ana", "ana@example.com", "hash", false).unwrap();
        let table = db.create_table("Window", 4).unwrap();
        db.with_conn(|c| Ok(reserve(c, user.id, table.id, "19:00", ReservationStatus::Booked)))
            .unwrap();

        let all = db.list_reservations().unwrap();
        assert_eq!(all.len(), 1);
        let reservation = all.into_iter().next().unwrap().into_reservation().unwrap();
        assert_eq!(reservation.user.username, "ana");
        assert_eq!(reservation.table.unwrap().name, "Window");
        assert_eq!(reservation.time.to_string(), "19:00");
    }
}
