pub mod engine;
pub mod error;
pub mod password;
pub mod reservations;
pub mod tables;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
};

use tablebook_db::Database;

use crate::engine::ReservationEngine;
use crate::error::AppError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub engine: ReservationEngine,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            engine: ReservationEngine::new(db.clone()),
            db,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route(
            "/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/reservations/{id}",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route("/reservations/{id}/cancel", put(reservations::cancel_reservation))
        .route("/tables", get(tables::list_tables).post(tables::create_table))
        .route(
            "/tables/{id}",
            get(tables::get_table)
                .patch(tables::update_table)
                .delete(tables::delete_table),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .fallback(not_found)
        .with_state(state)
}

async fn root() -> &'static str {
    "Restaurant reservation API is running"
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".into())
}
