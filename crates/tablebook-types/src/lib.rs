pub mod api;
pub mod models;
pub mod schedule;

pub use models::{Reservation, ReservationStatus, Table, User};
pub use schedule::TimeOfDay;
