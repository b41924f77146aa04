use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use tablebook_types::Reservation;
use tablebook_types::api::{CreateReservationRequest, UpdateReservationRequest};

use crate::AppState;
use crate::engine::{Booking, ReservationUpdate};
use crate::error::{AppError, AppResult, blocking};

/// POST /reservations
pub async fn create_reservation(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateReservationRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    // Shape checks happen before any store access.
    let booking = Booking::try_from(req)?;
    let reservation = blocking(move || state.engine.create(&booking)).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /reservations
pub async fn list_reservations(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let reservations = blocking(move || {
        state
            .db
            .list_reservations()?
            .into_iter()
            .map(|row| row.into_reservation().map_err(AppError::from))
            .collect::<AppResult<Vec<Reservation>>>()
    })
    .await?;
    Ok(Json(reservations))
}

/// GET /reservations/{id}
pub async fn get_reservation(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<impl IntoResponse> {
    let reservation = blocking(move || {
        let row = state
            .db
            .get_reservation(id)?
            .ok_or_else(|| AppError::NotFound("Reservation not found".into()))?;
        Ok(row.into_reservation()?)
    })
    .await?;
    Ok(Json(reservation))
}

/// PUT /reservations/{id}
pub async fn update_reservation(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateReservationRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    let update = ReservationUpdate::try_from(req)?;
    let reservation = blocking(move || state.engine.update(id, &update)).await?;
    Ok(Json(reservation))
}

/// PUT /reservations/{id}/cancel
pub async fn cancel_reservation(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<impl IntoResponse> {
    let reservation = blocking(move || state.engine.cancel(id)).await?;
    Ok(Json(reservation))
}

/// DELETE /reservations/{id}
pub async fn delete_reservation(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<impl IntoResponse> {
    blocking(move || state.engine.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
