use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use tablebook_db::models::{TableChanges, TableRow};
use tablebook_types::Table;
use tablebook_types::api::{CreateTableRequest, UpdateTableRequest};

use crate::AppState;
use crate::error::{AppError, AppResult, blocking};

fn table_not_found() -> AppError {
    AppError::NotFound("Table not found".into())
}

fn validate_name(name: Option<String>) -> AppResult<String> {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("Invalid name".into()))
}

fn validate_capacity(capacity: Option<i64>) -> AppResult<i64> {
    capacity
        .filter(|c| *c >= 1)
        .ok_or_else(|| AppError::Validation("Invalid capacity".into()))
}

/// POST /tables
pub async fn create_table(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateTableRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    let name = validate_name(req.name)?;
    let capacity = validate_capacity(req.capacity)?;

    let table = blocking(move || Ok(state.db.create_table(&name, capacity)?.into_table())).await?;
    info!(table_id = table.id, capacity = table.capacity, "Table created");
    Ok((StatusCode::CREATED, Json(table)))
}

/// GET /tables
pub async fn list_tables(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let tables: Vec<Table> = blocking(move || {
        Ok(state
            .db
            .list_tables()?
            .into_iter()
            .map(TableRow::into_table)
            .collect())
    })
    .await?;
    Ok(Json(tables))
}

/// GET /tables/{id}
pub async fn get_table(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<impl IntoResponse> {
    let table = blocking(move || {
        let row = state.db.get_table(id)?.ok_or_else(table_not_found)?;
        Ok(row.into_table())
    })
    .await?;
    Ok(Json(table))
}

/// PATCH /tables/{id}
///
/// Setting `isAvailable` directly bypasses the reservation engine and can
/// leave the flag out of step with the table's reservations.
pub async fn update_table(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateTableRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    let changes = TableChanges {
        name: req.name.map(|n| validate_name(Some(n))).transpose()?,
        capacity: req.capacity.map(|c| validate_capacity(Some(c))).transpose()?,
        is_available: req.is_available,
    };
    if changes.is_empty() {
        return Err(AppError::Validation("No valid fields to update".into()));
    }

    let table = blocking(move || {
        let row = state.db.update_table(id, &changes)?.ok_or_else(table_not_found)?;
        Ok(row.into_table())
    })
    .await?;
    Ok(Json(table))
}

/// DELETE /tables/{id}
pub async fn delete_table(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<impl IntoResponse> {
    let deleted = blocking(move || Ok(state.db.delete_table(id)?)).await?;
    if !deleted {
        return Err(table_not_found());
    }
    info!(table_id = id, "Table deleted");
    Ok(StatusCode::NO_CONTENT)
}
