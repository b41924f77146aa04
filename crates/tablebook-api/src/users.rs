use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use tablebook_db::models::{UserChanges, UserRow};
use tablebook_types::User;
use tablebook_types::api::{CreateUserRequest, UpdateUserRequest};

use crate::AppState;
use crate::error::{AppError, AppResult, blocking};
use crate::password::hash_password;

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateUserRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    let (Some(username), Some(email), Some(password)) = (
        non_empty(req.username),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation("Missing required fields".into()));
    };
    let is_admin = req.is_admin.unwrap_or(false);

    // Hashing is CPU-bound, so it runs on the blocking pool with the insert.
    let user = blocking(move || {
        let password_hash = hash_password(&password)?;
        Ok(state
            .db
            .create_user(&username, &email, &password_hash, is_admin)?
            .into_user())
    })
    .await?;

    info!(user_id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let users: Vec<User> = blocking(move || {
        Ok(state
            .db
            .list_users()?
            .into_iter()
            .map(UserRow::into_user)
            .collect())
    })
    .await?;
    Ok(Json(users))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<impl IntoResponse> {
    let user = blocking(move || {
        let row = state.db.get_user(id)?.ok_or_else(user_not_found)?;
        Ok(row.into_user())
    })
    .await?;
    Ok(Json(user))
}

/// PATCH /users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateUserRequest>, AppError>,
) -> AppResult<impl IntoResponse> {
    let password = req.password.filter(|p| !p.is_empty());
    let mut changes = UserChanges {
        username: non_empty(req.username),
        email: non_empty(req.email),
        password_hash: None,
        is_admin: req.is_admin,
    };
    if changes.is_empty() && password.is_none() {
        return Err(AppError::Validation("No fields to update".into()));
    }

    let user = blocking(move || {
        if let Some(password) = password {
            changes.password_hash = Some(hash_password(&password)?);
        }
        let row = state.db.update_user(id, &changes)?.ok_or_else(user_not_found)?;
        Ok(row.into_user())
    })
    .await?;
    Ok(Json(user))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<impl IntoResponse> {
    let deleted = blocking(move || Ok(state.db.delete_user(id)?)).await?;
    if !deleted {
        return Err(user_not_found());
    }
    info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
