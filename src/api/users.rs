//! User management endpoints (narrator only).

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{CreateUserRequest, User, UserResponse};
use crate::policy::{self, Identity};
use crate::AppState;

use super::auth;
use super::error::ApiError;
use super::validation;

/// Create a player or narrator account
///
/// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    user: Identity,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    policy::require_admin(&user)?;

    let Json(req) = payload?;
    let (username, password) = match (req.username, req.password) {
        (Some(u), Some(p)) if !p.is_empty() => (u, p),
        _ => return Err(ApiError::validation("Username and password are required")),
    };

    let username = auth::normalize_username(&username);
    validation::validate_username(&username).map_err(ApiError::validation)?;

    let password_hash = auth::hash_password(&password)
        .map_err(|_| ApiError::internal("Failed to hash password"))?;

    let now = chrono::Utc::now().to_rfc3339();
    let new_user = User {
        id: Uuid::new_v4().to_string(),
        username,
        password_hash,
        role: req.role.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    // a duplicate username trips the unique constraint and maps to 409
    sqlx::query(
        "INSERT INTO users (id, username, password_hash, role, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new_user.id)
    .bind(&new_user.username)
    .bind(&new_user.password_hash)
    .bind(&new_user.role)
    .bind(&new_user.created_at)
    .bind(&new_user.updated_at)
    .execute(&state.db)
    .await?;

    info!(username = %new_user.username, role = %new_user.role, "User created");

    Ok((StatusCode::CREATED, Json(new_user.into())))
}

/// List accounts, hashes excluded (narrator only)
///
/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: Identity,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    policy::require_admin(&user)?;

    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY username")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
