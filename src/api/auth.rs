//! Login, password hashing and the identity extractors.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    Json,
};
use std::sync::Arc;

use crate::db::{DbPool, LoginRequest, LoginResponse, User};
use crate::policy::Identity;
use crate::token;
use crate::AppState;

use super::error::ApiError;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Usernames are matched case-insensitively; storage and lookup both
/// normalize the same way.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Login endpoint
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;

    let (username, password) = match (req.username, req.password) {
        (Some(u), Some(p)) if !u.trim().is_empty() && !p.is_empty() => (u, p),
        _ => return Err(ApiError::validation("Username and password are required")),
    };

    let username = normalize_username(&username);

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(&username)
        .fetch_optional(&state.db)
        .await?;

    // Unknown user and wrong password fail identically, so the response
    // never confirms whether a username exists
    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = token::issue(
        state.config.jwt_secret(),
        &user.id,
        &user.username,
        user.role(),
    )
    .map_err(|_| ApiError::internal("Failed to issue token"))?;

    Ok(Json(LoginResponse { token }))
}

/// Ensure the default admin user exists. Runs once at startup; the
/// `ON CONFLICT DO NOTHING` insert plus the unique-username constraint make
/// it safe under concurrent cold starts.
pub async fn ensure_admin_user(db: &DbPool, username: &str, password: &str) -> anyhow::Result<()> {
    let username = normalize_username(username);
    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, username, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, 'admin', ?, ?)
        ON CONFLICT(username) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(&username)
    .bind(&password_hash)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!("Created default admin user \"{}\"", username);
    }

    Ok(())
}

/// Extract the bearer token from request headers
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Extractor for the authenticated caller. Verification is a pure signature
/// check against the process secret; the user row is not re-read.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing token"))?;
        token::verify(state.config.jwt_secret(), &token)
            .map_err(|_| ApiError::unauthorized("Invalid token"))
    }
}

/// Optional identity for the public location list: no header means an
/// anonymous caller, but a presented-and-invalid token is still rejected.
pub struct MaybeIdentity(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            None => Ok(MaybeIdentity(None)),
            Some(token) => token::verify(state.config.jwt_secret(), &token)
                .map(|identity| MaybeIdentity(Some(identity)))
                .map_err(|_| ApiError::unauthorized("Invalid token")),
        }
    }
}
