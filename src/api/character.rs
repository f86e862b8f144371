//! Character sheet API endpoints.
//!
//! Each user owns at most one sheet. The first read creates it lazily; the
//! insert-if-absent is atomic, so concurrent first reads converge on a
//! single row through the unique `user_id` constraint.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    Abilities, Advantages, Attributes, CharacterSheetResponse, CharacterSheetRow,
    CharacterSheetWithUser, CharacterSheetWithUserRow, DbPool, HealthTrack, Spheres,
    UpdateCharacterSheetRequest,
};
use crate::policy::{self, Identity};
use crate::AppState;

use super::error::ApiError;
use super::validation;

async fn get_or_create_sheet(db: &DbPool, user_id: &str) -> Result<CharacterSheetRow, ApiError> {
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO character_sheets
            (id, user_id, name, player, chronicle, nature, demeanor, concept,
             attributes, abilities, spheres, advantages, health, experience,
             created_at, updated_at)
        VALUES (?, ?, '', '', '', '', '', '', ?, ?, ?, ?, ?, 0, ?, ?)
        ON CONFLICT(user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(serde_json::to_string(&Attributes::default())?)
    .bind(serde_json::to_string(&Abilities::default())?)
    .bind(serde_json::to_string(&Spheres::default())?)
    .bind(serde_json::to_string(&Advantages::default())?)
    .bind(serde_json::to_string(&HealthTrack::default())?)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    let row: CharacterSheetRow = sqlx::query_as("SELECT * FROM character_sheets WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// The caller's own sheet, created on first read
///
/// GET /api/character/me
pub async fn my_sheet(
    State(state): State<Arc<AppState>>,
    user: Identity,
) -> Result<Json<CharacterSheetResponse>, ApiError> {
    let row = get_or_create_sheet(&state.db, &user.user_id).await?;
    Ok(Json(row.into()))
}

/// Create or update the caller's sheet. Provided top-level keys replace the
/// stored values wholesale; absent keys are left alone.
///
/// POST /api/character
pub async fn upsert_sheet(
    State(state): State<Arc<AppState>>,
    user: Identity,
    payload: Result<Json<UpdateCharacterSheetRequest>, JsonRejection>,
) -> Result<Json<CharacterSheetResponse>, ApiError> {
    let Json(req) = payload?;

    if let Some(ref spheres) = req.spheres {
        validation::validate_spheres(spheres).map_err(ApiError::validation)?;
    }
    if let Some(experience) = req.experience {
        if experience < 0 {
            return Err(ApiError::validation("Experience cannot be negative"));
        }
    }

    let mut row = get_or_create_sheet(&state.db, &user.user_id).await?;

    if let Some(v) = req.name {
        row.name = v;
    }
    if let Some(v) = req.player {
        row.player = v;
    }
    if let Some(v) = req.chronicle {
        row.chronicle = v;
    }
    if let Some(v) = req.nature {
        row.nature = v;
    }
    if let Some(v) = req.demeanor {
        row.demeanor = v;
    }
    if let Some(v) = req.concept {
        row.concept = v;
    }
    if let Some(v) = req.attributes {
        row.attributes = serde_json::to_string(&v)?;
    }
    if let Some(v) = req.abilities {
        row.abilities = serde_json::to_string(&v)?;
    }
    if let Some(v) = req.spheres {
        row.spheres = serde_json::to_string(&v)?;
    }
    if let Some(v) = req.advantages {
        row.advantages = serde_json::to_string(&v)?;
    }
    if let Some(v) = req.health {
        row.health = serde_json::to_string(&v)?;
    }
    if let Some(v) = req.experience {
        row.experience = v;
    }
    row.updated_at = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE character_sheets
        SET name = ?, player = ?, chronicle = ?, nature = ?, demeanor = ?,
            concept = ?, attributes = ?, abilities = ?, spheres = ?,
            advantages = ?, health = ?, experience = ?, updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(&row.name)
    .bind(&row.player)
    .bind(&row.chronicle)
    .bind(&row.nature)
    .bind(&row.demeanor)
    .bind(&row.concept)
    .bind(&row.attributes)
    .bind(&row.abilities)
    .bind(&row.spheres)
    .bind(&row.advantages)
    .bind(&row.health)
    .bind(row.experience)
    .bind(&row.updated_at)
    .bind(&row.user_id)
    .execute(&state.db)
    .await?;

    Ok(Json(row.into()))
}

/// Every sheet with its owner's username (narrator only)
///
/// GET /api/character/all
pub async fn list_sheets(
    State(state): State<Arc<AppState>>,
    user: Identity,
) -> Result<Json<Vec<CharacterSheetWithUser>>, ApiError> {
    policy::require_admin(&user)?;

    let rows: Vec<CharacterSheetWithUserRow> = sqlx::query_as(
        "SELECT cs.*, u.username FROM character_sheets cs \
         JOIN users u ON u.id = cs.user_id ORDER BY u.username",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows.into_iter().map(CharacterSheetWithUser::from).collect()))
}
