//! Locations API endpoints: the map's points of interest.
//!
//! Listing is the one public route and is visibility-filtered per caller.
//! Players may suggest locations (created hidden) and edit their own pending
//! suggestions; approval — the `visible` flag — stays with the narrator.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{
    serialize_string_list, CreateLocationRequest, LocationResponse, LocationRow,
    UpdateLocationRequest,
};
use crate::policy::{self, Identity, ListScope};
use crate::AppState;

use super::auth::MaybeIdentity;
use super::error::ApiError;
use super::validation;
use super::Ack;

/// List locations, filtered by what the caller may see
///
/// GET /api/locations
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
    MaybeIdentity(viewer): MaybeIdentity,
) -> Result<Json<Vec<LocationResponse>>, ApiError> {
    let rows: Vec<LocationRow> = match policy::location_list_scope(viewer.as_ref()) {
        ListScope::All => {
            sqlx::query_as("SELECT * FROM locations ORDER BY created_at DESC")
                .fetch_all(&state.db)
                .await?
        }
        ListScope::VisibleOrOwn(user_id) => {
            sqlx::query_as(
                "SELECT * FROM locations WHERE visible = 1 OR created_by = ? ORDER BY created_at DESC",
            )
            .bind(user_id)
            .fetch_all(&state.db)
            .await?
        }
        ListScope::VisibleOnly => {
            sqlx::query_as("SELECT * FROM locations WHERE visible = 1 ORDER BY created_at DESC")
                .fetch_all(&state.db)
                .await?
        }
    };

    Ok(Json(rows.into_iter().map(LocationResponse::from).collect()))
}

/// Create a location
///
/// POST /api/locations
pub async fn create_location(
    State(state): State<Arc<AppState>>,
    user: Identity,
    payload: Result<Json<CreateLocationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LocationResponse>), ApiError> {
    let Json(req) = payload?;

    let (name, lat, lng) = match (req.name, req.lat, req.lng) {
        (Some(name), Some(lat), Some(lng)) => (name, lat, lng),
        _ => return Err(ApiError::validation("name, lat and lng are required")),
    };
    validation::validate_location_name(&name).map_err(ApiError::validation)?;
    validation::validate_coordinates(lat, lng).map_err(ApiError::validation)?;

    let visible = policy::visibility_on_create(&user, req.visible);
    let now = chrono::Utc::now().to_rfc3339();

    let row = LocationRow {
        id: Uuid::new_v4().to_string(),
        name,
        description: req.description,
        narration: req.narration,
        sphere: req.sphere,
        address: req.address,
        lat,
        lng,
        kind: req.kind.unwrap_or_default().to_string(),
        visible,
        images: serialize_string_list(&req.images),
        events: None,
        created_by: Some(user.user_id.clone()),
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO locations
            (id, name, description, narration, sphere, address, lat, lng,
             kind, visible, images, events, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.id)
    .bind(&row.name)
    .bind(&row.description)
    .bind(&row.narration)
    .bind(&row.sphere)
    .bind(&row.address)
    .bind(row.lat)
    .bind(row.lng)
    .bind(&row.kind)
    .bind(row.visible)
    .bind(&row.images)
    .bind(&row.events)
    .bind(&row.created_by)
    .bind(&row.created_at)
    .bind(&row.updated_at)
    .execute(&state.db)
    .await?;

    info!(location = %row.name, by = %user.username, visible, "Location created");

    Ok((StatusCode::CREATED, Json(row.into())))
}

/// Update a location (owner or narrator)
///
/// PUT /api/locations/:id
pub async fn update_location(
    State(state): State<Arc<AppState>>,
    user: Identity,
    Path(id): Path<String>,
    payload: Result<Json<UpdateLocationRequest>, JsonRejection>,
) -> Result<Json<LocationResponse>, ApiError> {
    let Json(req) = payload?;

    if let Some(ref name) = req.name {
        validation::validate_location_name(name).map_err(ApiError::validation)?;
    }

    let row: Option<LocationRow> = sqlx::query_as("SELECT * FROM locations WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    let mut row = row.ok_or_else(|| ApiError::not_found("Location not found"))?;

    if !policy::can_update_location(&user, row.created_by.as_deref()) {
        return Err(ApiError::forbidden("Forbidden"));
    }
    if req.visible.is_some() && !policy::can_toggle_visibility(&user) {
        return Err(ApiError::forbidden("Only the narrator can change visibility"));
    }

    let lat = req.lat.unwrap_or(row.lat);
    let lng = req.lng.unwrap_or(row.lng);
    validation::validate_coordinates(lat, lng).map_err(ApiError::validation)?;

    if let Some(v) = req.name {
        row.name = v;
    }
    if let Some(v) = req.description {
        row.description = v;
    }
    if let Some(v) = req.narration {
        row.narration = v;
    }
    if let Some(v) = req.sphere {
        row.sphere = v;
    }
    if let Some(v) = req.address {
        row.address = v;
    }
    row.lat = lat;
    row.lng = lng;
    if let Some(kind) = req.kind {
        row.kind = kind.to_string();
    }
    if let Some(v) = req.visible {
        row.visible = v;
    }
    if let Some(list) = req.images {
        row.images = serialize_string_list(&list);
    }
    row.updated_at = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE locations
        SET name = ?, description = ?, narration = ?, sphere = ?, address = ?,
            lat = ?, lng = ?, kind = ?, visible = ?, images = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&row.name)
    .bind(&row.description)
    .bind(&row.narration)
    .bind(&row.sphere)
    .bind(&row.address)
    .bind(row.lat)
    .bind(row.lng)
    .bind(&row.kind)
    .bind(row.visible)
    .bind(&row.images)
    .bind(&row.updated_at)
    .bind(&row.id)
    .execute(&state.db)
    .await?;

    Ok(Json(row.into()))
}

/// Delete a location, discarding its embedded events (narrator only)
///
/// DELETE /api/locations/:id
pub async fn delete_location(
    State(state): State<Arc<AppState>>,
    user: Identity,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    policy::require_admin(&user)?;

    let result = sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Location not found"));
    }

    info!(location_id = %id, "Location deleted");

    Ok(Json(Ack { ok: true }))
}
