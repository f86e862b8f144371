//! Story events embedded in a location.
//!
//! Events live inside their parent location's `events` JSON column; every
//! mutation here is a single-row UPDATE of the parent, so the whole list
//! changes atomically. Concurrent edits are last-write-wins at the row level.
//!
//! Check ordering is observable and deliberate: the admin gate runs first,
//! then location existence, then event existence, then authorship.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{serialize_events, CreateEventRequest, LocationRow, StoryEvent, UpdateEventRequest};
use crate::policy::{self, Identity};
use crate::{AppState, DbPool};

use super::error::ApiError;
use super::validation;
use super::Ack;

async fn fetch_location(db: &DbPool, id: &str) -> Result<LocationRow, ApiError> {
    let row: Option<LocationRow> = sqlx::query_as("SELECT * FROM locations WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;
    row.ok_or_else(|| ApiError::not_found("Location not found"))
}

async fn write_events(
    db: &DbPool,
    location_id: &str,
    events: &[StoryEvent],
    now: &str,
) -> Result<(), ApiError> {
    sqlx::query("UPDATE locations SET events = ?, updated_at = ? WHERE id = ?")
        .bind(serialize_events(events))
        .bind(now)
        .bind(location_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Append an event to a location's timeline (narrator only)
///
/// POST /api/locations/:id/events
pub async fn add_event(
    State(state): State<Arc<AppState>>,
    user: Identity,
    Path(location_id): Path<String>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoryEvent>), ApiError> {
    policy::require_admin(&user)?;

    let Json(req) = payload?;
    let content = req
        .content
        .ok_or_else(|| ApiError::validation("Content is required"))?;
    validation::validate_content(&content).map_err(ApiError::validation)?;

    let row = fetch_location(&state.db, &location_id).await?;
    let mut events = row.get_events();

    let now = chrono::Utc::now().to_rfc3339();
    let event = StoryEvent {
        id: Uuid::new_v4().to_string(),
        content,
        created_by: user.user_id.clone(),
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    events.push(event.clone());

    write_events(&state.db, &location_id, &events, &now).await?;

    info!(location_id = %location_id, event_id = %event.id, "Event added");

    Ok((StatusCode::CREATED, Json(event)))
}

/// Edit an event (narrator only, and only the author)
///
/// PUT /api/locations/:id/events/:event_id
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    user: Identity,
    Path((location_id, event_id)): Path<(String, String)>,
    payload: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> Result<Json<StoryEvent>, ApiError> {
    policy::require_admin(&user)?;

    let Json(req) = payload?;
    let content = req
        .content
        .ok_or_else(|| ApiError::validation("Content is required"))?;
    validation::validate_content(&content).map_err(ApiError::validation)?;

    let row = fetch_location(&state.db, &location_id).await?;
    let mut events = row.get_events();
    let idx = events
        .iter()
        .position(|e| e.id == event_id)
        .ok_or_else(|| ApiError::not_found("Event not found"))?;

    policy::require_author(&user, &events[idx].created_by)?;

    let now = chrono::Utc::now().to_rfc3339();
    events[idx].content = content;
    events[idx].updated_at = now.clone();
    let event = events[idx].clone();

    write_events(&state.db, &location_id, &events, &now).await?;

    Ok(Json(event))
}

/// Remove an event (narrator only, and only the author)
///
/// DELETE /api/locations/:id/events/:event_id
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    user: Identity,
    Path((location_id, event_id)): Path<(String, String)>,
) -> Result<Json<Ack>, ApiError> {
    policy::require_admin(&user)?;

    let row = fetch_location(&state.db, &location_id).await?;
    let mut events = row.get_events();
    let idx = events
        .iter()
        .position(|e| e.id == event_id)
        .ok_or_else(|| ApiError::not_found("Event not found"))?;

    policy::require_author(&user, &events[idx].created_by)?;

    events.remove(idx);
    let now = chrono::Utc::now().to_rfc3339();
    write_events(&state.db, &location_id, &events, &now).await?;

    info!(location_id = %location_id, event_id = %event_id, "Event deleted");

    Ok(Json(Ack { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testutil::{admin_identity, player_identity, second_admin_identity, test_state};
    use axum::http::StatusCode;

    async fn seed_location(state: &Arc<AppState>) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO locations (id, name, lat, lng, created_at, updated_at) \
             VALUES (?, 'Cafe del Boulevard', -33.12, -64.34, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(&id)
        .execute(&state.db)
        .await
        .unwrap();
        id
    }

    fn content(text: &str) -> Result<Json<CreateEventRequest>, JsonRejection> {
        Ok(Json(CreateEventRequest {
            content: Some(text.to_string()),
        }))
    }

    #[tokio::test]
    async fn test_role_gate_precedes_existence() {
        let state = test_state().await;
        // nonexistent everything, but the player still just gets Forbidden
        let err = update_event(
            State(state),
            player_identity("p1"),
            Path(("ghost-loc".to_string(), "ghost-ev".to_string())),
            Ok(Json(UpdateEventRequest {
                content: Some("x".to_string()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_add_then_read_back_through_parent() {
        let state = test_state().await;
        let location_id = seed_location(&state).await;

        let (status, Json(event)) = add_event(
            State(state.clone()),
            admin_identity(),
            Path(location_id.clone()),
            content("The clocks stopped at midnight"),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let row = fetch_location(&state.db, &location_id).await.unwrap();
        assert_eq!(row.get_events(), vec![event]);
    }

    #[tokio::test]
    async fn test_add_to_missing_location_is_404() {
        let state = test_state().await;
        let err = add_event(
            State(state),
            admin_identity(),
            Path("ghost-loc".to_string()),
            content("unseen"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_existence_before_ownership() {
        let state = test_state().await;
        let location_id = seed_location(&state).await;
        let (_, Json(event)) = add_event(
            State(state.clone()),
            admin_identity(),
            Path(location_id.clone()),
            content("First telling"),
        )
        .await
        .unwrap();

        // a second narrator: missing event id reads as NotFound...
        let err = update_event(
            State(state.clone()),
            second_admin_identity(),
            Path((location_id.clone(), "ghost-ev".to_string())),
            Ok(Json(UpdateEventRequest {
                content: Some("x".to_string()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        // ...but an existing event by someone else reads as Forbidden
        let err = update_event(
            State(state.clone()),
            second_admin_identity(),
            Path((location_id.clone(), event.id.clone())),
            Ok(Json(UpdateEventRequest {
                content: Some("Rewritten".to_string()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        // the author may edit
        let Json(updated) = update_event(
            State(state),
            admin_identity(),
            Path((location_id, event.id)),
            Ok(Json(UpdateEventRequest {
                content: Some("Second telling".to_string()),
            })),
        )
        .await
        .unwrap();
        assert_eq!(updated.content, "Second telling");
    }

    #[tokio::test]
    async fn test_delete_event_is_author_scoped() {
        let state = test_state().await;
        let location_id = seed_location(&state).await;
        let (_, Json(event)) = add_event(
            State(state.clone()),
            admin_identity(),
            Path(location_id.clone()),
            content("Ephemeral"),
        )
        .await
        .unwrap();

        let err = delete_event(
            State(state.clone()),
            second_admin_identity(),
            Path((location_id.clone(), event.id.clone())),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let Json(ack) = delete_event(
            State(state.clone()),
            admin_identity(),
            Path((location_id.clone(), event.id)),
        )
        .await
        .unwrap();
        assert!(ack.ok);

        let row = fetch_location(&state.db, &location_id).await.unwrap();
        assert!(row.get_events().is_empty());
    }
}
