//! Narrator notes about players. Admin-only throughout; edits and deletes
//! are reserved to the note's author, and the mutation statements stay
//! scoped to `(id, admin_id)` as a backstop for the fetch-then-write gap.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{AdminNote, AdminNoteWithAuthor, CreateNoteRequest, UpdateNoteRequest};
use crate::policy::{self, Identity};
use crate::AppState;

use super::error::ApiError;
use super::validation;
use super::Ack;

/// All notes about one player, with author usernames (narrator only)
///
/// GET /api/notes/:player_id
pub async fn list_notes_for_player(
    State(state): State<Arc<AppState>>,
    user: Identity,
    Path(player_id): Path<String>,
) -> Result<Json<Vec<AdminNoteWithAuthor>>, ApiError> {
    policy::require_admin(&user)?;

    let notes: Vec<AdminNoteWithAuthor> = sqlx::query_as(
        "SELECT n.id, n.player_id, n.admin_id, u.username AS admin_username, \
                n.content, n.created_at, n.updated_at \
         FROM admin_notes n JOIN users u ON u.id = n.admin_id \
         WHERE n.player_id = ? ORDER BY n.created_at DESC",
    )
    .bind(&player_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(notes))
}

/// Create a note about a player (narrator only)
///
/// POST /api/notes
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    user: Identity,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AdminNote>), ApiError> {
    policy::require_admin(&user)?;

    let Json(req) = payload?;
    let (player_id, content) = match (req.player_id, req.content) {
        (Some(p), Some(c)) => (p, c),
        _ => return Err(ApiError::validation("player_id and content are required")),
    };
    validation::validate_content(&content).map_err(ApiError::validation)?;

    let player: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
        .bind(&player_id)
        .fetch_optional(&state.db)
        .await?;
    if player.is_none() {
        return Err(ApiError::not_found("Player not found"));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let note = AdminNote {
        id: Uuid::new_v4().to_string(),
        player_id,
        admin_id: user.user_id.clone(),
        content,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO admin_notes (id, player_id, admin_id, content, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&note.id)
    .bind(&note.player_id)
    .bind(&note.admin_id)
    .bind(&note.content)
    .bind(&note.created_at)
    .bind(&note.updated_at)
    .execute(&state.db)
    .await?;

    info!(note_id = %note.id, player_id = %note.player_id, "Note created");

    Ok((StatusCode::CREATED, Json(note)))
}

/// Edit a note (author only)
///
/// PUT /api/notes/:note_id
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    user: Identity,
    Path(id): Path<String>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Json<AdminNote>, ApiError> {
    policy::require_admin(&user)?;

    let Json(req) = payload?;
    let content = req
        .content
        .ok_or_else(|| ApiError::validation("Content is required"))?;
    validation::validate_content(&content).map_err(ApiError::validation)?;

    let note: Option<AdminNote> = sqlx::query_as("SELECT * FROM admin_notes WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    let mut note = note.ok_or_else(|| ApiError::not_found("Note not found"))?;

    policy::require_author(&user, &note.admin_id)?;

    note.content = content;
    note.updated_at = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "UPDATE admin_notes SET content = ?, updated_at = ? WHERE id = ? AND admin_id = ?",
    )
    .bind(&note.content)
    .bind(&note.updated_at)
    .bind(&note.id)
    .bind(&note.admin_id)
    .execute(&state.db)
    .await?;

    Ok(Json(note))
}

/// Delete a note (author only)
///
/// DELETE /api/notes/:note_id
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    user: Identity,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    policy::require_admin(&user)?;

    let note: Option<AdminNote> = sqlx::query_as("SELECT * FROM admin_notes WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    let note = note.ok_or_else(|| ApiError::not_found("Note not found"))?;

    policy::require_author(&user, &note.admin_id)?;

    sqlx::query("DELETE FROM admin_notes WHERE id = ? AND admin_id = ?")
        .bind(&note.id)
        .bind(&note.admin_id)
        .execute(&state.db)
        .await?;

    info!(note_id = %id, "Note deleted");

    Ok(Json(Ack { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testutil::{
        admin_identity, player_identity, second_admin_identity, seed_user, test_state,
    };
    use axum::http::StatusCode;

    async fn seed_note(state: &Arc<AppState>) -> AdminNote {
        seed_user(&state.db, "p1", "morgana", "player").await;
        seed_user(&state.db, "gm-1", "narrator", "admin").await;
        let (_, Json(note)) = create_note(
            State(state.clone()),
            admin_identity(),
            Ok(Json(CreateNoteRequest {
                player_id: Some("p1".to_string()),
                content: Some("Keeps asking about the bridge".to_string()),
            })),
        )
        .await
        .unwrap();
        note
    }

    #[tokio::test]
    async fn test_notes_are_admin_only() {
        let state = test_state().await;
        let err = list_notes_for_player(
            State(state.clone()),
            player_identity("p1"),
            Path("p1".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = create_note(
            State(state),
            player_identity("p1"),
            Ok(Json(CreateNoteRequest {
                player_id: Some("p1".to_string()),
                content: Some("self note".to_string()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_requires_existing_player() {
        let state = test_state().await;
        let err = create_note(
            State(state),
            admin_identity(),
            Ok(Json(CreateNoteRequest {
                player_id: Some("ghost".to_string()),
                content: Some("about nobody".to_string()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_joins_author_username() {
        let state = test_state().await;
        seed_note(&state).await;

        let Json(notes) = list_notes_for_player(
            State(state),
            admin_identity(),
            Path("p1".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].admin_username, "narrator");
    }

    #[tokio::test]
    async fn test_update_is_author_scoped_with_existence_first() {
        let state = test_state().await;
        let note = seed_note(&state).await;

        let err = update_note(
            State(state.clone()),
            second_admin_identity(),
            Path("ghost-note".to_string()),
            Ok(Json(UpdateNoteRequest {
                content: Some("x".to_string()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = update_note(
            State(state.clone()),
            second_admin_identity(),
            Path(note.id.clone()),
            Ok(Json(UpdateNoteRequest {
                content: Some("hijacked".to_string()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let Json(updated) = update_note(
            State(state),
            admin_identity(),
            Path(note.id),
            Ok(Json(UpdateNoteRequest {
                content: Some("Resolved at the bridge".to_string()),
            })),
        )
        .await
        .unwrap();
        assert_eq!(updated.content, "Resolved at the bridge");
    }

    #[tokio::test]
    async fn test_delete_is_author_scoped() {
        let state = test_state().await;
        let note = seed_note(&state).await;

        let err = delete_note(
            State(state.clone()),
            second_admin_identity(),
            Path(note.id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let Json(ack) = delete_note(State(state.clone()), admin_identity(), Path(note.id))
            .await
            .unwrap();
        assert!(ack.ok);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin_notes")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
