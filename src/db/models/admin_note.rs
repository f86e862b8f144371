//! Narrator notes about players.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminNote {
    pub id: String,
    pub player_id: String,
    pub admin_id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Note joined with its author's username, for list responses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminNoteWithAuthor {
    pub id: String,
    pub player_id: String,
    pub admin_id: String,
    pub admin_username: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateNoteRequest {
    pub player_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateNoteRequest {
    pub content: Option<String>,
}
