pub mod auth;
mod character;
mod error;
mod events;
mod locations;
mod notes;
mod users;
mod validation;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

/// Acknowledgement body for deletes
#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new().route("/login", post(auth::login));

    // Resource routes; each handler enforces its own slice of the policy
    // table, and the location list is the only route open to anonymous
    // callers
    let api_routes = Router::new()
        // Locations
        .route(
            "/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route(
            "/locations/:id",
            put(locations::update_location).delete(locations::delete_location),
        )
        // Embedded events
        .route("/locations/:id/events", post(events::add_event))
        .route(
            "/locations/:id/events/:event_id",
            put(events::update_event).delete(events::delete_event),
        )
        // Character sheets
        .route("/character/me", get(character::my_sheet))
        .route("/character/all", get(character::list_sheets))
        .route("/character", post(character::upsert_sheet))
        // Narrator notes
        .route("/notes", post(notes::create_note))
        .route(
            "/notes/:id",
            get(notes::list_notes_for_player)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        // Accounts
        .route("/users", get(users::list_users).post(users::create_user));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    time: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        time: chrono::Utc::now().to_rfc3339(),
    })
}
