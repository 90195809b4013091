pub mod identity;
pub mod messages;
pub mod reflections;
pub mod stats;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use murmur_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

/// The full API router. Kept here so the server binary and integration
/// tests assemble identical routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/messages", get(messages::get_messages))
        .route("/api/messages", post(messages::submit_message))
        .route(
            "/api/messages/{message_id}/reflections",
            post(reflections::register_reflection),
        )
        .route("/api/stats", get(stats::get_stats))
        .route("/api/health", get(stats::health))
        .with_state(state)
}
