use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use murmur_types::api::{CategoryStats, StatsResponse};

use crate::AppState;

pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let summary = tokio::task::spawn_blocking(move || db.db.stats())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Stats query failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(StatsResponse {
        messages: summary.messages,
        reflections: summary.reflections,
        categories: summary
            .categories
            .into_iter()
            .map(|c| CategoryStats {
                category: c.category,
                messages: c.messages,
                reflections: c.reflections,
            })
            .collect(),
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
