use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use murmur_db::queries::ReflectOutcome;
use murmur_types::api::ReflectionResponse;

use crate::AppState;
use crate::identity::voter_identity;

pub async fn register_reflection(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let voter = voter_identity(&headers, peer);
    let reflection_id = Uuid::new_v4();

    let db = state.clone();
    let mid = message_id.to_string();
    let outcome = tokio::task::spawn_blocking(move || {
        db.db
            .register_reflection(&reflection_id.to_string(), &mid, &voter)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Reflection registration failed for message {}: {}", message_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let (status, body) = match outcome {
        ReflectOutcome::Registered(count) => (
            StatusCode::OK,
            ReflectionResponse {
                success: true,
                count: Some(count),
                message: None,
            },
        ),
        ReflectOutcome::AlreadyRegistered => (
            StatusCode::OK,
            ReflectionResponse {
                success: false,
                count: None,
                message: Some("already reflected".into()),
            },
        ),
        ReflectOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            ReflectionResponse {
                success: false,
                count: None,
                message: Some("message not found".into()),
            },
        ),
    };

    Ok((status, Json(body)))
}
