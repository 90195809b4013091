use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use murmur_db::models::MessageRow;
use murmur_db::queries::MessageOrder;
use murmur_types::api::{MessageResponse, SubmitMessageRequest};

use crate::AppState;

const DEFAULT_CATEGORY: &str = "general";
const DEFAULT_AUTHOR: &str = "anonymous";

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: pass the `created_at` of the oldest
    /// message from the previous page to fetch older ones.
    pub before: Option<String>,
    #[serde(default)]
    pub sort: SortParam,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortParam {
    #[default]
    Recent,
    Popular,
}

fn default_limit() -> u32 {
    50
}

pub async fn submit_message(
    State(state): State<AppState>,
    Json(req): Json<SubmitMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Blank-after-trim input gets the same fallback as absent fields.
    let category = normalize(req.category.as_deref(), DEFAULT_CATEGORY);
    let author = normalize(req.author.as_deref(), DEFAULT_AUTHOR);

    let message_id = Uuid::new_v4();

    // Run blocking DB insert off the async runtime
    let db = state.clone();
    let mid = message_id.to_string();
    let (t, c, a) = (text.clone(), category.clone(), author.clone());
    tokio::task::spawn_blocking(move || db.db.insert_message(&mid, &t, &c, &a))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Message insert failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            text,
            category,
            author,
            reflection_count: 0,
            created_at: chrono::Utc::now(),
        }),
    ))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let limit = query.limit.min(200);
    let before = query.before;
    let order = match query.sort {
        SortParam::Recent => MessageOrder::Recent,
        SortParam::Popular => MessageOrder::Popular,
    };

    let rows = tokio::task::spawn_blocking(move || db.db.get_messages(limit, before.as_deref(), order))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Message listing failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let messages: Vec<MessageResponse> = rows.into_iter().map(row_to_response).collect();
    Ok(Json(messages))
}

fn normalize(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn row_to_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        text: row.text,
        category: row.category,
        author: row.author,
        reflection_count: row.reflection_count,
        created_at: row
            .created_at
            .parse::<chrono::DateTime<chrono::Utc>>()
            .or_else(|_| {
                // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
                // timezone. Parse as naive UTC and convert.
                chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                    .map(|ndt| ndt.and_utc())
            })
            .unwrap_or_else(|e| {
                warn!("Corrupt created_at '{}' on message '{}': {}", row.created_at, row.id, e);
                chrono::DateTime::default()
            }),
    }
}
