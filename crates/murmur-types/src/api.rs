use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitMessageRequest {
    pub text: String,
    pub category: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub text: String,
    pub category: String,
    pub author: String,
    pub reflection_count: i64,
    pub created_at: DateTime<Utc>,
}

// -- Reflections --

/// Wire shape of the reflection endpoint: `count` is present on a fresh
/// registration, `message` carries the reason otherwise.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReflectionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// -- Stats --

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub messages: i64,
    pub reflections: i64,
    pub categories: Vec<CategoryStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub messages: i64,
    pub reflections: i64,
}
