//! Integration test: drive the assembled router end-to-end against a
//! temp database, covering the submit / browse / reflect flow and the
//! reflection endpoint's wire contract.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use murmur_api::{AppState, AppStateInner, router};
use murmur_types::api::{MessageResponse, ReflectionResponse, StatsResponse};

fn test_app() -> Router {
    let path = std::env::temp_dir().join(format!("murmur_http_test_{}.db", Uuid::new_v4()));
    let db = murmur_db::Database::open(&path).unwrap();
    let state: AppState = Arc::new(AppStateInner { db });
    router(state)
}

/// `oneshot` bypasses `into_make_service_with_connect_info`, so the peer
/// address extension is injected by hand.
fn with_peer(mut req: Request<Body>, addr: &str) -> Request<Body> {
    let addr: SocketAddr = addr.parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body<T: serde::de::DeserializeOwned>(resp: Response<Body>) -> T {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submit_browse_reflect_flow() {
    let app = test_app();

    // Submit trims text and applies fallbacks
    let resp = app
        .clone()
        .oneshot(post_json("/api/messages", r#"{"text":"  first light  "}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let msg: MessageResponse = json_body(resp).await;
    assert_eq!(msg.text, "first light");
    assert_eq!(msg.category, "general");
    assert_eq!(msg.author, "anonymous");
    assert_eq!(msg.reflection_count, 0);

    let reflect_uri = format!("/api/messages/{}/reflections", msg.id);

    // First reflection from 203.0.113.5
    let resp = app
        .clone()
        .oneshot(with_peer(post_empty(&reflect_uri), "203.0.113.5:9000"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: ReflectionResponse = json_body(resp).await;
    assert!(body.success);
    assert_eq!(body.count, Some(1));

    // Same voter again: idempotent no-op
    let resp = app
        .clone()
        .oneshot(with_peer(post_empty(&reflect_uri), "203.0.113.5:9001"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: ReflectionResponse = json_body(resp).await;
    assert!(!body.success);
    assert_eq!(body.count, None);
    assert_eq!(body.message.as_deref(), Some("already reflected"));

    // Different voter via X-Forwarded-For
    let mut req = post_empty(&reflect_uri);
    req.headers_mut()
        .insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
    let resp = app
        .clone()
        .oneshot(with_peer(req, "10.0.0.1:9000"))
        .await
        .unwrap();
    let body: ReflectionResponse = json_body(resp).await;
    assert!(body.success);
    assert_eq!(body.count, Some(2));

    // Listing carries the updated counter
    let resp = app.clone().oneshot(get("/api/messages")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Vec<MessageResponse> = json_body(resp).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, msg.id);
    assert_eq!(listed[0].reflection_count, 2);
}

#[tokio::test]
async fn reflecting_unknown_message_is_not_found() {
    let app = test_app();

    let uri = format!("/api/messages/{}/reflections", Uuid::new_v4());
    let resp = app
        .clone()
        .oneshot(with_peer(post_empty(&uri), "203.0.113.5:9000"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ReflectionResponse = json_body(resp).await;
    assert!(!body.success);
    assert_eq!(body.message.as_deref(), Some("message not found"));
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let app = test_app();

    let resp = app
        .clone()
        .oneshot(post_json("/api/messages", r#"{"text":"   "}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.clone().oneshot(get("/api/messages")).await.unwrap();
    let listed: Vec<MessageResponse> = json_body(resp).await;
    assert!(listed.is_empty());
}

#[tokio::test]
async fn popular_sort_and_limit() {
    let app = test_app();

    let mut ids = Vec::new();
    for text in ["one", "two", "three"] {
        let body = format!(r#"{{"text":"{}","category":"ideas","author":"ada"}}"#, text);
        let resp = app
            .clone()
            .oneshot(post_json("/api/messages", &body))
            .await
            .unwrap();
        let msg: MessageResponse = json_body(resp).await;
        ids.push(msg.id);
    }

    // Two voters on the last message, one on the second
    for (idx, voters) in [(2usize, vec!["203.0.113.5", "203.0.113.9"]), (1, vec!["203.0.113.5"])] {
        for voter in voters {
            let mut req = post_empty(&format!("/api/messages/{}/reflections", ids[idx]));
            req.headers_mut()
                .insert("x-forwarded-for", voter.parse().unwrap());
            let resp = app
                .clone()
                .oneshot(with_peer(req, "10.0.0.1:9000"))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }

    let resp = app
        .clone()
        .oneshot(get("/api/messages?sort=popular&limit=2"))
        .await
        .unwrap();
    let listed: Vec<MessageResponse> = json_body(resp).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, ids[2]);
    assert_eq!(listed[0].reflection_count, 2);
    assert_eq!(listed[1].id, ids[1]);
    assert_eq!(listed[1].reflection_count, 1);
}

#[tokio::test]
async fn stats_and_health() {
    let app = test_app();

    let resp = app.clone().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    app.clone()
        .oneshot(post_json(
            "/api/messages",
            r#"{"text":"hello","category":"ideas"}"#,
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json("/api/messages", r#"{"text":"world"}"#))
        .await
        .unwrap();

    let resp = app.clone().oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: StatsResponse = json_body(resp).await;
    assert_eq!(stats.messages, 2);
    assert_eq!(stats.reflections, 0);
    assert_eq!(stats.categories.len(), 2);
}
