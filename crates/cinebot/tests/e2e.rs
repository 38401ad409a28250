// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests across configuration, storage, engine and gateway.
//!
//! Each test builds the same stack `cinebot serve` builds, with the scripted
//! provider standing in for the model, and drives it over HTTP.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use cinebot_agent::{ChatEngine, EngineSettings};
use cinebot_gateway::{AuthConfig, GatewayState, issue_token, router};
use cinebot_storage::Database;
use cinebot_test_utils::{MockProvider, SeededCatalog, StaticRecommender, seed_catalog, user};
use cinebot_tools::builtin::register_builtins;
use cinebot_tools::{DateResolver, ToolRegistry};

const SECRET: &str = "e2e-secret";

struct Stack {
    app: Router,
    provider: Arc<MockProvider>,
    catalog: SeededCatalog,
    _dir: tempfile::TempDir,
}

async fn stack() -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let toml = format!(
        r#"
[agent]
name = "Popcorn"

[storage]
database_path = {path:?}

[session]
history_limit = 10

[gateway]
jwt_secret = "{SECRET}"
"#,
        path = dir.path().join("cinebot.db").to_string_lossy(),
    );
    let config = cinebot_config::load_and_validate_str(&toml).unwrap();

    let db = Database::open(&config.storage.database_path, config.storage.busy_timeout_ms)
        .await
        .unwrap();
    let catalog = seed_catalog(&db).await.unwrap();

    let dates = DateResolver::with_offset_hours(config.session.timezone_offset_hours).unwrap();
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &db, dates, Arc::new(StaticRecommender));

    let provider = Arc::new(MockProvider::new());
    let engine = ChatEngine::new(
        db.clone(),
        provider.clone(),
        Arc::new(registry),
        dates,
        EngineSettings::from_config(&config).await,
    );
    let app = router(GatewayState::new(
        Arc::new(engine),
        db,
        AuthConfig {
            jwt_secret: config.gateway.jwt_secret.clone(),
        },
    ));

    Stack {
        app,
        provider,
        catalog,
        _dir: dir,
    }
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let body = if body.is_null() { Body::empty() } else { Body::from(body.to_string()) };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn configured_persona_reaches_the_model() {
    let s = stack().await;
    s.provider.push_text("Xin chào!").await;
    let (status, _) = call(&s.app, "POST", "/api/chat", None, json!({"message": "chào"})).await;
    assert_eq!(status, StatusCode::OK);

    let request = s.provider.requests().await.remove(0);
    let system = request.messages[0].text();
    assert!(system.starts_with("Bạn là \"Popcorn\""));
    assert!(system.contains("Bạn đang nói chuyện với Khách."));
    assert!(system.contains("CGV Vincom Center"));
}

#[tokio::test]
async fn movie_details_conversation_is_remembered() {
    let s = stack().await;
    let token = issue_token(SECRET, &user(5), Duration::hours(1)).unwrap();

    s.provider
        .push_tool_calls(&[("get_movie_details", r#"{"movie_title": "mai"}"#)])
        .await;
    s.provider.push_text("Mai do Trấn Thành đạo diễn, dài 131 phút.").await;
    let (status, first) = call(&s.app, "POST", "/api/chat", Some(&token), json!({"message": "Phim Mai của ai?"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["reply"], "Mai do Trấn Thành đạo diễn, dài 131 phút.");
    let conversation = first["conversation_id"].as_str().unwrap().to_string();

    s.provider.push_text("Phim thuộc thể loại tâm lý.").await;
    let (_, second) = call(
        &s.app,
        "POST",
        "/api/chat",
        Some(&token),
        json!({"message": "Thể loại gì?", "conversation_id": conversation}),
    )
    .await;
    assert_eq!(second["conversation_id"], conversation.as_str());

    // The follow-up replays the stored tool call and its result.
    let replay = s.provider.requests().await.pop().unwrap();
    let tool = replay.messages.iter().find(|m| m.tool_call_id.is_some()).unwrap();
    assert!(tool.text().contains("Trấn Thành"));

    let (_, history) = call(&s.app, "GET", "/api/chat/history", Some(&token), Value::Null).await;
    assert_eq!(history["messages"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn guest_confirmation_then_signed_in_booking() {
    let s = stack().await;
    let showtime = json!({
        "showtime_id": s.catalog.mai_aeon_1345,
        "start_time": "2026-10-20T06:45:00Z",
        "ticket_price": 95000.0,
        "cinema_name": "CGV Aeon Long Biên",
        "city": "Hà Nội",
        "movie_id": s.catalog.mai,
        "title": "Mai",
        "features": "2D"
    });
    let history = json!([
        {"sender": "user", "text": "Mai ở Long Biên"},
        {"sender": "tool", "text": json!([showtime]).to_string()},
        {"sender": "bot", "text": "1. 13:45 tại CGV Aeon Long Biên. Bạn muốn chọn suất nào?"}
    ]);

    s.provider.push_text(r#"{"choice_time": "13:45"}"#).await;
    let (status, reply) = call(
        &s.app,
        "POST",
        "/api/chat",
        None,
        json!({"message": "suất 13:45", "history": history}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let chosen = reply["booking_data"][0]["showtime_id"].as_i64().unwrap();
    assert_eq!(chosen, s.catalog.mai_aeon_1345);

    let token = issue_token(SECRET, &user(9), Duration::hours(1)).unwrap();
    let (status, created) = call(
        &s.app,
        "POST",
        "/api/bookings",
        Some(&token),
        json!({"showtime_id": chosen, "seats": [" E5 ", "E6"]}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, bookings) = call(&s.app, "GET", "/api/users/bookings", Some(&token), Value::Null).await;
    assert_eq!(bookings[0]["booking_id"], created["booking_id"]);
    assert_eq!(bookings[0]["seats"], json!(["E5", "E6"]));
    assert_eq!(bookings[0]["total_amount"], 190000.0);
}
