// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway routes driven with `tower::ServiceExt::oneshot` over a test
//! harness engine.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use cinebot_gateway::error::{INCOMPLETE_BOOKING, MALFORMED_BODY, PROVIDER_FAILED, SIGN_IN_REQUIRED};
use cinebot_gateway::{AuthConfig, GatewayState, issue_token, router};
use cinebot_test_utils::{TestHarness, user};

const SECRET: &str = "test-secret";

fn app(h: &TestHarness) -> Router {
    router(GatewayState::new(
        h.engine.clone(),
        h.db.clone(),
        AuthConfig {
            jwt_secret: Some(SECRET.to_string()),
        },
    ))
}

fn bearer(user_id: i64) -> String {
    format!("Bearer {}", issue_token(SECRET, &user(user_id), Duration::hours(1)).unwrap())
}

async fn send(app: Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", token);
    }
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_is_public() {
    let h = TestHarness::new().await.unwrap();
    let (status, body) = send(app(&h), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn empty_chat_message_is_rejected() {
    let h = TestHarness::new().await.unwrap();
    let (status, body) = send(app(&h), "POST", "/api/chat", None, Some(json!({"message": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Tin nhắn không được để trống.");
    assert_eq!(h.provider.request_count().await, 0);
}

#[tokio::test]
async fn guest_chat_has_no_conversation() {
    let h = TestHarness::new().await.unwrap();
    h.provider.push_text("Chào bạn!").await;
    let (status, body) = send(app(&h), "POST", "/api/chat", None, Some(json!({"message": "xin chào"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Chào bạn!");
    assert!(body["conversation_id"].is_null());
    assert!(body.get("booking_data").is_none());
}

#[tokio::test]
async fn signed_in_chat_shows_up_in_history() {
    let h = TestHarness::new().await.unwrap();
    let token = bearer(1);
    h.provider.push_text("Chào Khán giả 1!").await;
    let (status, body) = send(app(&h), "POST", "/api/chat", Some(&token), Some(json!({"message": "xin chào"}))).await;
    assert_eq!(status, StatusCode::OK);
    let conversation = body["conversation_id"].as_str().unwrap().to_string();
    assert!(conversation.starts_with("user_1_"));

    let (status, history) = send(app(&h), "GET", "/api/chat/history", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["conversation_id"], conversation.as_str());
    assert_eq!(history["messages"][0]["sender"], "user");
    assert_eq!(history["messages"][1]["text"], "Chào Khán giả 1!");
}

#[tokio::test]
async fn history_requires_a_valid_token() {
    let h = TestHarness::new().await.unwrap();
    let (status, body) = send(app(&h), "GET", "/api/chat/history", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], SIGN_IN_REQUIRED);

    let (status, _) = send(app(&h), "GET", "/api/chat/history", Some("Bearer garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An invalid token is rejected even where guests are welcome.
    let (status, _) = send(app(&h), "POST", "/api/chat", Some("Token abc"), Some(json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn provider_failure_is_a_generic_500() {
    let h = TestHarness::new().await.unwrap();
    h.provider.push_error("429 rate limited").await;
    let (status, body) = send(app(&h), "POST", "/api/chat", Some(&bearer(1)), Some(json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], PROVIDER_FAILED);
}

#[tokio::test]
async fn booking_lifecycle() {
    let h = TestHarness::new().await.unwrap();
    let token = bearer(1);
    let showtime = h.catalog.mai_vincom_1230;

    let (status, body) = send(
        app(&h),
        "POST",
        "/api/bookings",
        Some(&token),
        Some(json!({"showtime_id": showtime, "seats": ["H8", "H9"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Đặt vé thành công!");
    let booking_id = body["booking_id"].as_i64().unwrap();

    let (status, body) = send(
        app(&h),
        "POST",
        "/api/bookings",
        Some(&bearer(2)),
        Some(json!({"showtime_id": showtime, "seats": ["H9", "H10"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Ghế H9 đã có người đặt. Vui lòng chọn ghế khác.");

    let uri = format!("/api/showtimes/{showtime}/occupied-seats");
    let (status, seats) = send(app(&h), "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let mut seats: Vec<String> = serde_json::from_value(seats).unwrap();
    seats.sort();
    assert_eq!(seats, vec!["H8", "H9"]);

    let (status, bookings) = send(app(&h), "GET", "/api/users/bookings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bookings[0]["booking_id"], booking_id);
    assert_eq!(bookings[0]["title"], "Mai");
}

#[tokio::test]
async fn booking_rejections() {
    let h = TestHarness::new().await.unwrap();
    let token = bearer(1);

    let (status, _) = send(
        app(&h),
        "POST",
        "/api/bookings",
        None,
        Some(json!({"showtime_id": h.catalog.mai_aeon_1345, "seats": ["A1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        app(&h),
        "POST",
        "/api/bookings",
        Some(&token),
        Some(json!({"showtime_id": 9999, "seats": ["A1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Không tìm thấy suất chiếu.");

    let (status, _) = send(
        app(&h),
        "POST",
        "/api/bookings",
        Some(&token),
        Some(json!({"showtime_id": h.catalog.mai_aeon_1345, "seats": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_get_a_message_and_400() {
    let h = TestHarness::new().await.unwrap();
    let token = bearer(1);

    let (status, body) = send(
        app(&h),
        "POST",
        "/api/bookings",
        Some(&token),
        Some(json!({"seats": ["A1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], INCOMPLETE_BOOKING);

    let (status, body) = send(
        app(&h),
        "POST",
        "/api/bookings",
        Some(&token),
        Some(json!({"showtime_id": "abc", "seats": ["A1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], INCOMPLETE_BOOKING);

    let (status, body) = send(app(&h), "POST", "/api/chat", None, Some(json!({"message": 42}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], MALFORMED_BODY);
}
