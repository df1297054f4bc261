//! Integration tests for the HTTP API.
//!
//! Each test builds the router over a fresh in-memory repository and drives
//! it with `oneshot` requests.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use bracket_engine::db::MemoryRepository;
use bracket_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

fn app() -> axum::Router {
    create_router(AppState::new(Arc::new(MemoryRepository::new())))
}

async fn send(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_tournament(app: &axum::Router, names: &[&str]) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/tournaments",
        Some(json!({
            "name": "Club Open",
            "start_date": "2026-05-01T09:00:00Z",
            "max_participants": 16
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["tournament"]["id"].as_i64().unwrap();

    if !names.is_empty() {
        let participants: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
        let (status, _) = send(
            app,
            Method::PUT,
            &format!("/api/v1/tournaments/{id}/participants"),
            Some(json!({ "participants": participants })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    id
}

fn match_at(matches: &Value, round: i64, match_number: i64) -> Value {
    matches
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["round"] == round && m["match_number"] == match_number)
        .cloned()
        .unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "health-probe")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).unwrap(),
        "health-probe"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
}

// ============================================================================
// Tournament Tests
// ============================================================================

#[tokio::test]
async fn test_create_and_get_tournament() {
    let app = app();
    let id = create_tournament(&app, &["Ada", "Grace"]).await;

    let (status, body) = send(&app, Method::GET, &format!("/api/v1/tournaments/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Club Open");
    assert_eq!(body["status"], "setup");
    assert_eq!(body["tournament_type"], "single_elimination");
    assert_eq!(body["participant_count"], 2);
    assert_eq!(body["is_paused"], false);
}

#[tokio::test]
async fn test_create_tournament_validation() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/tournaments",
        Some(json!({ "name": "", "start_date": "2026-05-01T09:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_list_tournaments_by_status() {
    let app = app();
    let first = create_tournament(&app, &["A", "B"]).await;
    create_tournament(&app, &[]).await;
    send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{first}/bracket/generate"),
        None,
    )
    .await;

    let (_, all) = send(&app, Method::GET, "/api/v1/tournaments", None).await;
    assert_eq!(all["tournaments"].as_array().unwrap().len(), 2);

    let (status, active) = send(&app, Method::GET, "/api/v1/tournaments?status=active", None).await;
    assert_eq!(status, StatusCode::OK);
    let active = active["tournaments"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], first);
}

#[tokio::test]
async fn test_unknown_tournament_is_404() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/tournaments/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Tournament not found: 77");

    let (status, _) = send(&app, Method::DELETE, "/api/v1/tournaments/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_participant_capacity() {
    let app = app();
    let (_, body) = send(
        &app,
        Method::POST,
        "/api/v1/tournaments",
        Some(json!({ "name": "Duel", "start_date": "2026-05-01T09:00:00Z", "max_participants": 2 })),
    )
    .await;
    let id = body["tournament"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/tournaments/{id}/participants");

    let (status, body) = send(&app, Method::POST, &uri, Some(json!({ "name": "Ada" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["participant"]["status"], "approved");

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "participants": [{ "name": "Grace" }, { "name": "Linus" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "participants": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_approve_pending_participant() {
    let app = app();
    let id = create_tournament(&app, &["A"]).await;
    let (_, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{id}/participants"),
        Some(json!({ "name": "Late", "status": "pending" })),
    )
    .await;
    let pid = body["participant"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{id}/bracket/generate"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{id}/participants/{pid}/approve"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{id}/bracket/generate"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

// ============================================================================
// Bracket Tests
// ============================================================================

#[tokio::test]
async fn test_generate_bracket_shape() {
    let app = app();
    let id = create_tournament(&app, &["A", "B", "C", "D", "E"]).await;
    let uri = format!("/api/v1/tournaments/{id}/bracket/generate");

    let (status, body) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["rounds"], 3);
    assert_eq!(body["matches"].as_array().unwrap().len(), 7);

    let bye = match_at(&body["matches"], 1, 3);
    assert!(bye["participant1_id"].is_i64());
    assert!(bye["participant2_id"].is_null());
    assert!(bye["winner_id"].is_null());

    // second call returns the same bracket
    let (status, again) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["matches"], body["matches"]);
}

#[tokio::test]
async fn test_full_tournament_over_http() {
    let app = app();
    let id = create_tournament(&app, &["A", "B", "C", "D"]).await;
    let (_, generated) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{id}/bracket/generate"),
        None,
    )
    .await;

    let m1 = match_at(&generated["matches"], 1, 1);
    let m2 = match_at(&generated["matches"], 1, 2);
    let a = m1["participant1_id"].as_i64().unwrap();
    let d = m2["participant2_id"].as_i64().unwrap();

    let result_uri = |match_id: &Value| {
        format!("/api/v1/tournaments/{id}/bracket/{}/result", match_id.as_i64().unwrap())
    };

    let (status, body) = send(
        &app,
        Method::PUT,
        &result_uri(&m1["id"]),
        Some(json!({ "winner_id": a, "score": "3-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bracket"]["winner_id"], a);
    assert_eq!(body["bracket"]["score"], "3-1");
    assert_eq!(body["tournament_status"], "active");

    send(
        &app,
        Method::PUT,
        &result_uri(&m2["id"]),
        Some(json!({ "winner_id": d })),
    )
    .await;

    let (_, view) = send(&app, Method::GET, &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    let final_match = match_at(&view["bracket"], 2, 1);
    assert_eq!(final_match["participant1_id"], a);
    assert_eq!(final_match["participant2_id"], d);
    assert!(view["champion_id"].is_null());

    let (status, body) = send(
        &app,
        Method::PUT,
        &result_uri(&final_match["id"]),
        Some(json!({ "winner_id": d, "score": "2-0" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tournament_status"], "completed");

    let (_, view) = send(&app, Method::GET, &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    assert_eq!(view["champion_id"], d);
    assert_eq!(view["tournament"]["status"], "completed");

    // completed brackets cannot be reset
    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_result_errors() {
    let app = app();
    let id = create_tournament(&app, &["A", "B", "C"]).await;
    let (_, generated) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{id}/bracket/generate"),
        None,
    )
    .await;
    let m1 = match_at(&generated["matches"], 1, 1);
    let bye = match_at(&generated["matches"], 1, 2);
    let c = bye["participant1_id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/tournaments/{id}/bracket/999/result"),
        Some(json!({ "winner_id": c })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/tournaments/{id}/bracket/{}/result", bye["id"]),
        Some(json!({ "winner_id": c })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("incomplete"));

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/tournaments/{id}/bracket/{}/result", m1["id"]),
        Some(json!({ "winner_id": c })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_paused_tournament_refuses_result_changes() {
    let app = app();
    let id = create_tournament(&app, &["A", "B"]).await;
    let (_, generated) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{id}/bracket/generate"),
        None,
    )
    .await;
    let only = match_at(&generated["matches"], 1, 1);
    let result_uri = format!("/api/v1/tournaments/{id}/bracket/{}/result", only["id"]);
    let winner = json!({ "winner_id": only["participant1_id"] });

    let (status, body) = send(&app, Method::POST, &format!("/api/v1/tournaments/{id}/pause"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_paused"], true);

    let (status, body) = send(&app, Method::PUT, &result_uri, Some(winner.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], format!("Tournament {id} is paused"));
    let (status, _) = send(&app, Method::DELETE, &result_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // reads stay available
    let (status, _) = send(&app, Method::GET, &format!("/api/v1/tournaments/{id}/brackets"), None).await;
    assert_eq!(status, StatusCode::OK);

    send(&app, Method::POST, &format!("/api/v1/tournaments/{id}/resume"), None).await;
    let (status, _) = send(&app, Method::PUT, &result_uri, Some(winner)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_clear_result_over_http() {
    let app = app();
    let id = create_tournament(&app, &["A", "B", "C", "D"]).await;
    let (_, generated) = send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{id}/bracket/generate"),
        None,
    )
    .await;
    let m2 = match_at(&generated["matches"], 1, 2);
    let result_uri = format!("/api/v1/tournaments/{id}/bracket/{}/result", m2["id"]);

    send(
        &app,
        Method::PUT,
        &result_uri,
        Some(json!({ "winner_id": m2["participant1_id"], "score": "1-0" })),
    )
    .await;
    let (status, body) = send(&app, Method::DELETE, &result_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["bracket"]["winner_id"].is_null());
    assert!(body["bracket"]["score"].is_null());

    let (_, matches) = send(&app, Method::GET, &format!("/api/v1/tournaments/{id}/brackets"), None).await;
    assert!(match_at(&matches, 2, 1)["participant2_id"].is_null());
}

#[tokio::test]
async fn test_reset_and_delete() {
    let app = app();
    let id = create_tournament(&app, &["A", "B", "C"]).await;
    send(
        &app,
        Method::POST,
        &format!("/api/v1/tournaments/{id}/bracket/generate"),
        None,
    )
    .await;

    let (status, body) = send(&app, Method::DELETE, &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_matches"], 3);

    let (_, tournament) = send(&app, Method::GET, &format!("/api/v1/tournaments/{id}"), None).await;
    assert_eq!(tournament["status"], "setup");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/tournaments/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
