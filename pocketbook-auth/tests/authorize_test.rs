mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{body_json, TestApp};
use pocketbook_auth::services::tokens::TokenKind;

#[tokio::test]
async fn test_me_returns_current_account() {
    let app = TestApp::new().await;
    let account = app
        .seed_account("alice", "secret123", "alice@example.com")
        .await;
    let token = app.login("alice", "secret123").await;

    let response = app.get_with_token("/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], account.id.to_string());
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_missing_and_malformed_authorization_header() {
    let app = TestApp::new().await;

    let response = app.get("/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Not authenticated");

    let response = app
        .request(
            axum::http::Request::get("/auth/me")
                .header("authorization", "Basic YWxpY2U6cHc=")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let app = TestApp::new().await;

    let response = app.get_with_token("/auth/me", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Invalid token");
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = TestApp::new().await;
    app.seed_account("alice", "secret123", "alice@example.com")
        .await;

    let expired = app
        .state
        .tokens
        .issue_with_ttl(
            "alice",
            vec!["me".to_string()],
            TokenKind::Access,
            Duration::seconds(-120),
        )
        .unwrap();

    let response = app.get_with_token("/auth/me", &expired).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Token expired");
}

#[tokio::test]
async fn test_underscoped_token_rejected() {
    let app = TestApp::new().await;
    app.seed_account("alice", "secret123", "alice@example.com")
        .await;

    let token = app.state.tokens.issue_access("alice", vec![]).unwrap();

    let response = app.get_with_token("/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Not enough permissions");
}

#[tokio::test]
async fn test_refresh_token_not_accepted_as_access() {
    let app = TestApp::new().await;
    app.seed_account("alice", "secret123", "alice@example.com")
        .await;

    let refresh = app
        .state
        .tokens
        .issue_refresh("alice", vec!["me".to_string()])
        .unwrap();

    let response = app.get_with_token("/auth/me", &refresh).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Invalid token");
}

#[tokio::test]
async fn test_token_for_deleted_account() {
    let app = TestApp::new().await;
    let account = app
        .seed_account("alice", "secret123", "alice@example.com")
        .await;
    let token = app.login("alice", "secret123").await;

    app.state.store.delete(account.id).await.unwrap();

    let response = app.get_with_token("/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["detail"], "Account not found");
}
