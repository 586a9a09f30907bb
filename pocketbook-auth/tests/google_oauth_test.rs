mod common;

use axum::http::{header, StatusCode};
use common::{body_json, TestApp};

fn google_data(email: &str) -> serde_json::Value {
    serde_json::json!({
        "email": email,
        "given_name": "Alice",
        "family_name": "Smith",
        "age": null
    })
}

#[tokio::test]
async fn test_google_login_redirects_with_flow_cookies() {
    let app = TestApp::new().await;

    let response = app.get("/auth/google").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
    assert!(location.contains("code_challenge_method=S256"));
    assert!(location.contains("user.birthday.read"));

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("oauth_state=")));
    assert!(cookies.iter().any(|c| c.starts_with("code_verifier=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch() {
    let app = TestApp::new().await;

    // Cookie state and query state disagree.
    let response = app
        .request(
            axum::http::Request::get("/auth/google/callback?code=abc&state=forged")
                .header(header::COOKIE, "oauth_state=genuine; code_verifier=v123")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Invalid OAuth state");

    // No cookies at all.
    let response = app.get("/auth/google/callback?code=abc&state=genuine").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_complete_registration_mints_token() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/auth/google/complete-registration",
            serde_json::json!({
                "google_data": google_data("alice@example.com"),
                "age": 22
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");

    // The provisioned account derives its username from the email local
    // part and is immediately authorized for "me".
    let token = body["access_token"].as_str().unwrap();
    let response = app.get_with_token("/auth/me", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["username"], "alice");
    assert_eq!(me["age"], 22);
}

#[tokio::test]
async fn test_complete_registration_underage() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/auth/google/complete-registration",
            serde_json::json!({
                "google_data": google_data("kid@example.com"),
                "age": 17
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["detail"], "Age must be at least 18");
}

#[tokio::test]
async fn test_complete_registration_duplicate_email() {
    let app = TestApp::new().await;
    app.seed_account("alice", "secret123", "alice@example.com")
        .await;

    let response = app
        .post_json(
            "/auth/google/complete-registration",
            serde_json::json!({
                "google_data": google_data("alice@example.com"),
                "age": 22
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Email already exists");
}
