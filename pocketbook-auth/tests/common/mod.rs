//! Shared setup for pocketbook-auth integration tests.
//!
//! Tests run the real router over the in-memory account store, so no
//! database or network is needed.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use pocketbook_auth::{
    build_router,
    config::{
        AuthConfig, DatabaseConfig, Environment, GoogleConfig, JwtConfig, RateLimitConfig,
        SecurityConfig, SwaggerConfig, SwaggerMode,
    },
    models::Account,
    services::{AccountService, AuthService, GoogleAuthService, TokenService},
    store::{AccountStore, MemoryAccountStore},
    utils::{hash_password, Password},
    AppState,
};
use pocketbook_core::config as core_config;
use pocketbook_core::middleware::rate_limit::create_ip_rate_limiter;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: core_config::Config { port: 8080 },
        environment: Environment::Dev,
        service_name: "pocketbook-auth".to_string(),
        service_version: "0.0.0-test".to_string(),
        log_level: "error".to_string(),
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        },
        google: GoogleConfig {
            client_id: "test-client.apps.googleusercontent.com".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_uri: "http://localhost:8080/auth/google/callback".to_string(),
            timeout_seconds: 1,
            default_age: None,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AuthConfig) -> Self {
        let store: Arc<dyn AccountStore> = Arc::new(MemoryAccountStore::new());
        let tokens = TokenService::new(&config.jwt);
        let auth = AuthService::new(store.clone(), tokens.clone());
        let accounts = AccountService::new(store.clone(), config.google.default_age);
        let google =
            GoogleAuthService::new(config.google.clone(), store.clone(), accounts.clone())
                .expect("failed to build Google service");

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        let state = AppState {
            config,
            store,
            tokens,
            auth,
            accounts,
            google,
            login_rate_limiter,
            ip_rate_limiter,
        };

        let router = build_router(state.clone())
            .await
            .expect("failed to build router");

        TestApp { router, state }
    }

    /// Insert an account directly into the store, bypassing the API.
    pub async fn seed_account(&self, username: &str, password: &str, email: &str) -> Account {
        let hash = hash_password(&Password::new(password.to_string())).unwrap();
        let account = Account::new(
            email.to_string(),
            username.to_string(),
            "Test".to_string(),
            "User".to_string(),
            30,
            hash.into_string(),
        );
        self.state.store.insert(&account).await.unwrap();
        account
    }

    pub async fn request(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_with_token(&self, uri: &str, token: &str) -> Response<Body> {
        self.request(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.request(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.request(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Log in through the API and return the minted access token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_json(
                "/auth/login",
                serde_json::json!({
                    "username": username,
                    "password": password,
                    "scopes": ["me"]
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        body["access_token"].as_str().unwrap().to_string()
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
