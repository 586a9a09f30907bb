use axum::extract::State;
use axum::Json;

use pocketbook_core::error::AppError;

use crate::dtos::auth::{LoginRequest, TokenResponse};
use crate::dtos::ErrorResponse;
use crate::middleware::Bearer;
use crate::models::AccountResponse;
use crate::services::ServiceError;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Incorrect username or password", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = state
        .auth
        .login(&req.username, &req.password, req.scopes)
        .await?
        .ok_or(ServiceError::InvalidCredentials)?;

    Ok(Json(TokenResponse::new(
        token,
        state.auth.token_expiry_seconds(),
    )))
}

/// Return the account behind the presented bearer token
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Invalid, expired or underscoped token", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse)
    ),
    tag = "Auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(
    State(state): State<AppState>,
    Bearer(token): Bearer,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state.auth.authorize(&token, &["me"]).await?;
    Ok(Json(account.into()))
}
