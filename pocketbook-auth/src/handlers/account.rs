use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use pocketbook_core::error::AppError;

use crate::dtos::account::{RegisterRequest, UpdateAccountRequest};
use crate::dtos::ErrorResponse;
use crate::middleware::Bearer;
use crate::models::AccountResponse;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Register a new account
#[utoipa::path(
    post,
    path = "/accounts",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Duplicate email or username", body = ErrorResponse),
        (status = 422, description = "Validation error or ineligible age", body = ErrorResponse)
    ),
    tag = "Accounts"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let account = state.accounts.create_direct(req.into()).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// List all accounts
#[utoipa::path(
    get,
    path = "/accounts",
    responses(
        (status = 200, description = "All accounts", body = [AccountResponse]),
        (status = 401, description = "Invalid, expired or underscoped token", body = ErrorResponse)
    ),
    tag = "Accounts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Bearer(token): Bearer,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    state.auth.authorize(&token, &["me"]).await?;

    let accounts = state.accounts.list().await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// Fetch one account by id
#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(
        ("id" = Uuid, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "The account", body = AccountResponse),
        (status = 401, description = "Invalid, expired or underscoped token", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Accounts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_account(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AppError> {
    state.auth.authorize(&token, &["me"]).await?;

    let account = state.accounts.get(id).await?;
    Ok(Json(account.into()))
}

/// Partially update an account
#[utoipa::path(
    patch,
    path = "/accounts/{id}",
    params(
        ("id" = Uuid, Path, description = "Account id")
    ),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 400, description = "Duplicate email or username", body = ErrorResponse),
        (status = 401, description = "Invalid, expired or underscoped token", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 422, description = "Validation error or ineligible age", body = ErrorResponse)
    ),
    tag = "Accounts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_account(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    state.auth.authorize(&token, &["me"]).await?;

    let account = state.accounts.update(id, req.into()).await?;
    Ok(Json(account.into()))
}

/// Delete an account
#[utoipa::path(
    delete,
    path = "/accounts/{id}",
    params(
        ("id" = Uuid, Path, description = "Account id")
    ),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Invalid, expired or underscoped token", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "Accounts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_account(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.auth.authorize(&token, &["me"]).await?;

    state.accounts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
