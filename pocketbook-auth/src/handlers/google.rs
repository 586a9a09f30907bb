use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};

use pocketbook_core::error::AppError;

use crate::dtos::auth::{
    CompleteRegistrationRequest, GoogleCallbackQuery, GoogleProfile, PendingRegistrationResponse,
    TokenResponse,
};
use crate::dtos::ErrorResponse;
use crate::services::FederationOutcome;
use crate::AppState;

const STATE_COOKIE: &str = "oauth_state";
const VERIFIER_COOKIE: &str = "code_verifier";

/// Scopes granted to accounts logging in through federation.
fn federated_scopes() -> Vec<String> {
    vec!["me".to_string()]
}

/// Redirect the user to Google's consent screen
#[utoipa::path(
    get,
    path = "/auth/google",
    responses(
        (status = 303, description = "Redirect to Google's authorization endpoint")
    ),
    tag = "Auth"
)]
pub async fn google_login(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Response) {
    let flow = state.google.begin_flow();

    // State and verifier survive only the round trip through Google.
    let updated_jar = jar
        .add(
            Cookie::build((STATE_COOKIE, flow.state))
                .path("/")
                .http_only(true)
                .secure(true)
                .max_age(time::Duration::minutes(5))
                .build(),
        )
        .add(
            Cookie::build((VERIFIER_COOKIE, flow.code_verifier))
                .path("/")
                .http_only(true)
                .secure(true)
                .max_age(time::Duration::minutes(5))
                .build(),
        );

    (
        updated_jar,
        Redirect::to(&flow.authorization_url).into_response(),
    )
}

/// Handle the redirect back from Google
#[utoipa::path(
    get,
    path = "/auth/google/callback",
    params(GoogleCallbackQuery),
    responses(
        (status = 200, description = "Login or pending registration", body = TokenResponse),
        (status = 400, description = "Invalid state or failed exchange", body = ErrorResponse),
        (status = 422, description = "Ineligible age", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<(CookieJar, Response), AppError> {
    let stored_state = jar.get(STATE_COOKIE).map(|c| c.value());
    if stored_state != Some(&query.state) {
        return Err(AppError::BadRequest(anyhow::anyhow!("Invalid OAuth state")));
    }

    let code_verifier = jar
        .get(VERIFIER_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing code verifier")))?;

    let (access_token, id_token) = state.google.exchange_code(&query.code, &code_verifier).await?;
    let claims = state.google.verify_id_token(&id_token).await?;
    let age = state.google.fetch_age(&access_token).await?;

    let profile = GoogleProfile {
        email: claims.email,
        given_name: claims.given_name,
        family_name: claims.family_name,
        age,
    };

    let response = match state.google.reconcile(profile).await? {
        FederationOutcome::Existing(account) | FederationOutcome::Registered(account) => {
            let token = state
                .tokens
                .issue_access(&account.username, federated_scopes())?;
            Json(TokenResponse::new(token, state.auth.token_expiry_seconds())).into_response()
        }
        FederationOutcome::Pending(profile) => Json(PendingRegistrationResponse::new(
            profile,
            vec!["age".to_string()],
        ))
        .into_response(),
    };

    let updated_jar = jar
        .remove(Cookie::from(STATE_COOKIE))
        .remove(Cookie::from(VERIFIER_COOKIE));

    Ok((updated_jar, response))
}

/// Finish a pending Google registration
#[utoipa::path(
    post,
    path = "/auth/google/complete-registration",
    request_body = CompleteRegistrationRequest,
    responses(
        (status = 200, description = "Account created and logged in", body = TokenResponse),
        (status = 400, description = "Duplicate email or username", body = ErrorResponse),
        (status = 422, description = "Ineligible age", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn complete_registration(
    State(state): State<AppState>,
    Json(req): Json<CompleteRegistrationRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let account = state
        .google
        .complete_registration(&req.google_data, req.age)
        .await?;

    let token = state
        .tokens
        .issue_access(&account.username, federated_scopes())?;

    Ok(Json(TokenResponse::new(
        token,
        state.auth.token_expiry_seconds(),
    )))
}
