use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Datelike;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::GoogleConfig;
use crate::dtos::auth::GoogleProfile;
use crate::models::Account;
use crate::services::accounts::AccountService;
use crate::services::ServiceError;
use crate::store::AccountStore;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const JWKS_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/certs";
const PEOPLE_ENDPOINT: &str =
    "https://people.googleapis.com/v1/people/me?personFields=birthdays,emailAddresses,names";

/// Scopes requested from Google. The birthday scope lets us derive age
/// without asking the user, when they agree to share it.
const OAUTH_SCOPES: &str =
    "openid email profile https://www.googleapis.com/auth/user.birthday.read";

/// Both forms appear in the wild depending on how the token was minted.
const ACCEPTED_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Fetched signing keys are reused for up to an hour; an unknown `kid`
/// forces an immediate refetch to pick up rotation.
const JWKS_MAX_AGE: Duration = Duration::from_secs(3600);

/// Outcome of reconciling a verified Google profile against the
/// account store.
pub enum FederationOutcome {
    /// An account with this email already exists; log it in.
    Existing(Account),
    /// A new account was provisioned from the profile.
    Registered(Account),
    /// The profile lacks required fields; the caller must come back
    /// through complete-registration with them filled in.
    Pending(GoogleProfile),
}

/// One started authorization flow. `state` and `code_verifier` travel
/// back to us via short-lived cookies; only the challenge goes to
/// Google.
pub struct FlowStart {
    pub state: String,
    pub code_verifier: String,
    pub authorization_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
    id_token: Option<String>,
}

/// Claims we care about from Google's ID token. Audience, issuer and
/// expiry are enforced by the decoder, not read from here.
#[derive(Debug, Deserialize)]
pub struct IdTokenClaims {
    pub email: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[allow(dead_code)]
    pub exp: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

struct JwksCache {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
}

#[derive(Debug, Deserialize)]
struct PersonResponse {
    #[serde(default)]
    birthdays: Vec<Birthday>,
}

#[derive(Debug, Deserialize)]
struct Birthday {
    date: Option<BirthDate>,
}

#[derive(Debug, Deserialize)]
struct BirthDate {
    year: Option<i32>,
}

/// Federated identity resolver for Google sign-in: runs the
/// authorization-code flow with PKCE, verifies the returned ID token
/// against Google's published keys, and reconciles the asserted
/// profile into a local account.
#[derive(Clone)]
pub struct GoogleAuthService {
    config: GoogleConfig,
    store: Arc<dyn AccountStore>,
    accounts: AccountService,
    http: reqwest::Client,
    jwks: Arc<RwLock<Option<JwksCache>>>,
}

impl GoogleAuthService {
    pub fn new(
        config: GoogleConfig,
        store: Arc<dyn AccountStore>,
        accounts: AccountService,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            config,
            store,
            accounts,
            http,
            jwks: Arc::new(RwLock::new(None)),
        })
    }

    /// Start an authorization flow: fresh CSRF state, fresh PKCE
    /// verifier, and the URL to send the user to.
    pub fn begin_flow(&self) -> FlowStart {
        let state = Uuid::new_v4().to_string();

        let mut verifier_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut verifier_bytes);
        let code_verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let code_challenge = pkce_challenge(&code_verifier);

        let authorization_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256&prompt=select_account",
            AUTH_ENDPOINT,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(&state),
            urlencoding::encode(&code_challenge),
        );

        FlowStart {
            state,
            code_verifier,
            authorization_url,
        }
    }

    /// Exchange the authorization code for Google's tokens, proving
    /// flow continuity with the PKCE verifier.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<(String, String), ServiceError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_uri),
                ("grant_type", "authorization_code"),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await
            .map_err(|e| {
                ServiceError::FederationExchange(format!("Token endpoint unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::FederationExchange(format!(
                "Token exchange failed with {}: {}",
                status, body
            )));
        }

        let exchange: TokenExchangeResponse = response.json().await.map_err(|e| {
            ServiceError::FederationExchange(format!("Malformed token response: {}", e))
        })?;

        let id_token = exchange.id_token.ok_or_else(|| {
            ServiceError::FederationExchange("No ID token in exchange response".to_string())
        })?;

        Ok((exchange.access_token, id_token))
    }

    /// Verify an ID token's signature against Google's published keys
    /// and its audience, issuer and expiry, returning the asserted
    /// identity.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<IdTokenClaims, ServiceError> {
        let header = decode_header(id_token)
            .map_err(|e| ServiceError::InvalidAssertion(format!("Unreadable header: {}", e)))?;
        let kid = header
            .kid
            .ok_or_else(|| ServiceError::InvalidAssertion("ID token missing kid".to_string()))?;

        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Bad JWK material: {}", e)))?;

        decode_id_token(id_token, &key, Algorithm::RS256, &self.config.client_id)
    }

    /// Best-effort age lookup through the People API. A user who never
    /// shared a birthday yields `None`; only transport failures error.
    pub async fn fetch_age(&self, access_token: &str) -> Result<Option<i32>, ServiceError> {
        let response = self
            .http
            .get(PEOPLE_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                ServiceError::FederationExchange(format!("People API unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "People API lookup failed");
            return Ok(None);
        }

        let person: PersonResponse = response.json().await.map_err(|e| {
            ServiceError::FederationExchange(format!("Malformed People API response: {}", e))
        })?;

        Ok(age_from_birthdays(&person, chrono::Utc::now().year()))
    }

    /// Reconcile a verified profile into an account: log in an existing
    /// account by email, provision a new one when age can be resolved,
    /// or hand the profile back as pending when it cannot.
    pub async fn reconcile(
        &self,
        profile: GoogleProfile,
    ) -> Result<FederationOutcome, ServiceError> {
        if let Some(account) = self.store.find_by_email(&profile.email).await? {
            tracing::info!(account_id = %account.id, "Federated login for existing account");
            return Ok(FederationOutcome::Existing(account));
        }

        if profile.age.is_none() && self.config.default_age.is_none() {
            return Ok(FederationOutcome::Pending(profile));
        }

        let account = self.accounts.create_from_federation(&profile, None).await?;
        Ok(FederationOutcome::Registered(account))
    }

    /// Finish a pending registration with the caller-supplied age.
    pub async fn complete_registration(
        &self,
        profile: &GoogleProfile,
        age: i32,
    ) -> Result<Account, ServiceError> {
        if let Some(_existing) = self.store.find_by_email(&profile.email).await? {
            return Err(ServiceError::DuplicateEmail);
        }
        self.accounts.create_from_federation(profile, Some(age)).await
    }

    async fn signing_key(&self, kid: &str) -> Result<Jwk, ServiceError> {
        {
            let cache = self.jwks.read().await;
            if let Some(cache) = cache.as_ref() {
                if cache.fetched_at.elapsed() < JWKS_MAX_AGE {
                    if let Some(jwk) = cache.keys.get(kid) {
                        return Ok(jwk.clone());
                    }
                }
            }
        }

        // Stale cache or unknown kid: refetch once and retry.
        let mut cache = self.jwks.write().await;
        let response = self.http.get(JWKS_ENDPOINT).send().await.map_err(|e| {
            ServiceError::FederationExchange(format!("JWKS endpoint unreachable: {}", e))
        })?;
        let jwks: JwksResponse = response.json().await.map_err(|e| {
            ServiceError::FederationExchange(format!("Malformed JWKS response: {}", e))
        })?;

        let keys: HashMap<String, Jwk> =
            jwks.keys.into_iter().map(|k| (k.kid.clone(), k)).collect();
        let jwk = keys.get(kid).cloned();
        *cache = Some(JwksCache {
            keys,
            fetched_at: Instant::now(),
        });

        jwk.ok_or_else(|| {
            ServiceError::InvalidAssertion(format!("No Google signing key for kid {}", kid))
        })
    }
}

/// S256 code challenge for a PKCE verifier.
fn pkce_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Decode and validate an ID token. The algorithm is a parameter so the
/// checks can be exercised against symmetric keys as well as Google's
/// RSA keys.
pub(crate) fn decode_id_token(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
    client_id: &str,
) -> Result<IdTokenClaims, ServiceError> {
    let mut validation = Validation::new(algorithm);
    validation.set_audience(&[client_id]);
    validation.set_issuer(&ACCEPTED_ISSUERS);

    let data = decode::<IdTokenClaims>(token, key, &validation)
        .map_err(|e| ServiceError::InvalidAssertion(format!("ID token rejected: {}", e)))?;

    Ok(data.claims)
}

/// Age from the first birthday entry carrying a year. Google often
/// returns several entries; only account-level ones have the year.
fn age_from_birthdays(person: &PersonResponse, current_year: i32) -> Option<i32> {
    person
        .birthdays
        .iter()
        .filter_map(|b| b.date.as_ref().and_then(|d| d.year))
        .next()
        .map(|year| current_year - year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MIN_AGE;
    use crate::store::MemoryAccountStore;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const TEST_CLIENT_ID: &str = "client-123.apps.googleusercontent.com";
    const TEST_SECRET: &[u8] = b"id-token-test-secret";

    #[derive(Serialize)]
    struct TestClaims {
        aud: String,
        iss: String,
        exp: i64,
        email: String,
        given_name: String,
        family_name: String,
    }

    fn test_claims() -> TestClaims {
        TestClaims {
            aud: TEST_CLIENT_ID.to_string(),
            iss: "https://accounts.google.com".to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::minutes(5)).timestamp(),
            email: "alice@example.com".to_string(),
            given_name: "Alice".to_string(),
            family_name: "Smith".to_string(),
        }
    }

    fn sign(claims: &TestClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap()
    }

    fn decode_test_token(token: &str) -> Result<IdTokenClaims, ServiceError> {
        decode_id_token(
            token,
            &DecodingKey::from_secret(TEST_SECRET),
            Algorithm::HS256,
            TEST_CLIENT_ID,
        )
    }

    fn service(default_age: Option<i32>) -> GoogleAuthService {
        let store: Arc<dyn AccountStore> = Arc::new(MemoryAccountStore::new());
        let accounts = AccountService::new(store.clone(), default_age);
        GoogleAuthService::new(
            GoogleConfig {
                client_id: TEST_CLIENT_ID.to_string(),
                client_secret: "shhh".to_string(),
                redirect_uri: "http://localhost:8080/auth/google/callback".to_string(),
                timeout_seconds: 10,
                default_age,
            },
            store,
            accounts,
        )
        .unwrap()
    }

    fn profile(email: &str, age: Option<i32>) -> GoogleProfile {
        GoogleProfile {
            email: email.to_string(),
            given_name: "Alice".to_string(),
            family_name: "Smith".to_string(),
            age,
        }
    }

    #[test]
    fn test_valid_id_token_accepted() {
        let claims = decode_test_token(&sign(&test_claims())).unwrap();
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.given_name, "Alice");
    }

    #[test]
    fn test_bare_issuer_accepted() {
        let mut claims = test_claims();
        claims.iss = "accounts.google.com".to_string();
        assert!(decode_test_token(&sign(&claims)).is_ok());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let mut claims = test_claims();
        claims.aud = "someone-else.apps.googleusercontent.com".to_string();
        assert!(matches!(
            decode_test_token(&sign(&claims)),
            Err(ServiceError::InvalidAssertion(_))
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let mut claims = test_claims();
        claims.iss = "https://evil.example.com".to_string();
        assert!(matches!(
            decode_test_token(&sign(&claims)),
            Err(ServiceError::InvalidAssertion(_))
        ));
    }

    #[test]
    fn test_expired_id_token_rejected() {
        let mut claims = test_claims();
        claims.exp = (chrono::Utc::now() - chrono::Duration::minutes(5)).timestamp();
        assert!(matches!(
            decode_test_token(&sign(&claims)),
            Err(ServiceError::InvalidAssertion(_))
        ));
    }

    #[test]
    fn test_tampered_id_token_rejected() {
        let token = sign(&test_claims());
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let sig = parts.last_mut().unwrap();
        let replacement = if sig.ends_with('A') { "B" } else { "A" };
        sig.replace_range(sig.len() - 1.., replacement);

        assert!(matches!(
            decode_test_token(&parts.join(".")),
            Err(ServiceError::InvalidAssertion(_))
        ));
    }

    #[test]
    fn test_authorization_url_parameters() {
        let svc = service(None);
        let flow = svc.begin_flow();

        assert!(flow.authorization_url.starts_with(AUTH_ENDPOINT));
        assert!(flow
            .authorization_url
            .contains(&urlencoding::encode(TEST_CLIENT_ID).into_owned()));
        assert!(flow.authorization_url.contains("code_challenge_method=S256"));
        assert!(flow.authorization_url.contains("user.birthday.read"));
        assert!(flow
            .authorization_url
            .contains(&urlencoding::encode(&flow.state).into_owned()));
        // The raw verifier must never appear in the outbound URL.
        assert!(!flow.authorization_url.contains(&flow.code_verifier));
    }

    #[test]
    fn test_pkce_challenge_matches_verifier() {
        let challenge = pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_flows_use_distinct_state_and_verifier() {
        let svc = service(None);
        let a = svc.begin_flow();
        let b = svc.begin_flow();
        assert_ne!(a.state, b.state);
        assert_ne!(a.code_verifier, b.code_verifier);
    }

    #[test]
    fn test_age_from_birthdays() {
        let person: PersonResponse = serde_json::from_value(serde_json::json!({
            "birthdays": [
                { "date": { "month": 6, "day": 1 } },
                { "date": { "year": 1990, "month": 6, "day": 1 } }
            ]
        }))
        .unwrap();
        assert_eq!(age_from_birthdays(&person, 2025), Some(35));

        let empty: PersonResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(age_from_birthdays(&empty, 2025), None);
    }

    #[tokio::test]
    async fn test_reconcile_existing_account_logs_in() {
        let svc = service(None);
        let first = svc
            .accounts
            .create_from_federation(&profile("alice@example.com", Some(25)), None)
            .await
            .unwrap();

        match svc.reconcile(profile("alice@example.com", Some(25))).await {
            Ok(FederationOutcome::Existing(account)) => assert_eq!(account.id, first.id),
            _ => panic!("expected existing-account outcome"),
        }
    }

    #[tokio::test]
    async fn test_reconcile_provisions_with_known_age() {
        let svc = service(None);
        match svc.reconcile(profile("alice@example.com", Some(25))).await {
            Ok(FederationOutcome::Registered(account)) => {
                assert_eq!(account.email, "alice@example.com");
                assert_eq!(account.age, 25);
            }
            _ => panic!("expected registered outcome"),
        }
    }

    #[tokio::test]
    async fn test_reconcile_pending_without_age() {
        let svc = service(None);
        match svc.reconcile(profile("alice@example.com", None)).await {
            Ok(FederationOutcome::Pending(p)) => assert_eq!(p.email, "alice@example.com"),
            _ => panic!("expected pending outcome"),
        }
    }

    #[tokio::test]
    async fn test_reconcile_uses_configured_default_age() {
        let svc = service(Some(MIN_AGE));
        match svc.reconcile(profile("alice@example.com", None)).await {
            Ok(FederationOutcome::Registered(account)) => assert_eq!(account.age, MIN_AGE),
            _ => panic!("expected registered outcome"),
        }
    }

    #[tokio::test]
    async fn test_complete_registration_rejects_underage_and_duplicates() {
        let svc = service(None);

        let err = svc
            .complete_registration(&profile("alice@example.com", None), MIN_AGE - 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::IneligibleAge));

        svc.complete_registration(&profile("alice@example.com", None), 22)
            .await
            .unwrap();
        let err = svc
            .complete_registration(&profile("alice@example.com", None), 22)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateEmail));
    }
}
