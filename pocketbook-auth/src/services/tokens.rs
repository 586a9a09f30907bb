use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::services::ServiceError;

/// Token codec: mints and verifies the service's bearer tokens.
///
/// Signs with a single process-wide symmetric key loaded at startup.
/// Rotating the key invalidates every outstanding token; there is no key
/// versioning and no server-side revocation. Expiry is the sole
/// invalidation mechanism.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Distinguishes access from refresh tokens via an explicit claim.
/// The authorization guard only ever accepts `Access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signed claim set. Every field is required; a token missing any of
/// them fails verification as malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account username)
    pub sub: String,
    /// Scopes granted at mint time
    pub scopes: Vec<String>,
    /// Token kind (access/refresh)
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    /// Mint an access token with the configured TTL (default 15 minutes).
    pub fn issue_access(&self, subject: &str, scopes: Vec<String>) -> Result<String, ServiceError> {
        self.issue_with_ttl(
            subject,
            scopes,
            TokenKind::Access,
            Duration::minutes(self.access_token_expiry_minutes),
        )
    }

    /// Mint a refresh token with the configured TTL (default 30 days).
    pub fn issue_refresh(
        &self,
        subject: &str,
        scopes: Vec<String>,
    ) -> Result<String, ServiceError> {
        self.issue_with_ttl(
            subject,
            scopes,
            TokenKind::Refresh,
            Duration::days(self.refresh_token_expiry_days),
        )
    }

    /// Mint a token with an explicit TTL. Pure function of claims,
    /// signing key and clock.
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        scopes: Vec<String>,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            scopes,
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Token encoding failed: {}", e)))?;

        Ok(token)
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// `TokenExpired` when past `exp`; `MalformedToken` for a bad
    /// signature, wrong algorithm, or any missing required claim.
    pub fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // No leeway: expiry is the sole invalidation mechanism, enforced
        // to the second.
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => ServiceError::TokenExpired,
                    _ => ServiceError::MalformedToken,
                }
            })?;

        Ok(token_data.claims)
    }

    /// Access token lifetime in seconds, for the client-facing response.
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: "test-secret-0123456789abcdef-0123456789abcdef".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        })
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let service = test_service();

        let token = service
            .issue_access("alice", vec!["me".to_string()])
            .unwrap();
        assert!(!token.is_empty());

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.scopes, vec!["me".to_string()]);
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_token_carries_kind() {
        let service = test_service();

        let token = service.issue_refresh("alice", vec![]).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = test_service();

        let token = service
            .issue_with_ttl(
                "alice",
                vec!["me".to_string()],
                TokenKind::Access,
                Duration::seconds(-120),
            )
            .unwrap();

        match service.verify(&token) {
            Err(ServiceError::TokenExpired) => {}
            other => panic!("expected TokenExpired, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let service = test_service();

        let token = service
            .issue_access("alice", vec!["me".to_string()])
            .unwrap();

        // Flip one byte in the signature segment.
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let sig = parts.last_mut().unwrap();
        let replacement = if sig.ends_with('A') { "B" } else { "A" };
        sig.replace_range(sig.len() - 1.., replacement);
        let tampered = parts.join(".");

        match service.verify(&tampered) {
            Err(ServiceError::MalformedToken) => {}
            other => panic!("expected MalformedToken, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_key_rejected() {
        let service = test_service();
        let other = TokenService::new(&JwtConfig {
            secret: "a-completely-different-signing-secret!!".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        });

        let token = service.issue_access("alice", vec![]).unwrap();
        assert!(matches!(
            other.verify(&token),
            Err(ServiceError::MalformedToken)
        ));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let service = test_service();
        assert!(matches!(
            service.verify("not-a-jwt"),
            Err(ServiceError::MalformedToken)
        ));
    }
}
