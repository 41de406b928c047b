//! JWT access-token verification.
//!
//! Tokens are issued by the external identity service. This backend only
//! verifies them and reads the tenant-scoped claims (user, company, role).
//! RS256 is used in production; HS256 with a shared secret is supported for
//! local development and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("cannot sign token: {0}")]
    EncodingError(String),

    #[error("malformed token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("unusable verification key: {0}")]
    InvalidKey(String),

    #[error("claim `{0}` is missing or malformed")]
    InvalidClaim(&'static str),
}

/// Claims carried by an identity-service access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub company_id: String,
    /// `owner` or `worker`
    pub role: String,
    /// Unix seconds.
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    /// Negative `ttl_secs` yields an already expired token.
    pub fn new(user_id: Uuid, company_id: Uuid, role: impl Into<String>, ttl_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            company_id: company_id.to_string(),
            role: role.into(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidClaim("sub"))
    }

    pub fn company_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.company_id).map_err(|_| JwtError::InvalidClaim("company_id"))
    }
}

/// Verifies access tokens.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    /// Tolerated clock skew on `exp`.
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithm", &self.algorithm)
            .field("leeway_secs", &self.leeway_secs)
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtVerifier {
    /// Verifier for RS256 tokens signed by the identity service.
    pub fn rsa(public_key_pem: &str, leeway_secs: u64) -> Result<Self, JwtError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(e.to_string()))?;

        Ok(Self {
            decoding_key,
            algorithm: Algorithm::RS256,
            leeway_secs,
        })
    }

    /// Verifier for HS256 tokens with a shared secret.
    pub fn hmac(secret: &str, leeway_secs: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidKey("empty HS256 secret".into()));
        }
        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            leeway_secs,
        })
    }

    /// Validates a token and returns its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        use jsonwebtoken::errors::ErrorKind;

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.leeway_secs;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                ErrorKind::InvalidToken | ErrorKind::InvalidSignature => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            })
    }
}

/// Sign claims with an HS256 shared secret.
///
/// Used by development tooling and HTTP tests to mint tokens the
/// [`JwtVerifier::hmac`] verifier accepts.
pub fn sign_hs256(secret: &str, claims: &Claims) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingError(e.to_string()))
}
