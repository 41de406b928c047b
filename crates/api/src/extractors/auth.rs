//! Bearer-token authentication into an [`AuthContext`].

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use domain::models::{AuthContext, Role};
use shared::jwt::JwtVerifier;

use crate::app::AppState;
use crate::error::ApiError;

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))
}

/// Verifies the bearer token and builds the caller context from its claims.
pub fn authenticate(verifier: &JwtVerifier, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let claims = verifier.verify(bearer_token(headers)?)?;

    let role: Role = claims
        .role
        .parse()
        .map_err(|_| ApiError::Unauthorized("Invalid role claim".to_string()))?;

    Ok(AuthContext::new(claims.user_id()?, claims.company_id()?, role))
}

/// Authenticated caller.
///
/// Reuses the context inserted by the auth middleware when present.
#[derive(Debug, Clone, Copy)]
pub struct Auth(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<AuthContext>() {
            return Ok(Auth(*ctx));
        }

        let ctx = authenticate(&state.jwt, &parts.headers)?;
        parts.extensions.insert(ctx);
        Ok(Auth(ctx))
    }
}

/// Authenticated company owner; workers get 403.
#[derive(Debug, Clone, Copy)]
pub struct OwnerAuth(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for OwnerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(ctx) = Auth::from_request_parts(parts, state).await?;
        if ctx.is_owner() {
            Ok(OwnerAuth(ctx))
        } else {
            Err(ApiError::Forbidden(
                "Only company owners can perform this action".to_string(),
            ))
        }
    }
}
