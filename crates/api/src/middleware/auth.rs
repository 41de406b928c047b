//! Authentication middleware for the tenant API.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::extractors::authenticate;

/// Rejects requests without a valid bearer token with 401.
///
/// The verified [`domain::models::AuthContext`] is stored in request
/// extensions for the rate limiter and the handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state.jwt, req.headers()) {
        Ok(ctx) => {
            tracing::Span::current().record("user_id", tracing::field::display(ctx.user_id));
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "Authentication failed");
            err.into_response()
        }
    }
}
