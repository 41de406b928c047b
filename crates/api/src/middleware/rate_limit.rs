//! Per-user rate limiting.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::AuthContext;
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use std::num::NonZeroU32;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Keyed limiter shared by every request; one bucket per user id.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<Uuid>,
    clock: DefaultClock,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// Returns `None` for a zero limit, which disables rate limiting.
    pub fn new(rate_limit_per_minute: u32) -> Option<Self> {
        let per_minute = NonZeroU32::new(rate_limit_per_minute)?;
        Some(Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            clock: DefaultClock::default(),
            rate_limit_per_minute,
        })
    }

    /// `Err` carries the seconds to wait, at least 1.
    pub fn check(&self, user_id: Uuid) -> Result<(), u64> {
        self.limiter.check_key(&user_id).map_err(|not_until| {
            not_until
                .wait_time_from(self.clock.now())
                .as_secs()
                .max(1)
        })
    }

    /// Drops buckets that are full again.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_users(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("tracked_users", &self.tracked_users())
            .finish()
    }
}

/// Must run after [`super::auth::require_auth`], which provides the caller.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (Some(limiter), Some(ctx)) = (
        state.rate_limiter.as_ref(),
        req.extensions().get::<AuthContext>(),
    ) else {
        return next.run(req).await;
    };

    if let Err(retry_after_secs) = limiter.check(ctx.user_id) {
        tracing::warn!(
            user_id = %ctx.user_id,
            company_id = %ctx.company_id,
            retry_after_secs,
            "Rate limit exceeded"
        );
        return ApiError::RateLimited { retry_after_secs }.into_response();
    }

    next.run(req).await
}
