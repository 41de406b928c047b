use axum::{middleware, routing::get, Router};
use domain::services::{NoopSiteCache, SiteAccessCache, TtlSiteCache};
use shared::jwt::{JwtError, JwtVerifier};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AnalyticsConfig, Config, JwtAuthConfig, SecurityConfig};
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_auth, trace_id,
    RateLimiterState,
};
use crate::routes::{absence_requests, analytics, attendance, audit_logs, health};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtVerifier>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
    pub site_cache: Arc<dyn SiteAccessCache>,
}

impl AppState {
    /// Builds the shared state; fails when the configured JWT key is unusable.
    pub fn new(
        config: Config,
        pool: PgPool,
        site_cache: Arc<dyn SiteAccessCache>,
    ) -> Result<Self, JwtError> {
        let jwt = Arc::new(build_verifier(&config.jwt)?);
        let rate_limiter =
            RateLimiterState::new(config.security.rate_limit_per_minute).map(Arc::new);

        Ok(Self {
            pool,
            config: Arc::new(config),
            jwt,
            rate_limiter,
            site_cache,
        })
    }
}

/// RS256 when a public key is configured, HS256 with the shared secret otherwise.
pub fn build_verifier(config: &JwtAuthConfig) -> Result<JwtVerifier, JwtError> {
    if config.public_key.trim().is_empty() {
        JwtVerifier::hmac(&config.secret, config.leeway_secs)
    } else {
        JwtVerifier::rsa(&config.public_key, config.leeway_secs)
    }
}

/// A zero TTL disables caching.
pub fn build_site_cache(config: &AnalyticsConfig) -> Arc<dyn SiteAccessCache> {
    if config.site_cache_ttl_secs == 0 {
        Arc::new(NoopSiteCache)
    } else {
        Arc::new(TtlSiteCache::new(
            Duration::from_secs(config.site_cache_ttl_secs),
            config.site_cache_capacity,
        ))
    }
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Layers run bottom-up: auth first, then the per-user limiter.
    let tenant_routes = Router::new()
        .nest("/absence-requests", absence_requests::router())
        .nest("/attendance", attendance::router())
        .nest("/analytics", analytics::router())
        .nest("/audit-logs", audit_logs::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", tenant_routes)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config.security))
        .with_state(state)
}
