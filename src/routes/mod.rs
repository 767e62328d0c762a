pub mod admin;
pub mod auth;
pub mod health;
pub mod member_domains;
pub mod reservations;
pub mod seminars;
pub mod surveys;

use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Router};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::rate_limit::{rate_limit_response, spawn_cleanup};
use crate::middleware::security_headers::security_headers;
use crate::AppState;

/// Build the full HTTP application.
///
/// The API is mounted twice: under `/api` (default tenant, `?tenant=` override)
/// and under `/api/t/:tenant`. Both mounts share the same rate limiters.
pub fn app(state: Arc<AppState>) -> anyhow::Result<Router> {
    let limits = &state.config.rate_limit;

    // Auth limiter: login attempts per client IP.
    let mut auth_builder = GovernorConfigBuilder::default().key_extractor(SmartIpKeyExtractor);
    auth_builder
        .per_second(limits.auth_per_second.into())
        .burst_size(limits.auth_burst)
        .error_handler(rate_limit_response);
    let auth_gov_conf = Arc::new(
        auth_builder
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Failed to build auth governor config"))?,
    );
    let auth_limiter = auth_gov_conf.limiter().clone();
    spawn_cleanup("auth", move || {
        auth_limiter.retain_recent();
        auth_limiter.len()
    });

    // Booking limiter: bookings, reservation self-service and survey submission.
    let mut booking_builder = GovernorConfigBuilder::default().key_extractor(SmartIpKeyExtractor);
    booking_builder
        .per_second(limits.booking_per_second.into())
        .burst_size(limits.booking_burst)
        .error_handler(rate_limit_response);
    let booking_gov_conf = Arc::new(
        booking_builder
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Failed to build booking governor config"))?,
    );
    let booking_limiter = booking_gov_conf.limiter().clone();
    spawn_cleanup("booking", move || {
        booking_limiter.retain_recent();
        booking_limiter.len()
    });

    let public = Router::new()
        .merge(seminars::booking_router())
        .merge(reservations::router())
        .merge(surveys::router())
        .layer(GovernorLayer {
            config: booking_gov_conf,
        });

    let api = Router::new()
        .route("/health", get(health::health_check))
        .merge(seminars::router())
        .merge(public)
        .nest(
            "/auth",
            auth::router().layer(GovernorLayer {
                config: auth_gov_conf,
            }),
        )
        .nest("/admin", admin::router());

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .server
                .frontend_url
                .parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid FRONTEND_URL for CORS: {}", e))?,
        )
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::AUTHORIZATION,
            http::header::ACCEPT,
        ])
        .allow_credentials(true);

    Ok(Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api.clone())
        .nest("/api/t/:tenant", api)
        .with_state(state)
        .layer(axum::middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}
