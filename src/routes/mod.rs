use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth_middleware;
use crate::services::upload::MAX_FILE_SIZE;
use axum::{extract::DefaultBodyLimit, middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

/// Multipart framing on top of the largest accepted image.
const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE + 64 * 1024;

pub fn create_routes(rate_limit: &RateLimitConfig) -> Router {
    Router::new()
        .route("/", routing::get(handlers::health::health_check))
        .nest("/api/v1", api_routes(rate_limit))
}

fn api_routes(config: &RateLimitConfig) -> Router {
    let auth = auth_routes(config);
    let public_read = public_read_routes(config);
    let protected = protected_routes(config).layer(middleware::from_fn(auth_middleware));

    auth.merge(public_read).merge(protected)
}

/// Sign-up, sign-in and token refresh.
fn auth_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/register", routing::post(handlers::register))
        .route("/auth/login", routing::post(handlers::login))
        .route(
            "/auth/refresh",
            routing::post(handlers::auth::refresh_token),
        );

    with_optional_rate_limit(router, config.enabled, config.auth)
}

fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/levels", routing::get(handlers::profile::list_levels))
        .route(
            "/profiles/{id}",
            routing::get(handlers::profile::get_profile),
        );

    with_optional_rate_limit(router, config.enabled, config.api)
}

/// Everything behind a session. Role checks happen in the report lifecycle.
fn protected_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Auth
        .route("/auth/me", routing::get(handlers::get_current_user))
        .route("/auth/logout", routing::post(handlers::auth::logout))
        .route("/auth/profile", routing::put(handlers::update_profile))
        // Stats
        .route("/stats/me", routing::get(handlers::stats::my_stats))
        // Upload
        .route(
            "/upload/image",
            routing::post(handlers::upload::upload_image)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Reports
        .route(
            "/reports",
            routing::get(handlers::report::list_reports).post(handlers::report::create_report),
        )
        .route("/reports/{id}", routing::get(handlers::report::get_report))
        .route(
            "/reports/{id}/resolve",
            routing::put(handlers::report::resolve_report),
        );

    with_optional_rate_limit(router, config.enabled, config.api)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
        .expect("Invalid rate limit configuration");

    router.layer(GovernorLayer::new(governor_conf))
}
