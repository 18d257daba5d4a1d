use axum::{extract::Extension, Router};
use ecosnap::config::{AppConfig, StorageBackend};
use ecosnap::middleware::{security_headers_middleware, SecurityHeadersConfig};
use ecosnap::services::bootstrap_authority::ensure_bootstrap_authority;
use ecosnap::{config, migration, routes, AppState};
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        ecosnap::handlers::health::health_check,
        // Auth routes
        ecosnap::handlers::auth::register,
        ecosnap::handlers::auth::login,
        ecosnap::handlers::auth::refresh_token,
        ecosnap::handlers::auth::logout,
        ecosnap::handlers::auth::get_current_user,
        ecosnap::handlers::auth::update_profile,
        // Profile routes
        ecosnap::handlers::profile::get_profile,
        ecosnap::handlers::profile::list_levels,
        // Stats
        ecosnap::handlers::stats::my_stats,
        // Upload
        ecosnap::handlers::upload::upload_image,
        // Report routes
        ecosnap::handlers::report::create_report,
        ecosnap::handlers::report::list_reports,
        ecosnap::handlers::report::get_report,
        ecosnap::handlers::report::resolve_report,
    ),
    components(
        schemas(
            ecosnap::response::ApiResponse<serde_json::Value>,
            ecosnap::response::PaginatedResponse<serde_json::Value>,
            ecosnap::response::PaginationQuery,
            ecosnap::error::AppError,
            ecosnap::domain::Role,
            ecosnap::domain::ReportStatus,
            ecosnap::domain::LevelInfo,
            ecosnap::domain::Progression,
            // Auth
            ecosnap::handlers::auth::RegisterRequest,
            ecosnap::handlers::auth::LoginRequest,
            ecosnap::handlers::auth::RefreshTokenRequest,
            ecosnap::handlers::auth::UpdateProfileRequest,
            ecosnap::handlers::auth::AuthResponse,
            // Profile
            ecosnap::handlers::profile::ProfileResponse,
            // Stats
            ecosnap::services::stats::UserStats,
            // Upload
            ecosnap::handlers::upload::UploadResponse,
            // Report
            ecosnap::handlers::report::CreateReportRequest,
            ecosnap::handlers::report::ListReportsQuery,
            ecosnap::handlers::report::ReportResponse,
            ecosnap::handlers::report::ResolveResponse,
        )
    ),
    modifiers(&JwtSecurity),
    tags(
        (name = "auth", description = "Sign-up, sessions and the caller's profile"),
        (name = "profiles", description = "Public profiles and the level table"),
        (name = "reports", description = "Report submission, listing and resolution"),
        (name = "stats", description = "Per-role dashboard numbers"),
        (name = "upload", description = "Report photo upload"),
    )
)]
struct ApiDoc;

struct JwtSecurity;

impl Modify for JwtSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    // Validate configuration before doing anything else
    let config = AppConfig::from_env()?;
    std::fs::create_dir_all(&config.upload.upload_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to create upload directory '{}': {}",
            config.upload.upload_dir,
            e
        )
    })?;

    tracing::info!("Starting EcoSnap API v{}...", env!("CARGO_PKG_VERSION"));

    let state = match config.backend {
        StorageBackend::Postgres => {
            let db_config = config
                .database
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("database configuration missing"))?;
            let db = config::database::connect(db_config).await?;
            tracing::info!("Database connected successfully");

            migration::Migrator::up(&db, None).await?;
            tracing::info!("Database migrations applied successfully");

            AppState::postgres(db, &config)
        }
        StorageBackend::Memory => {
            tracing::warn!("STORAGE_BACKEND=memory: data is lost on restart");
            AppState::in_memory(&config)
        }
    };

    ensure_bootstrap_authority(&state).await?;

    let app = create_app(&config)
        .layer(Extension(state))
        .layer(Extension(SecurityHeadersConfig::from_env()));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ecosnap=debug,tower_http=debug,axum=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_cors_layer(origins_str: &str) -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins).allow_credentials(true)
    }
}

fn create_app(config: &AppConfig) -> Router {
    Router::new()
        .merge(routes::create_routes(&config.rate_limit))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/uploads", ServeDir::new(&config.upload.upload_dir))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
