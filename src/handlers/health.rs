use crate::domain::Role;
use crate::state::AppState;
use axum::{response::IntoResponse, Extension, Json};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
pub async fn health_check(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let store_ok = match state.profiles.count_by_role(Role::Authority).await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!("health check store query failed: {}", err);
            false
        }
    };

    let status = if store_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "EcoSnap API",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": store_ok,
    }))
}
