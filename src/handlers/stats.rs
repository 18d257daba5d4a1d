use crate::error::AppResult;
use crate::handlers::auth::current_profile;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::stats::{StatsService, UserStats};
use crate::state::AppState;
use axum::{response::IntoResponse, Extension};

#[utoipa::path(
    get,
    path = "/api/v1/stats/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Helper or authority dashboard numbers", body = UserStats),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "stats"
)]
pub async fn my_stats(
    Extension(state): Extension<AppState>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let profile = current_profile(&state, &auth_user).await?;
    let stats = StatsService::new(&state).for_profile(&profile).await?;
    Ok(ApiResponse::ok(stats))
}
