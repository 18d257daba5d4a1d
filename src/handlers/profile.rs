use crate::domain::progression::{levels, LevelInfo};
use crate::domain::{Profile, Role};
use crate::error::{AppError, AppResult};
use crate::response::ApiResponse;
use crate::services::profile::ProfileService;
use crate::state::AppState;
use axum::{extract::Path, response::IntoResponse, Extension};
use serde::Serialize;
use utoipa::ToSchema;

/// A profile with its derived progression. Level and title are computed from
/// `points` on every response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub points: i32,
    /// 1..=10
    pub level: u8,
    pub title: String,
    /// Progress through the current level, 0..=100
    pub progress_percent: u8,
    /// XP missing to reach the next level; 0 at the top tier
    pub xp_to_next_level: i64,
    pub bio: Option<String>,
    pub created_at: String,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        let progression = profile.progression();
        Self {
            id: profile.id,
            username: profile.username,
            role: profile.role,
            points: profile.points,
            level: progression.level,
            title: progression.title.to_string(),
            progress_percent: progression.progress_percent,
            xp_to_next_level: progression.xp_to_next_level,
            bio: profile.bio,
            created_at: profile.created_at.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}",
    params(("id" = i32, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Public profile", body = ProfileResponse),
        (status = 404, description = "Profile not found", body = AppError),
    ),
    tag = "profiles"
)]
pub async fn get_profile(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let profile = ProfileService::new(&state).get(id).await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

#[utoipa::path(
    get,
    path = "/api/v1/levels",
    responses(
        (status = 200, description = "The level/title table", body = Vec<LevelInfo>),
    ),
    tag = "profiles"
)]
pub async fn list_levels() -> impl IntoResponse {
    ApiResponse::ok(levels().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_carries_derived_progression() {
        let now = chrono::Utc::now().naive_utc();
        let response = ProfileResponse::from(Profile {
            id: 3,
            username: "hana".to_string(),
            role: Role::Helper,
            points: 100,
            bio: None,
            created_at: now,
            updated_at: now,
        });
        assert_eq!(response.level, 2);
        assert_eq!(response.title, "Litter Spotter");
        assert_eq!(response.progress_percent, 0);
        assert_eq!(response.xp_to_next_level, 125);
    }
}
