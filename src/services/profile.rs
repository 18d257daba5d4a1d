use crate::{
    domain::{Actor, Profile},
    error::{AppError, AppResult},
    state::AppState,
    store::ProfileStore,
};
use std::sync::Arc;

const MAX_BIO_CHARS: usize = 500;

pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileService {
    pub fn new(state: &AppState) -> Self {
        Self {
            profiles: state.profiles.clone(),
        }
    }

    pub async fn get(&self, id: i32) -> AppResult<Profile> {
        self.profiles.get_by_id(id).await
    }

    /// The signed-in user as an actor for lifecycle operations.
    pub async fn actor(&self, user_id: i32) -> AppResult<Actor> {
        match self.profiles.get_by_id(user_id).await {
            Ok(profile) => Ok(profile.actor()),
            // a session whose profile is gone
            Err(AppError::NotFound) => Err(AppError::Unauthorized),
            Err(err) => Err(err),
        }
    }

    /// Blank clears the bio.
    pub async fn update_bio(&self, user_id: i32, bio: Option<String>) -> AppResult<Profile> {
        let bio = bio
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        if let Some(text) = &bio {
            if text.chars().count() > MAX_BIO_CHARS {
                return Err(AppError::Validation(format!(
                    "bio must be at most {} characters",
                    MAX_BIO_CHARS
                )));
            }
        }

        self.profiles.update_bio(user_id, bio).await
    }
}
