use crate::{
    config::AuthPolicy,
    domain::{Profile, Role, Session},
    error::{AppError, AppResult},
    state::AppState,
    store::{IdentityProvider, ProfileStore},
    utils::{TokenIssuer, TokenKind, TokenPair},
};
use std::sync::Arc;

/// A freshly opened session and who it belongs to.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub profile: Profile,
    pub session: Session,
    pub tokens: TokenPair,
}

pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    tokens: TokenIssuer,
    policy: AuthPolicy,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self::with_policy(state, state.auth.clone())
    }

    pub fn with_policy(state: &AppState, policy: AuthPolicy) -> Self {
        Self {
            identity: state.identity.clone(),
            profiles: state.profiles.clone(),
            tokens: state.tokens.clone(),
            policy,
        }
    }

    /// Create an account plus its profile and sign it in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
        role: Role,
    ) -> AppResult<SignedIn> {
        if role == Role::Authority && !self.policy.allow_authority_signup {
            return Err(AppError::Forbidden);
        }
        if self.profiles.get_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let identity = self.identity.sign_up(email, password).await?;
        let profile = match self.profiles.create(identity.id, username, role).await {
            Ok(profile) => profile,
            Err(err) => {
                // no account without a profile
                if let Err(cleanup) = self.identity.remove_account(identity.id).await {
                    tracing::error!(
                        account_id = identity.id,
                        error = %cleanup,
                        "failed to remove account after profile creation failed"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(user_id = profile.id, role = %profile.role, "account registered");
        self.open(profile).await
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<SignedIn> {
        let identity = self.identity.sign_in(email, password).await?;
        let profile = self.profiles.get_by_id(identity.id).await.map_err(|e| match e {
            AppError::NotFound => AppError::Unauthorized,
            other => other,
        })?;
        self.open(profile).await
    }

    /// Exchange a refresh token for a new session. The old session is closed.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<SignedIn> {
        let claims = self
            .tokens
            .decode(refresh_token, TokenKind::Refresh)
            .map_err(|_| AppError::Unauthorized)?;
        let session = claims.session()?;

        let identity = self
            .identity
            .current_user(&session)
            .await?
            .ok_or(AppError::Unauthorized)?;
        self.identity.sign_out(&session).await?;

        let profile = self.profiles.get_by_id(identity.id).await?;
        self.open(profile).await
    }

    pub async fn logout(&self, session: &Session) -> AppResult<()> {
        self.identity.sign_out(session).await
    }

    async fn open(&self, profile: Profile) -> AppResult<SignedIn> {
        let session = self.identity.open_session(profile.id).await?;
        let tokens = self.tokens.issue(&session)?;
        Ok(SignedIn {
            profile,
            session,
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CookieConfig, JwtConfig};
    use crate::store::{
        MemoryIdentityProvider, MemoryImageStore, MemoryProfileStore, MemoryReportStore,
    };

    fn state(policy: AuthPolicy) -> AppState {
        let jwt = JwtConfig::new(
            "test_secret_key_that_is_long_enough_for_tests".to_string(),
            900,
            3600,
        )
        .unwrap();
        AppState {
            identity: Arc::new(MemoryIdentityProvider::new(4, 3600)),
            profiles: Arc::new(MemoryProfileStore::new()),
            reports: Arc::new(MemoryReportStore::new()),
            images: Arc::new(MemoryImageStore::new()),
            tokens: TokenIssuer::new(&jwt),
            auth: policy,
            cookies: CookieConfig::default(),
        }
    }

    fn open_policy() -> AuthPolicy {
        AuthPolicy {
            bcrypt_cost: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn register_starts_at_zero_points() {
        let state = state(open_policy());
        let service = AuthService::new(&state);
        let signed_in = service
            .register("hana@example.org", "password123", "hana", Role::Helper)
            .await
            .unwrap();

        assert_eq!(signed_in.profile.points, 0);
        assert_eq!(signed_in.profile.progression().level, 1);
        let claims = state
            .tokens
            .decode(&signed_in.tokens.access_token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.session().unwrap(), signed_in.session);
    }

    #[tokio::test]
    async fn authority_signup_is_refused_by_default() {
        let state = state(open_policy());
        let result = AuthService::new(&state)
            .register("boss@example.org", "password123", "boss", Role::Authority)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
        assert!(state.identity.sign_in("boss@example.org", "password123").await.is_err());
    }

    #[tokio::test]
    async fn taken_username_leaves_no_account() {
        let state = state(open_policy());
        let service = AuthService::new(&state);
        service
            .register("one@example.org", "password123", "hana", Role::Helper)
            .await
            .unwrap();

        let result = service
            .register("two@example.org", "password123", "hana", Role::Helper)
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(state.identity.sign_in("two@example.org", "password123").await.is_err());
    }

    #[tokio::test]
    async fn refresh_rotates_the_session() {
        let state = state(open_policy());
        let service = AuthService::new(&state);
        let first = service
            .register("hana@example.org", "password123", "hana", Role::Helper)
            .await
            .unwrap();

        let second = service.refresh(&first.tokens.refresh_token).await.unwrap();
        assert_ne!(first.session.id, second.session.id);
        assert_eq!(state.identity.current_user(&first.session).await.unwrap(), None);

        // the old refresh token is spent
        assert!(matches!(
            service.refresh(&first.tokens.refresh_token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn access_token_cannot_refresh() {
        let state = state(open_policy());
        let service = AuthService::new(&state);
        let signed_in = service
            .register("hana@example.org", "password123", "hana", Role::Helper)
            .await
            .unwrap();
        assert!(matches!(
            service.refresh(&signed_in.tokens.access_token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn failed_profile_creation_removes_the_account() {
        let state = state(open_policy());
        // occupy the id the next account will get
        state.profiles.create(1, "ghost", Role::Helper).await.unwrap();

        let result = AuthService::new(&state)
            .register("hana@example.org", "password123", "hana", Role::Helper)
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(state.identity.sign_in("hana@example.org", "password123").await.is_err());
    }
}
