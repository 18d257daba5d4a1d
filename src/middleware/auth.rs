use crate::{
    domain::Session,
    error::AppError,
    state::AppState,
    utils::{
        cookie::{extract_cookie, ACCESS_TOKEN_COOKIE},
        TokenKind,
    },
};
use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};

/// The caller behind a verified access token whose session is still open.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i32,
    pub session: Session,
}

/// JWT authentication middleware
///
/// Verifies the access token (Authorization header first, then the HttpOnly
/// cookie), asks the identity provider whether its session is still open,
/// and adds `AuthUser` to request extensions.
pub async fn auth_middleware(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers)
        .or_else(|| extract_cookie(&headers, ACCESS_TOKEN_COOKIE))
        .ok_or(AppError::Unauthorized)?;

    let claims = state
        .tokens
        .decode(&token, TokenKind::Access)
        .map_err(|_| AppError::Unauthorized)?;
    let session = claims.session()?;

    // signed-out sessions stay dead even while the JWT is unexpired
    let identity = state
        .identity
        .current_user(&session)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser {
        user_id: identity.id,
        session,
    });

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}
