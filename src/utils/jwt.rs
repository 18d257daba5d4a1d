use crate::config::JwtConfig;
use crate::domain::Session;
use crate::error::{AppError, AppResult};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub sid: Uuid,   // session id
    pub exp: usize,
    pub iat: usize,
    pub token_type: TokenKind,
}

impl Claims {
    pub fn session(&self) -> AppResult<Session> {
        let user_id = self.sub.parse().map_err(|_| AppError::Unauthorized)?;
        Ok(Session {
            id: self.sid,
            user_id,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies session tokens. Cheap to clone; lives in `AppState`.
#[derive(Clone)]
pub struct TokenIssuer {
    inner: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: u64,
    refresh_ttl: u64,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            inner: Arc::new(Keys {
                encoding: EncodingKey::from_secret(config.secret.as_bytes()),
                decoding: DecodingKey::from_secret(config.secret.as_bytes()),
                access_ttl: config.access_token_expiry,
                refresh_ttl: config.refresh_token_expiry,
            }),
        }
    }

    pub fn access_ttl(&self) -> u64 {
        self.inner.access_ttl
    }

    pub fn refresh_ttl(&self) -> u64 {
        self.inner.refresh_ttl
    }

    pub fn issue(&self, session: &Session) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.encode(session, TokenKind::Access)?,
            refresh_token: self.encode(session, TokenKind::Refresh)?,
        })
    }

    fn encode(&self, session: &Session, kind: TokenKind) -> AppResult<String> {
        let now = chrono::Utc::now().timestamp() as usize;
        let ttl = match kind {
            TokenKind::Access => self.inner.access_ttl,
            TokenKind::Refresh => self.inner.refresh_ttl,
        };
        let claims = Claims {
            sub: session.user_id.to_string(),
            sid: session.id,
            exp: now + ttl as usize,
            iat: now,
            token_type: kind,
        };

        Ok(encode(&Header::default(), &claims, &self.inner.encoding)?)
    }

    /// Verify signature and expiry, and that the token is of the expected kind.
    pub fn decode(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let claims = decode::<Claims>(token, &self.inner.decoding, &Validation::default())?.claims;
        if claims.token_type != expected {
            return Err(AppError::Unauthorized);
        }
        Ok(claims)
    }
}
