use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry: u64,  // seconds, default 15 minutes
    pub refresh_token_expiry: u64, // seconds, default 7 days
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable must be set"))?;

        Self::new(
            secret,
            super::parsed_env("JWT_ACCESS_EXPIRATION", 900),
            super::parsed_env("JWT_REFRESH_EXPIRATION", 604_800),
        )
    }

    pub fn new(secret: String, access_token_expiry: u64, refresh_token_expiry: u64) -> Result<Self> {
        if secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters"
            ));
        }
        if access_token_expiry == 0 || refresh_token_expiry == 0 {
            return Err(anyhow::anyhow!("token expirations must be positive"));
        }

        Ok(Self {
            secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}
