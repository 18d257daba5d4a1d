use std::env;

#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// Whether sign-up may pick the AUTHORITY role. Off by default; authorities
    /// are normally provisioned through `BOOTSTRAP_AUTHORITY_*`.
    pub allow_authority_signup: bool,
    pub bcrypt_cost: u32,
    pub bootstrap: Option<BootstrapAuthority>,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            allow_authority_signup: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            bootstrap: None,
        }
    }
}

impl AuthPolicy {
    pub fn from_env() -> Self {
        let bcrypt_cost: u32 = super::parsed_env("BCRYPT_COST", bcrypt::DEFAULT_COST);
        if !(4..=31).contains(&bcrypt_cost) {
            tracing::warn!(
                "BCRYPT_COST {} out of range 4..=31, using default",
                bcrypt_cost
            );
        }

        Self {
            allow_authority_signup: super::bool_env("ALLOW_AUTHORITY_SIGNUP", false),
            bcrypt_cost: if (4..=31).contains(&bcrypt_cost) {
                bcrypt_cost
            } else {
                bcrypt::DEFAULT_COST
            },
            bootstrap: BootstrapAuthority::from_env(),
        }
    }
}

/// Authority account created at startup when none exists yet.
#[derive(Debug, Clone)]
pub struct BootstrapAuthority {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl BootstrapAuthority {
    pub fn from_env() -> Option<Self> {
        if !super::bool_env("BOOTSTRAP_AUTHORITY_ENABLED", false) {
            return None;
        }

        Some(Self {
            username: env::var("BOOTSTRAP_AUTHORITY_USERNAME").ok()?,
            email: env::var("BOOTSTRAP_AUTHORITY_EMAIL").ok()?,
            password: env::var("BOOTSTRAP_AUTHORITY_PASSWORD").ok()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub secure: bool,
    pub same_site: &'static str,
    pub domain: Option<String>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: false,
            same_site: "Lax",
            domain: None,
        }
    }
}

impl CookieConfig {
    pub fn from_env() -> Self {
        let same_site = parse_same_site(
            &env::var("AUTH_COOKIE_SAMESITE").unwrap_or_else(|_| "Lax".to_string()),
        );
        let domain = env::var("AUTH_COOKIE_DOMAIN")
            .ok()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        // SameSite=None is only honoured together with Secure.
        let secure = same_site == "None" || super::bool_env("AUTH_COOKIE_SECURE", false);

        Self {
            secure,
            same_site,
            domain,
        }
    }
}

fn parse_same_site(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "none" => "None",
        _ => "Lax",
    }
}
