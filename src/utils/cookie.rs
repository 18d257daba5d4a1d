use crate::config::CookieConfig;
use axum::http::{header, HeaderMap};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

fn attributes(config: &CookieConfig) -> String {
    let mut attrs = format!("Path=/; HttpOnly; SameSite={}", config.same_site);
    if config.secure {
        attrs.push_str("; Secure");
    }
    if let Some(domain) = &config.domain {
        attrs.push_str("; Domain=");
        attrs.push_str(domain);
    }
    attrs
}

pub fn build_auth_cookie(
    config: &CookieConfig,
    name: &str,
    value: &str,
    max_age_seconds: u64,
) -> String {
    format!(
        "{name}={value}; Max-Age={max_age_seconds}; {}",
        attributes(config)
    )
}

pub fn build_clear_cookie(config: &CookieConfig, name: &str) -> String {
    format!(
        "{name}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}",
        attributes(config)
    )
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn auth_cookie_is_http_only() {
        let cookie = build_auth_cookie(&CookieConfig::default(), "access_token", "abc", 900);
        assert!(cookie.starts_with("access_token=abc; Max-Age=900;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn secure_and_domain_are_appended() {
        let config = CookieConfig {
            secure: true,
            same_site: "None",
            domain: Some("eco.example.org".to_string()),
        };
        let cookie = build_clear_cookie(&config, "refresh_token");
        assert!(cookie.starts_with("refresh_token=; Max-Age=0;"));
        assert!(cookie.contains("; Secure"));
        assert!(cookie.ends_with("Domain=eco.example.org"));
    }

    #[test]
    fn extracts_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=tok123; other=1"),
        );
        assert_eq!(
            extract_cookie(&headers, ACCESS_TOKEN_COOKIE),
            Some("tok123".to_string())
        );
        assert_eq!(extract_cookie(&headers, REFRESH_TOKEN_COOKIE), None);
    }
}
