#![allow(dead_code)]

use ecosnap::config::{AuthPolicy, BootstrapAuthority, CookieConfig, JwtConfig, RateLimitConfig};
use ecosnap::middleware::{security_headers_middleware, SecurityHeadersConfig};
use ecosnap::services::bootstrap_authority::ensure_bootstrap_authority;
use ecosnap::store::{
    MemoryIdentityProvider, MemoryImageStore, MemoryProfileStore, MemoryReportStore,
};
use ecosnap::utils::TokenIssuer;
use ecosnap::AppState;
use reqwest::Client;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const AUTHORITY_EMAIL: &str = "council@ecosnap.test";
pub const AUTHORITY_PASSWORD: &str = "council_password_123";

/// Smallest byte string that passes the PNG sniff.
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub struct TestApp {
    pub addr: String,
    pub state: AppState,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

/// Every test gets its own server and its own in-memory stores.
pub async fn spawn_app() -> TestApp {
    let jwt = JwtConfig::new(
        "integration_test_secret_that_is_at_least_32_characters_long".to_string(),
        900,
        3600,
    )
    .expect("valid test JWT config");

    let state = AppState {
        identity: Arc::new(MemoryIdentityProvider::new(4, 3600)),
        profiles: Arc::new(MemoryProfileStore::new()),
        reports: Arc::new(MemoryReportStore::new()),
        images: Arc::new(MemoryImageStore::new()),
        tokens: TokenIssuer::new(&jwt),
        auth: AuthPolicy {
            allow_authority_signup: false,
            bcrypt_cost: 4,
            bootstrap: Some(BootstrapAuthority {
                username: "council".to_string(),
                email: AUTHORITY_EMAIL.to_string(),
                password: AUTHORITY_PASSWORD.to_string(),
            }),
        },
        cookies: CookieConfig::default(),
    };
    ensure_bootstrap_authority(&state)
        .await
        .expect("Failed to bootstrap authority");

    let app = axum::Router::new()
        .merge(ecosnap::routes::create_routes(&RateLimitConfig::disabled()))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::extract::Extension(SecurityHeadersConfig::default()))
        .layer(axum::extract::Extension(state.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        state,
        client: Client::new(),
    }
}

/// Register a helper and return (user_id, token).
pub async fn create_test_user(app: &TestApp, username_prefix: &str) -> (i32, String) {
    let counter = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    let unique_username = format!("{}_{}", username_prefix, counter);

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&serde_json::json!({
            "username": unique_username,
            "email": format!("{}@test.com", unique_username),
            "password": "test_password_123"
        }))
        .send()
        .await
        .expect("Failed to register user");

    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or_else(|e| {
        panic!(
            "Failed to parse register response for user '{}': status={}, error={}",
            unique_username, status, e
        );
    });

    if !body["success"].as_bool().unwrap_or(false) {
        panic!(
            "Failed to register user '{}': status={}, body={}",
            unique_username, status, body
        );
    }

    let user_id = body["data"]["profile"]["id"]
        .as_i64()
        .unwrap_or_else(|| panic!("Response missing profile id: {}", body)) as i32;
    let token = body["data"]["token"]
        .as_str()
        .unwrap_or_else(|| panic!("Response missing token: {}", body))
        .to_string();
    (user_id, token)
}

/// Log in as the bootstrap authority and return (user_id, token).
pub async fn login_authority(app: &TestApp) -> (i32, String) {
    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&serde_json::json!({
            "email": AUTHORITY_EMAIL,
            "password": AUTHORITY_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to log in authority");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("Failed to parse login response");
    let user_id = body["data"]["profile"]["id"].as_i64().unwrap() as i32;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    (user_id, token)
}

/// Upload a PNG and return its reference.
pub async fn upload_test_image(app: &TestApp, token: &str) -> String {
    let part = reqwest::multipart::Part::bytes(PNG_BYTES.to_vec())
        .file_name("litter.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = app
        .client
        .post(app.url("/upload/image"))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to upload image");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("Failed to parse upload response");
    body["data"]["reference"]
        .as_str()
        .expect("Upload response missing reference")
        .to_string()
}

/// Upload a photo, submit a report with it and return the report id.
pub async fn create_test_report(app: &TestApp, token: &str) -> i32 {
    let image_ref = upload_test_image(app, token).await;

    let resp = app
        .client
        .post(app.url("/reports"))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "description": "Overflowing bins behind the bus station",
            "location": "Station Road",
            "latitude": 52.2053,
            "longitude": 0.1218,
            "image_ref": image_ref
        }))
        .send()
        .await
        .expect("Failed to create report");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse report response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to create report: status={}, body={}", status, body);
    }
    body["data"]["id"].as_i64().expect("Report response missing id") as i32
}
