pub mod auth;
pub mod security;

pub use auth::{auth_middleware, AuthUser};
pub use security::{security_headers_middleware, SecurityHeadersConfig};
