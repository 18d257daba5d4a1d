pub mod auth;
pub mod bootstrap_authority;
pub mod lifecycle;
pub mod profile;
pub mod stats;
pub mod upload;
