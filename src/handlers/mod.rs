pub mod auth;
pub mod health;
pub mod profile;
pub mod report;
pub mod stats;
pub mod upload;

pub use auth::*;
