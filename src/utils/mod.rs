pub mod cookie;
pub mod jwt;
pub mod password;

pub use jwt::{TokenIssuer, TokenKind, TokenPair};
pub use password::{hash_password, verify_password};
