//! Authentication primitives: password hashing, session tokens and OAuth
//! ID-token verification. The HTTP extractors built on these live in
//! `api::extract`.

/// OAuth identity verification
pub mod oauth;
/// Argon2 password hashing
pub mod password;
/// Session token issue and verification
pub mod token;

pub use oauth::{ExternalIdentity, GoogleTokenVerifier, IdentityVerifier};
pub use token::{Claims, IssuedToken, TokenIssuer};
