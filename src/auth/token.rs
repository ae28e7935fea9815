//! Session tokens.
//!
//! Tokens are HS256 JWTs carrying the user id, email and role at issue time.
//! The API reloads the user on every request, so the role claim is only
//! informational for clients.

use crate::entities::{Role, UserModel};
use crate::errors::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Email at issue time
    pub email: String,
    /// Role at issue time
    pub role: Role,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

impl Claims {
    /// Parses the subject back into a user id.
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| Error::unauthorized("Malformed token subject"))
    }
}

/// A freshly issued token with its expiry
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies session tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
}

impl TokenIssuer {
    /// Creates an issuer signing with `secret`, tokens valid for `ttl_hours`.
    ///
    /// # Errors
    /// `Config` when `ttl_hours` does not fit in a duration.
    pub fn new(secret: &str, ttl_hours: i64) -> Result<Self> {
        let ttl = TimeDelta::try_hours(ttl_hours).ok_or_else(|| Error::Config {
            message: format!("Token lifetime of {ttl_hours} hours is out of range"),
        })?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Issues a token for `user`.
    pub fn issue(&self, user: &UserModel) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::Config {
                message: "Token expiry is out of range".to_string(),
            })?;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verifies signature and expiry. Any failure is `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| Error::unauthorized(format!("Invalid session token: {e}")))
    }
}
