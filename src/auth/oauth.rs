//! OAuth sign-in.
//!
//! The client completes the provider's authorization flow itself and posts
//! the resulting ID token. An [`IdentityVerifier`] checks that token and
//! yields the external identity, which `core::user::sign_in_with_oauth` maps
//! onto a local user.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Identity asserted by a verified provider token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Provider name, e.g. `"google"`
    pub provider: String,
    /// Stable subject id at the provider
    pub subject: String,
    /// Verified email address
    pub email: String,
    /// Display name, when the provider shares one
    pub name: Option<String>,
}

/// Verifies ID tokens from one OAuth provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Provider name used in the route and stored on linked accounts
    fn provider(&self) -> &'static str;

    /// Verifies `id_token` and returns the identity it asserts.
    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity>;
}

const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct GoogleIdTokenClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwkKey {
    kid: String,
    n: String,
    e: String,
    kty: String,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

struct JwksCache {
    keys: HashMap<String, JwkKey>,
    fetched_at: Instant,
}

/// Google ID token verifier with JWKS caching
#[derive(Clone)]
pub struct GoogleTokenVerifier {
    client: Client,
    client_id: String,
    cache: Arc<RwLock<Option<JwksCache>>>,
}

impl GoogleTokenVerifier {
    #[must_use]
    pub fn new(client_id: String) -> Self {
        Self {
            client: Client::new(),
            client_id,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < JWKS_CACHE_TTL {
                    if let Some(key) = cached.keys.get(kid) {
                        return jwk_to_decoding_key(key);
                    }
                }
            }
        }

        tracing::debug!("Refreshing Google JWKS");
        let jwks: JwksResponse = self
            .client
            .get(GOOGLE_JWKS_URL)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| provider_error(format!("Failed to fetch JWKS: {e}")))?
            .json()
            .await
            .map_err(|e| provider_error(format!("Failed to parse JWKS: {e}")))?;

        let keys: HashMap<String, JwkKey> = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();
        let decoding_key = keys
            .get(kid)
            .ok_or_else(|| Error::unauthorized(format!("Unknown signing key '{kid}'")))
            .and_then(jwk_to_decoding_key)?;

        *self.cache.write().await = Some(JwksCache {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(decoding_key)
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    fn provider(&self) -> &'static str {
        "google"
    }

    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity> {
        let header = decode_header(id_token)
            .map_err(|e| Error::unauthorized(format!("Invalid token header: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| Error::unauthorized("Token missing kid header"))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(GOOGLE_ISSUERS);

        let claims = decode::<GoogleIdTokenClaims>(id_token, &key, &validation)
            .map_err(|e| Error::unauthorized(format!("Google token rejected: {e}")))?
            .claims;

        let email = claims
            .email
            .ok_or_else(|| Error::unauthorized("Token missing email claim"))?;
        if claims.email_verified != Some(true) {
            return Err(Error::unauthorized("Email not verified"));
        }

        Ok(ExternalIdentity {
            provider: self.provider().to_string(),
            subject: claims.sub,
            email,
            name: claims.name,
        })
    }
}

fn jwk_to_decoding_key(key: &JwkKey) -> Result<DecodingKey> {
    if key.kty != "RSA" {
        return Err(provider_error(format!("Unsupported key type: {}", key.kty)));
    }
    DecodingKey::from_rsa_components(&key.n, &key.e)
        .map_err(|e| provider_error(format!("Failed to create decoding key: {e}")))
}

fn provider_error(message: String) -> Error {
    Error::IdentityProvider { message }
}
