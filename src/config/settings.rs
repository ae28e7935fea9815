//! Service settings.
//!
//! Settings come from an optional TOML file (`CONFIG_PATH`, default
//! `./config.toml`) and are then overridden by environment variables, which
//! `main` loads from `.env` first. Secrets are expected to come from the
//! environment.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Shortest accepted JWT signing secret, in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Longest accepted session token lifetime: ten years
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP listener settings
    pub server: ServerSettings,
    /// Database connection URL
    pub database_url: String,
    /// Token and identity provider settings
    pub auth: AuthSettings,
    /// Admin account created or promoted at startup
    pub bootstrap_admin: Option<BootstrapAdmin>,
    /// Include underlying error text in 5xx response bodies (non-production only)
    pub expose_error_details: bool,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind, e.g. `0.0.0.0:3000`
    pub bind_addr: String,
}

/// Authentication settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HMAC secret for session tokens
    pub jwt_secret: String,
    /// Session token lifetime in hours
    pub token_ttl_hours: i64,
    /// OAuth client id for Google sign-in; Google sign-in is disabled when unset
    pub google_client_id: Option<String>,
}

// The secret stays out of logs.
impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("google_client_id", &self.google_client_id)
            .finish()
    }
}

/// Credentials of the admin ensured at startup
#[derive(Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthSettings::default(),
            bootstrap_admin: None,
            expose_error_details: false,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: 24,
            google_client_id: None,
        }
    }
}

impl Settings {
    /// Checks values that serde defaults cannot guarantee.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(Error::Config {
                message: format!(
                    "JWT_SECRET must be set and at least {MIN_JWT_SECRET_LEN} bytes long"
                ),
            });
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(Error::Config {
                message: format!("token_ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
            });
        }
        Ok(())
    }

    /// Applies overrides read through `lookup`, normally `std::env::var`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(ttl) = lookup("TOKEN_TTL_HOURS") {
            self.auth.token_ttl_hours = ttl.parse().map_err(|e| Error::Config {
                message: format!("Invalid TOKEN_TTL_HOURS '{ttl}': {e}"),
            })?;
        }
        if let Some(client_id) = lookup("GOOGLE_CLIENT_ID").filter(|s| !s.is_empty()) {
            self.auth.google_client_id = Some(client_id);
        }
        if let Some(flag) = lookup("EXPOSE_ERROR_DETAILS") {
            self.expose_error_details = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        // Admin bootstrap needs both email and password
        if let (Some(email), Some(password)) = (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            let name = lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string());
            self.bootstrap_admin = Some(BootstrapAdmin {
                name,
                email,
                password,
            });
        }
        Ok(())
    }
}

/// Parses settings from a TOML file.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings the way the server does at startup: TOML file if present,
/// then the process environment, then validation.
pub fn load_from_env() -> Result<Settings> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let mut settings = if Path::new(&path).exists() {
        tracing::debug!("Loading settings from {}", path);
        load_settings(&path)?
    } else {
        tracing::debug!("No settings file at {}, using defaults", path);
        Settings::default()
    };

    settings.apply_env(|key| std::env::var(key).ok())?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_parse_settings() {
        let toml_str = r#"
            database_url = "sqlite::memory:"
            expose_error_details = true

            [server]
            bind_addr = "127.0.0.1:8080"

            [auth]
            token_ttl_hours = 8

            [bootstrap_admin]
            name = "Ops"
            email = "ops@example.com"
            password = "correct horse"
        "#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.auth.token_ttl_hours, 8);
        assert!(settings.auth.google_client_id.is_none());
        assert!(settings.expose_error_details);
        assert_eq!(settings.bootstrap_admin.unwrap().email, "ops@example.com");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(settings.server.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.auth.token_ttl_hours, 24);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("JWT_SECRET", SECRET),
            ("TOKEN_TTL_HOURS", "2"),
            ("GOOGLE_CLIENT_ID", "client.apps.googleusercontent.com"),
            ("ADMIN_EMAIL", "root@example.com"),
            ("ADMIN_PASSWORD", "hunter22"),
        ]);
        let mut settings = Settings::default();
        settings
            .apply_env(|key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(settings.auth.jwt_secret, SECRET);
        assert_eq!(settings.auth.token_ttl_hours, 2);
        assert_eq!(
            settings.auth.google_client_id.as_deref(),
            Some("client.apps.googleusercontent.com")
        );
        let admin = settings.bootstrap_admin.unwrap();
        assert_eq!(admin.name, "Administrator");
        assert_eq!(admin.email, "root@example.com");
    }

    #[test]
    fn test_invalid_ttl_is_config_error() {
        let mut settings = Settings::default();
        let result = settings.apply_env(|key| (key == "TOKEN_TTL_HOURS").then(|| "soon".to_string()));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut settings = Settings::default();
        assert!(matches!(settings.validate(), Err(Error::Config { .. })));

        settings.auth.jwt_secret = SECRET.to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_token_lifetime() {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = SECRET.to_string();

        settings.auth.token_ttl_hours = 0;
        assert!(matches!(settings.validate(), Err(Error::Config { .. })));

        settings.auth.token_ttl_hours = 3_000_000_000;
        assert!(matches!(settings.validate(), Err(Error::Config { .. })));

        settings.auth.token_ttl_hours = MAX_TOKEN_TTL_HOURS;
        assert!(settings.validate().is_ok());
    }
}
