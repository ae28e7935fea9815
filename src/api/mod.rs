//! HTTP API - axum router, shared state and handlers.
//!
//! Handlers stay thin: they extract the authenticated user, call into
//! [`crate::core`] and serialize the result. Errors become JSON responses in
//! [`error`].

use crate::auth::{GoogleTokenVerifier, IdentityVerifier, TokenIssuer};
use crate::config::settings::Settings;
use crate::errors::Result;
use axum::{Json, Router, middleware, routing::get};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod admin;
mod auth;
pub mod error;
pub mod extract;
mod inventories;
mod items;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Database pool
    pub db: DatabaseConnection,
    /// Session token issuer and verifier
    pub tokens: TokenIssuer,
    /// Identity verifiers keyed by provider name
    pub identity_verifiers: Arc<HashMap<&'static str, Arc<dyn IdentityVerifier>>>,
    /// Include underlying error text in 5xx bodies
    pub expose_error_details: bool,
}

impl AppState {
    /// State with no identity providers and error details hidden.
    #[must_use]
    pub fn new(db: DatabaseConnection, tokens: TokenIssuer) -> Self {
        Self {
            db,
            tokens,
            identity_verifiers: Arc::new(HashMap::new()),
            expose_error_details: false,
        }
    }

    /// Builds the state from loaded settings. Google sign-in is enabled when a
    /// client id is configured.
    ///
    /// # Errors
    /// `Config` when the token lifetime is out of range.
    pub fn from_settings(db: DatabaseConnection, settings: &Settings) -> Result<Self> {
        let tokens = TokenIssuer::new(&settings.auth.jwt_secret, settings.auth.token_ttl_hours)?;
        let mut state = Self::new(db, tokens);
        state.expose_error_details = settings.expose_error_details;
        if let Some(client_id) = &settings.auth.google_client_id {
            state = state.with_identity_verifier(Arc::new(GoogleTokenVerifier::new(client_id.clone())));
        }
        Ok(state)
    }

    /// Registers a verifier under its provider name.
    #[must_use]
    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        let mut verifiers = (*self.identity_verifiers).clone();
        verifiers.insert(verifier.provider(), verifier);
        self.identity_verifiers = Arc::new(verifiers);
        self
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(items::routes())
        .merge(inventories::routes())
        .nest("/admin", admin::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::attach_error_detail,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
