//! Shared test utilities for `stock-count`.
//!
//! Helpers for setting up an in-memory database, creating users, items and
//! inventories with sensible defaults, and driving the HTTP API.

use crate::{
    api::{AppState, router},
    auth::{ExternalIdentity, IdentityVerifier, TokenIssuer},
    core::{
        inventory,
        item::{self, ItemInput},
        user::{self, NewUser},
    },
    entities::{self, Role, UnitType},
    errors::{Error, Result},
};
use async_trait::async_trait;
use axum::http::HeaderValue;
use axum_test::TestServer;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;

/// Password given to every test user
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Signing secret for test tokens
pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

/// Routes test logs through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("stock_count=debug")
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a team member named after the local part of `email`, with
/// [`TEST_PASSWORD`].
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<entities::UserModel> {
    create_user_with_role(db, email, Role::TeamMember).await
}

/// Creates an admin with [`TEST_PASSWORD`].
pub async fn create_test_admin(db: &DatabaseConnection, email: &str) -> Result<entities::UserModel> {
    create_user_with_role(db, email, Role::Admin).await
}

async fn create_user_with_role(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
) -> Result<entities::UserModel> {
    let name = email.split('@').next().unwrap_or(email).to_string();
    user::create_user(
        db,
        NewUser {
            name,
            email: email.to_string(),
            password: Some(TEST_PASSWORD.to_string()),
            role,
        },
    )
    .await
}

/// Creates a quantity-counted item owned by `user_id`.
pub async fn create_test_item(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
) -> Result<entities::ItemModel> {
    item::create_item(
        db,
        user_id,
        ItemInput {
            name: name.to_string(),
            upc: None,
            unit_type: UnitType::Quantity,
            average_weight_per_unit: None,
            item_category: None,
            brand: None,
        },
    )
    .await
}

/// Inserts `count` quantity items named `Item 00001`, `Item 00002`, ...
/// owned by `user_id`, in batches.
pub async fn seed_quantity_items(db: &DatabaseConnection, user_id: i64, count: usize) -> Result<()> {
    let now = chrono::Utc::now();
    let names: Vec<String> = (1..=count).map(|n| format!("Item {n:05}")).collect();
    for chunk in names.chunks(500) {
        let rows = chunk.iter().map(|name| entities::item::ActiveModel {
            user_id: Set(user_id),
            name: Set(name.clone()),
            upc: Set(None),
            unit_type: Set(UnitType::Quantity),
            average_weight_per_unit: Set(None),
            item_category: Set(None),
            brand: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        });
        entities::Item::insert_many(rows).exec(db).await?;
    }
    Ok(())
}

/// Creates a draft inventory with empty settings.
pub async fn create_test_inventory(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
) -> Result<entities::InventoryModel> {
    inventory::create_inventory(db, user_id, name, None).await
}

/// Sets up a database with one team member.
/// Returns (db, user) for common test scenarios.
pub async fn setup_with_user() -> Result<(DatabaseConnection, entities::UserModel)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "user@example.com").await?;
    Ok((db, user))
}

/// A verified Google identity for OAuth tests.
#[must_use]
pub fn test_identity(email: &str, subject: &str) -> ExternalIdentity {
    ExternalIdentity {
        provider: "google".to_string(),
        subject: subject.to_string(),
        email: email.to_string(),
        name: Some("OAuth User".to_string()),
    }
}

/// Identity verifier that accepts tokens of the form `valid:<email>:<subject>`.
pub struct StubVerifier;

#[async_trait]
impl IdentityVerifier for StubVerifier {
    fn provider(&self) -> &'static str {
        "google"
    }

    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity> {
        let mut parts = id_token.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("valid"), Some(email), Some(subject)) => Ok(test_identity(email, subject)),
            _ => Err(Error::unauthorized("Stub rejected token")),
        }
    }
}

/// Application state over `db` with test secrets and the stub verifier.
pub fn test_state(db: DatabaseConnection) -> Result<AppState> {
    Ok(AppState::new(db, TokenIssuer::new(TEST_JWT_SECRET, 1)?)
        .with_identity_verifier(Arc::new(StubVerifier)))
}

/// Builds a test server over a fresh database.
/// Returns (server, db) so tests can seed data directly.
pub async fn setup_test_server() -> Result<(TestServer, DatabaseConnection)> {
    let db = setup_test_db().await?;
    let state = test_state(db.clone())?;
    let server = TestServer::new(router(state)).map_err(|e| Error::Config {
        message: format!("Failed to start test server: {e}"),
    })?;
    Ok((server, db))
}

/// `Authorization` header value carrying a fresh token for `user`.
pub fn bearer(user: &entities::UserModel) -> Result<HeaderValue> {
    let issued = TokenIssuer::new(TEST_JWT_SECRET, 1)?.issue(user)?;
    HeaderValue::from_str(&format!("Bearer {}", issued.token)).map_err(|e| Error::Config {
        message: format!("Invalid header value: {e}"),
    })
}
