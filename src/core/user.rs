//! User business logic - accounts, credential checks, OAuth linking and admin
//! management.
//!
//! Deleting a user removes everything they own in one database transaction.

use crate::{
    auth::{ExternalIdentity, password},
    config::settings::BootstrapAdmin,
    entities::{
        Account, Inventory, InventoryItem, Item, Role, User, account, inventory,
        inventory_item, item, user,
    },
    errors::{Error, Result},
};
use sea_orm::{
    Condition, QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait, prelude::*,
};
use tracing::{info, instrument, warn};

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name, must not be blank
    pub name: String,
    /// Login email; stored trimmed and lowercased
    pub email: String,
    /// None creates a password-less (OAuth-only) user
    pub password: Option<String>,
    /// `TEAM_MEMBER` unless an admin creates the user
    pub role: Role,
}

/// Partial update applied by an admin
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub role: Option<Role>,
}

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Name cannot be empty"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(Error::validation("Email must contain '@'"));
    };
    if local.is_empty() || domain.is_empty() {
        return Err(Error::validation("Email is malformed"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Finds a user by id.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by email, case-insensitively.
pub async fn get_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every user ordered by name.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Name)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a user after validating the input.
///
/// # Errors
/// - `Validation` for an empty name, malformed email or short password
/// - `Conflict` when the email is already registered
#[instrument(skip(db, new_user), fields(email = %new_user.email))]
pub async fn create_user<C>(db: &C, new_user: NewUser) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    validate_name(&new_user.name)?;
    let email = normalize_email(&new_user.email);
    validate_email(&email)?;

    let password_hash = match new_user.password.as_deref() {
        Some(plain) => {
            validate_password(plain)?;
            Some(password::hash_password(plain)?)
        }
        None => None,
    };

    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::conflict(format!("Email {email} is already registered")));
    }

    let now = chrono::Utc::now();
    let user = user::ActiveModel {
        name: Set(new_user.name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(new_user.role),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let user = user.insert(db).await.map_err(|e| {
        Error::on_unique_violation(e, "Email is already registered")
    })?;
    info!(user_id = user.id, role = %user.role, "User created");
    Ok(user)
}

/// Checks email and password.
///
/// Every failure is reported as the same `Unauthorized` so callers cannot
/// tell which emails exist.
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password_attempt: &str,
) -> Result<user::Model> {
    let invalid = || Error::unauthorized("Invalid email or password");

    let user = get_user_by_email(db, email).await?.ok_or_else(invalid)?;
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(invalid());
    };
    if !password::verify_password(password_attempt, hash)? {
        warn!(user_id = user.id, "Password mismatch");
        return Err(invalid());
    }
    Ok(user)
}

/// Applies an admin's changes to a user.
#[instrument(skip(db, changes))]
pub async fn update_user(
    db: &DatabaseConnection,
    user_id: i64,
    changes: UserChanges,
) -> Result<user::Model> {
    let mut user: user::ActiveModel = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?
        .into();

    if let Some(name) = changes.name {
        validate_name(&name)?;
        user.name = Set(name.trim().to_string());
    }
    if let Some(role) = changes.role {
        user.role = Set(role);
    }
    user.updated_at = Set(chrono::Utc::now());

    user.update(db).await.map_err(Into::into)
}

/// Deletes a user and everything they own.
///
/// # Errors
/// - `Validation` when `acting_user_id` tries to delete themself
/// - `NotFound` when the user does not exist
#[instrument(skip(db))]
pub async fn delete_user(db: &DatabaseConnection, acting_user_id: i64, user_id: i64) -> Result<()> {
    if acting_user_id == user_id {
        return Err(Error::validation("You cannot delete your own account"));
    }

    let txn = db.begin().await?;

    if get_user_by_id(&txn, user_id).await?.is_none() {
        return Err(Error::not_found("User", user_id));
    }

    let owned_inventories = Inventory::find()
        .select_only()
        .column(inventory::Column::Id)
        .filter(inventory::Column::UserId.eq(user_id))
        .into_query();
    let owned_items = Item::find()
        .select_only()
        .column(item::Column::Id)
        .filter(item::Column::UserId.eq(user_id))
        .into_query();

    InventoryItem::delete_many()
        .filter(
            Condition::any()
                .add(inventory_item::Column::InventoryId.in_subquery(owned_inventories))
                .add(inventory_item::Column::ItemId.in_subquery(owned_items)),
        )
        .exec(&txn)
        .await?;
    Inventory::delete_many()
        .filter(inventory::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    Item::delete_many()
        .filter(item::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    Account::delete_many()
        .filter(account::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    User::delete_by_id(user_id).exec(&txn).await?;

    txn.commit().await?;
    info!(user_id, "User deleted");
    Ok(())
}

/// Signs in with a verified external identity.
///
/// Resolution order: an existing link for (provider, subject); otherwise the
/// user with the same email, which gets linked; otherwise a new password-less
/// team member, also linked.
#[instrument(skip(db, identity), fields(provider = %identity.provider))]
pub async fn sign_in_with_oauth(
    db: &DatabaseConnection,
    identity: &ExternalIdentity,
) -> Result<user::Model> {
    let linked = Account::find()
        .filter(account::Column::Provider.eq(identity.provider.as_str()))
        .filter(account::Column::ProviderAccountId.eq(identity.subject.as_str()))
        .find_also_related(User)
        .one(db)
        .await?;
    if let Some((_, Some(user))) = linked {
        return Ok(user);
    }

    let txn = db.begin().await?;
    let user = match get_user_by_email(&txn, &identity.email).await? {
        Some(existing) => {
            info!(user_id = existing.id, "Linking OAuth identity to existing user");
            existing
        }
        None => {
            let name = identity
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| identity.email.clone());
            create_user(
                &txn,
                NewUser {
                    name,
                    email: identity.email.clone(),
                    password: None,
                    role: Role::TeamMember,
                },
            )
            .await?
        }
    };

    account::ActiveModel {
        user_id: Set(user.id),
        provider: Set(identity.provider.clone()),
        provider_account_id: Set(identity.subject.clone()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| Error::on_unique_violation(e, "OAuth account is already linked"))?;
    txn.commit().await?;

    Ok(user)
}

/// Makes sure the configured admin exists and has the admin role.
///
/// An existing user with that email is promoted; its password is left as is.
pub async fn ensure_admin(db: &DatabaseConnection, admin: &BootstrapAdmin) -> Result<user::Model> {
    if let Some(existing) = get_user_by_email(db, &admin.email).await? {
        if existing.role == Role::Admin {
            return Ok(existing);
        }
        info!(user_id = existing.id, "Promoting bootstrap user to admin");
        return update_user(
            db,
            existing.id,
            UserChanges {
                name: None,
                role: Some(Role::Admin),
            },
        )
        .await;
    }

    create_user(
        db,
        NewUser {
            name: admin.name.clone(),
            email: admin.email.clone(),
            password: Some(admin.password.clone()),
            role: Role::Admin,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::Caller;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = NewUser {
            name: "  ".to_string(),
            email: "a@b.c".to_string(),
            password: Some("long enough".to_string()),
            role: Role::TeamMember,
        };
        let result = create_user(&db, input.clone()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        input.name = "Alex".to_string();
        input.email = "no-at-sign".to_string();
        let result = create_user(&db, input.clone()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        input.email = "alex@example.com".to_string();
        input.password = Some("short".to_string());
        let result = create_user(&db, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "dup@example.com").await?;

        let result = create_user(
            &db,
            NewUser {
                name: "Other".to_string(),
                email: "DUP@example.com".to_string(),
                password: Some(TEST_PASSWORD.to_string()),
                role: Role::TeamMember,
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_authenticate() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "login@example.com").await?;

        let found = authenticate(&db, "Login@Example.com", TEST_PASSWORD).await?;
        assert_eq!(found.id, user.id);

        let wrong = authenticate(&db, "login@example.com", "not the password").await;
        assert!(matches!(wrong.unwrap_err(), Error::Unauthorized { .. }));

        let missing = authenticate(&db, "ghost@example.com", TEST_PASSWORD).await;
        assert!(matches!(missing.unwrap_err(), Error::Unauthorized { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_oauth_only_user_cannot_use_password() -> Result<()> {
        let db = setup_test_db().await?;
        let identity = test_identity("oauth@example.com", "sub-1");
        sign_in_with_oauth(&db, &identity).await?;

        let result = authenticate(&db, "oauth@example.com", TEST_PASSWORD).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthorized { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_oauth_sign_in_creates_then_reuses_user() -> Result<()> {
        let db = setup_test_db().await?;
        let identity = test_identity("new@example.com", "sub-2");

        let first = sign_in_with_oauth(&db, &identity).await?;
        assert_eq!(first.role, Role::TeamMember);
        assert!(first.password_hash.is_none());

        let second = sign_in_with_oauth(&db, &identity).await?;
        assert_eq!(second.id, first.id);

        let accounts = Account::find().all(&db).await?;
        assert_eq!(accounts.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_oauth_sign_in_links_existing_email() -> Result<()> {
        let db = setup_test_db().await?;
        let existing = create_test_user(&db, "linked@example.com").await?;

        let user = sign_in_with_oauth(&db, &test_identity("linked@example.com", "sub-3")).await?;
        assert_eq!(user.id, existing.id);

        // Password login keeps working after linking
        authenticate(&db, "linked@example.com", TEST_PASSWORD).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_update_user_role() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "promote@example.com").await?;

        let updated = update_user(
            &db,
            user.id,
            UserChanges {
                name: Some("Promoted".to_string()),
                role: Some(Role::Admin),
            },
        )
        .await?;
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.name, "Promoted");

        let missing = update_user(&db, 999, UserChanges::default()).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_user_removes_owned_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_admin(&db, "admin@example.com").await?;
        let user = create_test_user(&db, "leaving@example.com").await?;
        let item = create_test_item(&db, user.id, "Flour").await?;
        let inventory = create_test_inventory(&db, user.id, "Weekly").await?;
        crate::core::inventory_item::add_item_to_inventory(
            &db,
            &Caller::of(&user),
            inventory.id,
            item.id,
        )
        .await?;

        delete_user(&db, admin.id, user.id).await?;

        assert!(get_user_by_id(&db, user.id).await?.is_none());
        assert!(Item::find_by_id(item.id).one(&db).await?.is_none());
        assert!(Inventory::find_by_id(inventory.id).one(&db).await?.is_none());
        assert_eq!(InventoryItem::find().all(&db).await?.len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_admin(&db, "self@example.com").await?;

        let result = delete_user(&db, admin.id, admin.id).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        assert!(get_user_by_id(&db, admin.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let bootstrap = BootstrapAdmin {
            name: "Root".to_string(),
            email: "root@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        };

        let first = ensure_admin(&db, &bootstrap).await?;
        let second = ensure_admin(&db, &bootstrap).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(second.role, Role::Admin);
        assert_eq!(list_users(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_admin_promotes_existing_user() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "boss@example.com").await?;
        let bootstrap = BootstrapAdmin {
            name: "Boss".to_string(),
            email: "boss@example.com".to_string(),
            password: "ignored-password".to_string(),
        };

        let admin = ensure_admin(&db, &bootstrap).await?;
        assert_eq!(admin.id, user.id);
        assert_eq!(admin.role, Role::Admin);
        Ok(())
    }

    #[tokio::test]
    async fn test_unique_index_violation_is_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        let existing = create_test_user(&db, "race@example.com").await?;

        // A second row with the same email, as a concurrent sign-up would write it
        let now = chrono::Utc::now();
        let duplicate = user::ActiveModel {
            name: Set("Racer".to_string()),
            email: Set(existing.email.clone()),
            password_hash: Set(None),
            role: Set(Role::TeamMember),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap_err();
        assert!(matches!(
            Error::on_unique_violation(duplicate, "taken"),
            Error::Conflict { .. }
        ));

        let other = Error::on_unique_violation(DbErr::Custom("boom".to_string()), "taken");
        assert!(matches!(other, Error::Database(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_user_with_large_catalog() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_admin(&db, "admin@example.com").await?;
        let user = create_test_user(&db, "bulk@example.com").await?;
        let keeper = create_test_user(&db, "keeper@example.com").await?;
        let kept_item = create_test_item(&db, keeper.id, "Keep me").await?;
        seed_quantity_items(&db, user.id, 5_000).await?;
        let inventory = create_test_inventory(&db, user.id, "Everything").await?;
        crate::core::inventory_item::add_all_remaining_items(&db, &Caller::of(&user), inventory.id)
            .await?;

        delete_user(&db, admin.id, user.id).await?;

        assert!(get_user_by_id(&db, user.id).await?.is_none());
        assert!(InventoryItem::find().all(&db).await?.is_empty());
        let remaining = Item::find().all(&db).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, kept_item.id);
        Ok(())
    }
}
