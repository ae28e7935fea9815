//! Inventory business logic - counting sessions owned by a user.
//!
//! Status moves one way: a draft can be completed, and either can be marked
//! deleted. Hard deletion removes the inventory together with its rows.

use crate::{
    core::Caller,
    entities::{Inventory, InventoryItem, InventoryStatus, inventory, inventory_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Partial update of an inventory
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InventoryChanges {
    pub name: Option<String>,
    pub status: Option<InventoryStatus>,
    pub settings: Option<Json>,
}

fn validate_inventory_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Inventory name cannot be empty"));
    }
    Ok(())
}

fn validate_settings(settings: &Json) -> Result<()> {
    if !settings.is_object() {
        return Err(Error::validation("settings must be a JSON object"));
    }
    Ok(())
}

/// Creates a draft inventory owned by `owner_id`.
#[instrument(skip(db, settings))]
pub async fn create_inventory(
    db: &DatabaseConnection,
    owner_id: i64,
    name: &str,
    settings: Option<Json>,
) -> Result<inventory::Model> {
    validate_inventory_name(name)?;
    let settings = settings.unwrap_or_else(|| Json::Object(serde_json::Map::new()));
    validate_settings(&settings)?;

    let now = chrono::Utc::now();
    let inventory = inventory::ActiveModel {
        user_id: Set(owner_id),
        name: Set(name.trim().to_string()),
        status: Set(InventoryStatus::Draft),
        settings: Set(settings),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let inventory = inventory.insert(db).await?;
    info!(inventory_id = inventory.id, owner_id, "Inventory created");
    Ok(inventory)
}

/// Lists a user's inventories, newest first.
///
/// Inventories marked deleted are left out unless `include_deleted` is set.
pub async fn list_inventories_for_user(
    db: &DatabaseConnection,
    owner_id: i64,
    include_deleted: bool,
) -> Result<Vec<inventory::Model>> {
    let mut query = Inventory::find().filter(inventory::Column::UserId.eq(owner_id));
    if !include_deleted {
        query = query.filter(inventory::Column::Status.ne(InventoryStatus::Deleted));
    }
    query
        .order_by_desc(inventory::Column::CreatedAt)
        .order_by_desc(inventory::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches an inventory owned by the caller.
///
/// # Errors
/// `NotFound` when it does not exist, `Forbidden` when another user owns it.
pub async fn get_inventory_for_user<C>(
    db: &C,
    caller: &Caller,
    inventory_id: i64,
) -> Result<inventory::Model>
where
    C: ConnectionTrait,
{
    let inventory = Inventory::find_by_id(inventory_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Inventory", inventory_id))?;
    caller.ensure_owns(inventory.user_id, "Inventory", false)?;
    Ok(inventory)
}

/// Renames an inventory, changes its status or replaces its settings.
///
/// # Errors
/// `Conflict` for a status change the lifecycle does not allow, such as
/// reopening a completed inventory.
#[instrument(skip(db, caller, changes))]
pub async fn update_inventory(
    db: &DatabaseConnection,
    caller: &Caller,
    inventory_id: i64,
    changes: InventoryChanges,
) -> Result<inventory::Model> {
    let existing = get_inventory_for_user(db, caller, inventory_id).await?;
    let current_status = existing.status;

    let mut inventory: inventory::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        validate_inventory_name(&name)?;
        inventory.name = Set(name.trim().to_string());
    }
    if let Some(settings) = changes.settings {
        validate_settings(&settings)?;
        inventory.settings = Set(settings);
    }
    if let Some(next) = changes.status {
        if !current_status.can_transition_to(next) {
            return Err(Error::conflict(format!(
                "Inventory cannot move from {current_status:?} to {next:?}"
            )));
        }
        if next != current_status {
            info!(inventory_id, from = ?current_status, to = ?next, "Inventory status changed");
        }
        inventory.status = Set(next);
    }
    inventory.updated_at = Set(chrono::Utc::now());

    inventory.update(db).await.map_err(Into::into)
}

/// Deletes an inventory and all of its inventory items.
#[instrument(skip(db, caller))]
pub async fn delete_inventory(db: &DatabaseConnection, caller: &Caller, inventory_id: i64) -> Result<()> {
    let inventory = get_inventory_for_user(db, caller, inventory_id).await?;

    let txn = db.begin().await?;
    let removed = InventoryItem::delete_many()
        .filter(inventory_item::Column::InventoryId.eq(inventory.id))
        .exec(&txn)
        .await?
        .rows_affected;
    Inventory::delete_by_id(inventory.id).exec(&txn).await?;
    txn.commit().await?;

    info!(inventory_id, removed, "Inventory deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_inventory_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_inventory(&db, 1, "  ", None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = create_inventory(&db, 1, "Monthly", Some(json!([1, 2]))).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_inventory_defaults() -> Result<()> {
        let (db, user) = setup_with_user().await?;

        let inventory = create_inventory(&db, user.id, " Q1 count ", None).await?;
        assert_eq!(inventory.name, "Q1 count");
        assert_eq!(inventory.status, InventoryStatus::Draft);
        assert_eq!(inventory.settings, json!({}));

        let with_settings =
            create_inventory(&db, user.id, "Bar", Some(json!({"location": "cellar"}))).await?;
        assert_eq!(with_settings.settings["location"], "cellar");
        Ok(())
    }

    #[tokio::test]
    async fn test_get_inventory_ownership() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let other = create_test_user(&db, "other@example.com").await?;
        let inventory = create_test_inventory(&db, user.id, "Mine").await?;

        get_inventory_for_user(&db, &Caller::of(&user), inventory.id).await?;

        let denied = get_inventory_for_user(&db, &Caller::of(&other), inventory.id).await;
        assert!(matches!(denied.unwrap_err(), Error::Forbidden { .. }));

        let missing = get_inventory_for_user(&db, &Caller::of(&user), 404).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_status_lifecycle() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let caller = Caller::of(&user);
        let inventory = create_test_inventory(&db, user.id, "Lifecycle").await?;

        let completed = update_inventory(
            &db,
            &caller,
            inventory.id,
            InventoryChanges {
                status: Some(InventoryStatus::Completed),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(completed.status, InventoryStatus::Completed);

        // No way back to draft
        let reopen = update_inventory(
            &db,
            &caller,
            inventory.id,
            InventoryChanges {
                status: Some(InventoryStatus::Draft),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(reopen.unwrap_err(), Error::Conflict { .. }));

        let deleted = update_inventory(
            &db,
            &caller,
            inventory.id,
            InventoryChanges {
                status: Some(InventoryStatus::Deleted),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(deleted.status, InventoryStatus::Deleted);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_hides_deleted_status() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let caller = Caller::of(&user);
        let kept = create_test_inventory(&db, user.id, "Kept").await?;
        let hidden = create_test_inventory(&db, user.id, "Hidden").await?;
        update_inventory(
            &db,
            &caller,
            hidden.id,
            InventoryChanges {
                status: Some(InventoryStatus::Deleted),
                ..Default::default()
            },
        )
        .await?;

        let visible = list_inventories_for_user(&db, user.id, false).await?;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, kept.id);

        let all = list_inventories_for_user(&db, user.id, true).await?;
        assert_eq!(all.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_inventory_removes_rows() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let caller = Caller::of(&user);
        let item = create_test_item(&db, user.id, "Beans").await?;
        let inventory = create_test_inventory(&db, user.id, "Gone").await?;
        crate::core::inventory_item::add_item_to_inventory(&db, &caller, inventory.id, item.id)
            .await?;

        delete_inventory(&db, &caller, inventory.id).await?;

        assert!(Inventory::find_by_id(inventory.id).one(&db).await?.is_none());
        assert!(InventoryItem::find().all(&db).await?.is_empty());
        // The master item survives
        assert!(crate::entities::Item::find_by_id(item.id).one(&db).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_inventory_of_other_user_rejected() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let other = create_test_user(&db, "other@example.com").await?;
        let inventory = create_test_inventory(&db, user.id, "Not yours").await?;

        let result = delete_inventory(&db, &Caller::of(&other), inventory.id).await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));
        Ok(())
    }
}
