//! Master item business logic - Handles the per-user item catalog.
//!
//! Master items are product definitions (name, unit type, weight, UPC, brand)
//! that can be attached to any number of inventories. This module validates
//! their shape, enforces ownership, and implements the admin operation that
//! copies one user's catalog to another.

use crate::{
    core::{Caller, INSERT_CHUNK_SIZE, user::get_user_by_id},
    entities::{InventoryItem, Item, UnitType, inventory_item, item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Fields of a new master item
#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    pub name: String,
    #[serde(default)]
    pub upc: Option<String>,
    pub unit_type: UnitType,
    #[serde(default)]
    pub average_weight_per_unit: Option<f64>,
    #[serde(default)]
    pub item_category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

/// Partial update of a master item.
///
/// Absent fields keep their value. For the optional text fields an empty
/// string clears the value. Switching to `quantity` drops the stored average
/// weight.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub upc: Option<String>,
    pub unit_type: Option<UnitType>,
    pub average_weight_per_unit: Option<f64>,
    pub item_category: Option<String>,
    pub brand: Option<String>,
}

/// Checks the unit type / average weight invariant.
///
/// # Errors
/// `Validation` when a weight item lacks a positive finite average weight, or
/// a quantity item carries one.
pub fn validate_unit_weight(unit_type: UnitType, average_weight: Option<f64>) -> Result<()> {
    match (unit_type, average_weight) {
        (UnitType::Quantity, None) => Ok(()),
        (UnitType::Quantity, Some(_)) => Err(Error::validation(
            "average_weight_per_unit must be empty for items counted by quantity",
        )),
        (UnitType::Weight, Some(w)) if w.is_finite() && w > 0.0 => Ok(()),
        (UnitType::Weight, _) => Err(Error::validation(
            "average_weight_per_unit must be a positive number for items counted by weight",
        )),
    }
}

fn validate_item_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Item name cannot be empty"));
    }
    Ok(())
}

// Trims and turns blank text into None.
fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lists a user's master items alphabetically.
pub async fn list_items_for_user<C>(db: &C, user_id: i64) -> Result<Vec<item::Model>>
where
    C: ConnectionTrait,
{
    Item::find()
        .filter(item::Column::UserId.eq(user_id))
        .order_by_asc(item::Column::Name)
        .order_by_asc(item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches an item the caller may access (owner or admin).
///
/// # Errors
/// `NotFound` when no such item exists, `Forbidden` when it belongs to someone
/// else.
pub async fn get_item_for_user<C>(db: &C, caller: &Caller, item_id: i64) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    let item = Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Item", item_id))?;
    caller.ensure_owns(item.user_id, "Item", true)?;
    Ok(item)
}

/// Creates a master item owned by `owner_id`.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_item(db: &DatabaseConnection, owner_id: i64, input: ItemInput) -> Result<item::Model> {
    validate_item_name(&input.name)?;
    validate_unit_weight(input.unit_type, input.average_weight_per_unit)?;

    let now = chrono::Utc::now();
    let item = item::ActiveModel {
        user_id: Set(owner_id),
        name: Set(input.name.trim().to_string()),
        upc: Set(clean_text(input.upc)),
        unit_type: Set(input.unit_type),
        average_weight_per_unit: Set(input.average_weight_per_unit),
        item_category: Set(clean_text(input.item_category)),
        brand: Set(clean_text(input.brand)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let item = item.insert(db).await?;
    debug!(item_id = item.id, owner_id, "Item created");
    Ok(item)
}

/// Applies a partial update, re-validating the merged result.
#[instrument(skip(db, caller, changes))]
pub async fn update_item(
    db: &DatabaseConnection,
    caller: &Caller,
    item_id: i64,
    changes: ItemChanges,
) -> Result<item::Model> {
    let existing = get_item_for_user(db, caller, item_id).await?;

    let unit_type = changes.unit_type.unwrap_or(existing.unit_type);
    let average_weight = match unit_type {
        // An explicit weight is kept so validation rejects it
        UnitType::Quantity => changes.average_weight_per_unit,
        UnitType::Weight => changes
            .average_weight_per_unit
            .or(existing.average_weight_per_unit),
    };
    validate_unit_weight(unit_type, average_weight)?;

    let mut item: item::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        validate_item_name(&name)?;
        item.name = Set(name.trim().to_string());
    }
    if changes.upc.is_some() {
        item.upc = Set(clean_text(changes.upc));
    }
    if changes.item_category.is_some() {
        item.item_category = Set(clean_text(changes.item_category));
    }
    if changes.brand.is_some() {
        item.brand = Set(clean_text(changes.brand));
    }
    item.unit_type = Set(unit_type);
    item.average_weight_per_unit = Set(average_weight);
    item.updated_at = Set(chrono::Utc::now());

    item.update(db).await.map_err(Into::into)
}

/// Deletes a master item and removes it from every inventory.
#[instrument(skip(db, caller))]
pub async fn delete_item(db: &DatabaseConnection, caller: &Caller, item_id: i64) -> Result<()> {
    let item = get_item_for_user(db, caller, item_id).await?;

    let txn = db.begin().await?;
    InventoryItem::delete_many()
        .filter(inventory_item::Column::ItemId.eq(item.id))
        .exec(&txn)
        .await?;
    Item::delete_by_id(item.id).exec(&txn).await?;
    txn.commit().await?;

    debug!(item_id, "Item deleted");
    Ok(())
}

/// Duplicates every master item of `source_user_id` under `target_user_id`.
///
/// The source catalog is left untouched and no deduplication is done, so
/// copying twice yields two copies. Returns the number of items copied.
#[instrument(skip(db))]
pub async fn copy_items_between_users(
    db: &DatabaseConnection,
    source_user_id: i64,
    target_user_id: i64,
) -> Result<u64> {
    if source_user_id == target_user_id {
        return Err(Error::validation("Source and target user must differ"));
    }

    let txn = db.begin().await?;
    for user_id in [source_user_id, target_user_id] {
        if get_user_by_id(&txn, user_id).await?.is_none() {
            return Err(Error::not_found("User", user_id));
        }
    }

    let source_items = list_items_for_user(&txn, source_user_id).await?;
    let copied = source_items.len() as u64;
    let now = chrono::Utc::now();
    for chunk in source_items.chunks(INSERT_CHUNK_SIZE) {
        let copies = chunk.iter().map(|src| item::ActiveModel {
            user_id: Set(target_user_id),
            name: Set(src.name.clone()),
            upc: Set(src.upc.clone()),
            unit_type: Set(src.unit_type),
            average_weight_per_unit: Set(src.average_weight_per_unit),
            item_category: Set(src.item_category.clone()),
            brand: Set(src.brand.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        });
        Item::insert_many(copies).exec_without_returning(&txn).await?;
    }
    txn.commit().await?;

    info!(source_user_id, target_user_id, copied, "Copied item catalog");
    Ok(copied)
}
