//! Inventory item business logic - attaching master items to an inventory
//! and recording their counts.
//!
//! Every operation checks the parent inventory first: a caller who does not
//! own the inventory is rejected before the row itself is looked up. Rows of
//! an inventory that is no longer a draft are read-only.
//!
//! The (inventory, item) pair is unique. Single adds check for an existing
//! row before inserting; bulk add computes the missing items and inserts them
//! with `ON CONFLICT DO NOTHING` against the unique index.

use crate::{
    core::{Caller, INSERT_CHUNK_SIZE, inventory::get_inventory_for_user},
    entities::{
        InventoryItem, InventoryStatus, Item, UnitType, inventory, inventory_item, item,
    },
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder, QuerySelect, Set, prelude::*, sea_query::OnConflict,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// An inventory row together with the master item it counts
#[derive(Debug, Clone, Serialize)]
pub struct InventoryItemView {
    #[serde(flatten)]
    pub row: inventory_item::Model,
    pub item: item::Model,
}

/// A recorded count: either a number of units or a measured weight
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct CountInput {
    /// Number of units counted
    pub units: Option<f64>,
    /// Measured total weight, only for items counted by weight
    pub weight: Option<f64>,
}

/// Turns a count into stored `(units, calculated_weight)`.
///
/// Quantity items accept only units and have no weight. Weight items accept
/// either: units are multiplied by the average unit weight, a weight is
/// divided by it.
pub fn resolve_count(item: &item::Model, input: CountInput) -> Result<(f64, Option<f64>)> {
    let check = |value: f64, field: &str| {
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(Error::validation(format!(
                "{field} must be a non-negative number"
            )))
        }
    };

    match (item.unit_type, input.units, input.weight) {
        (_, Some(_), Some(_)) | (_, None, None) => {
            Err(Error::validation("Provide exactly one of units or weight"))
        }
        (UnitType::Quantity, Some(units), None) => Ok((check(units, "units")?, None)),
        (UnitType::Quantity, None, Some(_)) => Err(Error::validation(
            "Items counted by quantity cannot be recorded by weight",
        )),
        (UnitType::Weight, units, weight) => {
            let average = item
                .average_weight_per_unit
                .filter(|w| *w > 0.0)
                .ok_or_else(|| Error::validation("Item has no average weight per unit"))?;
            if let Some(units) = units {
                let units = check(units, "units")?;
                Ok((units, Some(units * average)))
            } else {
                let weight = check(weight.unwrap_or_default(), "weight")?;
                Ok((weight / average, Some(weight)))
            }
        }
    }
}

fn ensure_draft(inventory: &inventory::Model) -> Result<()> {
    if inventory.status != InventoryStatus::Draft {
        return Err(Error::conflict(format!(
            "Inventory {} is {:?} and can no longer be changed",
            inventory.id, inventory.status
        )));
    }
    Ok(())
}

async fn find_row<C>(db: &C, inventory_id: i64, row_id: i64) -> Result<inventory_item::Model>
where
    C: ConnectionTrait,
{
    InventoryItem::find_by_id(row_id)
        .filter(inventory_item::Column::InventoryId.eq(inventory_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Inventory item", row_id))
}

/// Lists the rows of an inventory with their master items, by item name.
///
/// # Errors
/// `NotFound` for a missing inventory, `Forbidden` when the caller does not
/// own it.
pub async fn list_inventory_items(
    db: &DatabaseConnection,
    caller: &Caller,
    inventory_id: i64,
) -> Result<Vec<InventoryItemView>> {
    let inventory = get_inventory_for_user(db, caller, inventory_id).await?;

    let rows = InventoryItem::find()
        .filter(inventory_item::Column::InventoryId.eq(inventory.id))
        .find_also_related(Item)
        .order_by_asc(item::Column::Name)
        .order_by_asc(inventory_item::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(row, item)| item.map(|item| InventoryItemView { row, item }))
        .collect())
}

/// Attaches one master item to an inventory with a zero count.
///
/// # Errors
/// - `NotFound` for a missing inventory or item
/// - `Forbidden` when the caller owns neither the inventory nor the item
/// - `Conflict` when the item is already in the inventory or the inventory is
///   not a draft
#[instrument(skip(db, caller))]
pub async fn add_item_to_inventory(
    db: &DatabaseConnection,
    caller: &Caller,
    inventory_id: i64,
    item_id: i64,
) -> Result<inventory_item::Model> {
    let inventory = get_inventory_for_user(db, caller, inventory_id).await?;
    ensure_draft(&inventory)?;

    let item = Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Item", item_id))?;
    // The item must come from the inventory owner's own catalog
    if item.user_id != inventory.user_id {
        return Err(Error::forbidden("Item belongs to another user"));
    }

    let existing = InventoryItem::find()
        .filter(inventory_item::Column::InventoryId.eq(inventory.id))
        .filter(inventory_item::Column::ItemId.eq(item.id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::conflict(format!(
            "Item {item_id} is already in inventory {inventory_id}"
        )));
    }

    let now = chrono::Utc::now();
    let row = inventory_item::ActiveModel {
        inventory_id: Set(inventory.id),
        item_id: Set(item.id),
        units: Set(0.0),
        calculated_weight: Set(None),
        is_entered: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    row.insert(db).await.map_err(|e| {
        Error::on_unique_violation(e, format!("Item {item_id} is already in inventory {inventory_id}"))
    })
}

/// Fetches one row of an inventory with its master item.
pub async fn get_inventory_item(
    db: &DatabaseConnection,
    caller: &Caller,
    inventory_id: i64,
    row_id: i64,
) -> Result<InventoryItemView> {
    let inventory = get_inventory_for_user(db, caller, inventory_id).await?;
    let row = find_row(db, inventory.id, row_id).await?;
    let item = Item::find_by_id(row.item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Item", row.item_id))?;
    Ok(InventoryItemView { row, item })
}

/// Records a count on a row and marks it entered.
///
/// # Errors
/// - `Validation` for a count [`resolve_count`] rejects
/// - `NotFound` when the row is not part of this inventory
/// - `Conflict` when the inventory is not a draft
#[instrument(skip(db, caller))]
pub async fn record_count(
    db: &DatabaseConnection,
    caller: &Caller,
    inventory_id: i64,
    row_id: i64,
    input: CountInput,
) -> Result<InventoryItemView> {
    let inventory = get_inventory_for_user(db, caller, inventory_id).await?;
    ensure_draft(&inventory)?;

    let row = find_row(db, inventory.id, row_id).await?;
    let item = Item::find_by_id(row.item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Item", row.item_id))?;
    let (units, calculated_weight) = resolve_count(&item, input)?;

    let mut row: inventory_item::ActiveModel = row.into();
    row.units = Set(units);
    row.calculated_weight = Set(calculated_weight);
    row.is_entered = Set(true);
    row.updated_at = Set(chrono::Utc::now());
    let row = row.update(db).await?;

    debug!(row_id, units, "Count recorded");
    Ok(InventoryItemView { row, item })
}

/// Removes a row from an inventory.
#[instrument(skip(db, caller))]
pub async fn remove_inventory_item(
    db: &DatabaseConnection,
    caller: &Caller,
    inventory_id: i64,
    row_id: i64,
) -> Result<()> {
    let inventory = get_inventory_for_user(db, caller, inventory_id).await?;
    ensure_draft(&inventory)?;

    let row = find_row(db, inventory.id, row_id).await?;
    InventoryItem::delete_by_id(row.id).exec(db).await?;
    Ok(())
}

/// Attaches every master item of the inventory owner that is not in the
/// inventory yet, each with a zero count. Returns the number of rows added.
///
/// Running it again adds nothing and returns 0. Rows are inserted in
/// batches, so catalogs of any size are handled.
///
/// # Errors
/// `Forbidden` when the caller does not own the inventory, `Conflict` when it
/// is not a draft.
#[instrument(skip(db, caller))]
pub async fn add_all_remaining_items(
    db: &DatabaseConnection,
    caller: &Caller,
    inventory_id: i64,
) -> Result<u64> {
    let inventory = get_inventory_for_user(db, caller, inventory_id).await?;
    ensure_draft(&inventory)?;

    let owned: Vec<i64> = Item::find()
        .select_only()
        .column(item::Column::Id)
        .filter(item::Column::UserId.eq(inventory.user_id))
        .order_by_asc(item::Column::Id)
        .into_tuple()
        .all(db)
        .await?;
    let present: HashSet<i64> = InventoryItem::find()
        .select_only()
        .column(inventory_item::Column::ItemId)
        .filter(inventory_item::Column::InventoryId.eq(inventory.id))
        .into_tuple::<i64>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let missing: Vec<i64> = owned
        .into_iter()
        .filter(|id| !present.contains(id))
        .collect();
    if missing.is_empty() {
        debug!(inventory_id, "Bulk add found nothing to add");
        return Ok(0);
    }

    let now = chrono::Utc::now();
    let mut added = 0;
    for chunk in missing.chunks(INSERT_CHUNK_SIZE) {
        let rows = chunk.iter().map(|&item_id| inventory_item::ActiveModel {
            inventory_id: Set(inventory.id),
            item_id: Set(item_id),
            units: Set(0.0),
            calculated_weight: Set(None),
            is_entered: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        });
        added += InventoryItem::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    inventory_item::Column::InventoryId,
                    inventory_item::Column::ItemId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    info!(inventory_id, added, "Bulk added remaining items");
    Ok(added)
}
