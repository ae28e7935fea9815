//! Inventory item entity - Joins a master item to an inventory and holds its count.
//!
//! The pair (`inventory_id`, `item_id`) is unique; the schema adds a unique
//! index for it next to the table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Inventory this row belongs to
    pub inventory_id: i64,
    /// Master item being counted
    pub item_id: i64,
    /// Counted units
    pub units: f64,
    /// Weight derived from the count, only for items counted by weight
    pub calculated_weight: Option<f64>,
    /// Whether a count has been recorded
    pub is_entered: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `InventoryItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row belongs to one inventory
    #[sea_orm(
        belongs_to = "super::inventory::Entity",
        from = "Column::InventoryId",
        to = "super::inventory::Column::Id",
        on_delete = "Cascade"
    )]
    Inventory,
    /// Each row refers to one master item
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
