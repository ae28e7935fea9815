//! Item entity - A master item (product definition) owned by a user.
//!
//! Master items are templates: attaching one to an inventory creates an
//! inventory item that carries the actual count. Items counted by weight
//! carry the average weight of one unit so counts can be converted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Master item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Product name (e.g. "Olive Oil 1L")
    pub name: String,
    /// Barcode, when known
    pub upc: Option<String>,
    /// How this item is counted
    pub unit_type: UnitType,
    /// Weight of one unit; set exactly when `unit_type` is `Weight`
    pub average_weight_per_unit: Option<f64>,
    /// Free-form category (e.g. "dry goods")
    pub item_category: Option<String>,
    /// Brand name
    pub brand: Option<String>,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When the item was last modified
    pub updated_at: DateTimeUtc,
}

/// How a master item is counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    /// Counted in whole units
    #[sea_orm(string_value = "quantity")]
    Quantity,
    /// Counted by weighing
    #[sea_orm(string_value = "weight")]
    Weight,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// One item appears in many inventories
    #[sea_orm(has_many = "super::inventory_item::Entity")]
    InventoryItems,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
