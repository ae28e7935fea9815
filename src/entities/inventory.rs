//! Inventory entity - A named counting session.
//!
//! An inventory starts as a draft, can be completed once, and can be
//! soft-deleted by status. The settings column holds free-form JSON.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventories")]
pub struct Model {
    /// Unique identifier for the inventory
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Session name (e.g. "March stocktake")
    pub name: String,
    /// Lifecycle state
    pub status: InventoryStatus,
    /// Free-form settings object
    pub settings: Json,
    /// When the inventory was created
    pub created_at: DateTimeUtc,
    /// When the inventory was last modified
    pub updated_at: DateTimeUtc,
}

/// Lifecycle state of an inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum InventoryStatus {
    /// Counting in progress
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Counting finished; counts are frozen
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Hidden from the default listing
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

impl InventoryStatus {
    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Staying in the same state is always allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, _)
                | (Self::Completed, Self::Completed | Self::Deleted)
                | (Self::Deleted, Self::Deleted)
        )
    }
}

/// Defines relationships between Inventory and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each inventory belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// One inventory holds many inventory items
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
