//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod inventory;
pub mod inventory_item;
pub mod item;
pub mod user;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use inventory::{
    Column as InventoryColumn, Entity as Inventory, InventoryStatus, Model as InventoryModel,
};
pub use inventory_item::{
    Column as InventoryItemColumn, Entity as InventoryItem, Model as InventoryItemModel,
};
pub use item::{Column as ItemColumn, Entity as Item, Model as ItemModel, UnitType};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
