//! User entity - An account that owns items and inventories.
//!
//! Users signing in only through an OAuth provider have no password hash.
//! The role decides access to the admin endpoints.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email, unique across users
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string, None for OAuth-only accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Access level
    pub role: Role,
    /// When the user was created
    pub created_at: DateTimeUtc,
    /// When the user was last modified
    pub updated_at: DateTimeUtc,
}

/// Access level of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Role {
    /// Can manage users and copy item catalogs
    #[sea_orm(string_value = "ADMIN")]
    #[serde(rename = "ADMIN")]
    Admin,
    /// Regular user, limited to their own data
    #[sea_orm(string_value = "TEAM_MEMBER")]
    #[serde(rename = "TEAM_MEMBER")]
    TeamMember,
}

impl Role {
    /// Canonical string form, as stored and as carried in tokens
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::TeamMember => "TEAM_MEMBER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user owns many master items
    #[sea_orm(has_many = "super::item::Entity")]
    Items,
    /// One user owns many inventories
    #[sea_orm(has_many = "super::inventory::Entity")]
    Inventories,
    /// One user can be linked to many OAuth accounts
    #[sea_orm(has_many = "super::account::Entity")]
    Accounts,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventories.def()
    }
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
