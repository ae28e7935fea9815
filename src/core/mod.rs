//! Core business logic - framework-agnostic user, item and inventory
//! operations.
//!
//! Every operation that touches owned data takes a [`Caller`] and checks
//! ownership itself before reading or writing rows.

use crate::entities::{Role, UserModel};
use crate::errors::{Error, Result};

/// Inventory sessions and their status transitions
pub mod inventory;
/// Inventory items: attaching, counting and bulk add
pub mod inventory_item;
/// Master item catalog and admin catalog copy
pub mod item;
/// Users, credentials and OAuth links
pub mod user;

/// Most rows written by one multi-row `INSERT`.
///
/// `SQLite` caps bound parameters per statement at 32766; at under ten columns
/// per row this stays well below it.
pub(crate) const INSERT_CHUNK_SIZE: usize = 1000;

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Id of the signed-in user
    pub user_id: i64,
    /// Role as loaded for this request
    pub role: Role,
}

impl Caller {
    /// Caller acting as `user`.
    #[must_use]
    pub const fn of(user: &UserModel) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
        }
    }

    /// Whether the caller holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Checks that the caller owns a row owned by `owner_id`.
    ///
    /// With `admin_override` an admin passes for any owner.
    pub(crate) fn ensure_owns(
        &self,
        owner_id: i64,
        entity: &'static str,
        admin_override: bool,
    ) -> Result<()> {
        if self.user_id == owner_id || (admin_override && self.is_admin()) {
            return Ok(());
        }
        tracing::warn!(
            caller = self.user_id,
            owner = owner_id,
            "Denied access to {}",
            entity
        );
        Err(Error::forbidden(format!("{entity} belongs to another user")))
    }
}
