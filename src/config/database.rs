//! Database connection and schema creation.
//!
//! Tables are generated from the entity definitions with `SeaORM`'s
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. The composite unique indexes that entity attributes cannot express
//! are created right after the tables.

use crate::entities::{
    Account, Inventory, InventoryItem, Item, User, account, inventory_item,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info, instrument};

/// Default database location used when neither the settings file nor
/// `DATABASE_URL` names one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://stock_count.sqlite?mode=rwc";

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Tables are created parents first so the generated foreign keys resolve.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Account),
        schema.create_table_from_entity(Item),
        schema.create_table_from_entity(Inventory),
        schema.create_table_from_entity(InventoryItem),
    ];
    for mut table in tables {
        table.if_not_exists();
        db.execute(builder.build(&table)).await?;
    }

    let unique_inventory_item = Index::create()
        .name("idx_inventory_items_inventory_item")
        .table(InventoryItem)
        .col(inventory_item::Column::InventoryId)
        .col(inventory_item::Column::ItemId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&unique_inventory_item)).await?;

    let unique_account = Index::create()
        .name("idx_accounts_provider_subject")
        .table(Account)
        .col(account::Column::Provider)
        .col(account::Column::ProviderAccountId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&unique_account)).await?;

    info!("Database tables ensured");
    Ok(())
}

/// Connects and ensures the schema in one step.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection> {
    let db = create_connection(database_url).await?;
    create_tables(&db).await?;
    Ok(db)
}
