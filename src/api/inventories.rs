use crate::api::{
    AppState,
    error::{ApiJson, ApiPath, ApiQuery},
    extract::CurrentUser,
};
use crate::core::{
    inventory::{self, InventoryChanges},
    inventory_item::{self, CountInput, InventoryItemView},
};
use crate::entities::{InventoryItemModel, InventoryModel};
use crate::errors::Result;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use sea_orm::prelude::Json as JsonValue;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Inventory and inventory item routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventories", get(list_inventories).post(create_inventory))
        .route(
            "/inventories/:id",
            get(get_inventory)
                .patch(update_inventory)
                .delete(delete_inventory),
        )
        .route(
            "/inventories/:id/items",
            get(list_rows).post(add_row),
        )
        .route("/inventories/:id/items/bulk", post(bulk_add))
        .route(
            "/inventories/:id/items/:row_id",
            get(get_row).patch(record_count).delete(remove_row),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    include_deleted: bool,
}

#[derive(Debug, Deserialize)]
struct CreateInventoryRequest {
    name: String,
    #[serde(default)]
    settings: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct AddRowRequest {
    item_id: i64,
}

/// An inventory with its rows
#[derive(Debug, Serialize)]
struct InventoryDetail {
    #[serde(flatten)]
    inventory: InventoryModel,
    items: Vec<InventoryItemView>,
}

async fn list_inventories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<InventoryModel>>> {
    let inventories =
        inventory::list_inventories_for_user(&state.db, user.id, query.include_deleted).await?;
    Ok(Json(inventories))
}

async fn create_inventory(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<CreateInventoryRequest>,
) -> Result<(StatusCode, Json<InventoryModel>)> {
    let created =
        inventory::create_inventory(&state.db, user.id, &request.name, request.settings).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_inventory(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<InventoryDetail>> {
    let caller = current.caller();
    let inventory = inventory::get_inventory_for_user(&state.db, &caller, id).await?;
    let items = inventory_item::list_inventory_items(&state.db, &caller, id).await?;
    Ok(Json(InventoryDetail { inventory, items }))
}

async fn update_inventory(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<InventoryChanges>,
) -> Result<Json<InventoryModel>> {
    Ok(Json(
        inventory::update_inventory(&state.db, &current.caller(), id, changes).await?,
    ))
}

async fn delete_inventory(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>> {
    inventory::delete_inventory(&state.db, &current.caller(), id).await?;
    Ok(Json(json!({ "deleted": id })))
}

async fn list_rows(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<InventoryItemView>>> {
    Ok(Json(
        inventory_item::list_inventory_items(&state.db, &current.caller(), id).await?,
    ))
}

async fn add_row(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<AddRowRequest>,
) -> Result<(StatusCode, Json<InventoryItemModel>)> {
    let row =
        inventory_item::add_item_to_inventory(&state.db, &current.caller(), id, request.item_id)
            .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn bulk_add(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>> {
    let added = inventory_item::add_all_remaining_items(&state.db, &current.caller(), id).await?;
    Ok(Json(json!({ "added": added })))
}

async fn get_row(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath((id, row_id)): ApiPath<(i64, i64)>,
) -> Result<Json<InventoryItemView>> {
    Ok(Json(
        inventory_item::get_inventory_item(&state.db, &current.caller(), id, row_id).await?,
    ))
}

async fn record_count(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath((id, row_id)): ApiPath<(i64, i64)>,
    ApiJson(count): ApiJson<CountInput>,
) -> Result<Json<InventoryItemView>> {
    Ok(Json(
        inventory_item::record_count(&state.db, &current.caller(), id, row_id, count).await?,
    ))
}

async fn remove_row(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath((id, row_id)): ApiPath<(i64, i64)>,
) -> Result<Json<Value>> {
    inventory_item::remove_inventory_item(&state.db, &current.caller(), id, row_id).await?;
    Ok(Json(json!({ "deleted": row_id })))
}
