use crate::api::{
    AppState,
    error::{ApiJson, ApiPath},
    extract::CurrentUser,
};
use crate::core::item::{self, ItemChanges, ItemInput};
use crate::entities::ItemModel;
use crate::errors::Result;
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde_json::{Value, json};

/// Master item routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
}

async fn list_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ItemModel>>> {
    Ok(Json(item::list_items_for_user(&state.db, user.id).await?))
}

async fn create_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<ItemInput>,
) -> Result<(StatusCode, Json<ItemModel>)> {
    let item = item::create_item(&state.db, user.id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ItemModel>> {
    Ok(Json(
        item::get_item_for_user(&state.db, &current.caller(), id).await?,
    ))
}

async fn update_item(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<ItemChanges>,
) -> Result<Json<ItemModel>> {
    Ok(Json(
        item::update_item(&state.db, &current.caller(), id, changes).await?,
    ))
}

async fn delete_item(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>> {
    item::delete_item(&state.db, &current.caller(), id).await?;
    Ok(Json(json!({ "deleted": id })))
}
