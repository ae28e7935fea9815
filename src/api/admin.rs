//! Admin-only endpoints, mounted under `/admin`. Every handler takes an
//! [`AdminUser`], so non-admins get 403 before any work is done.

use crate::api::{
    AppState,
    error::{ApiJson, ApiPath},
    extract::AdminUser,
};
use crate::core::{
    item,
    user::{self, NewUser, UserChanges},
};
use crate::entities::{ItemModel, Role, UserModel};
use crate::errors::{Error, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Routes relative to `/admin`
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/:id/items", get(list_user_items))
        .route("/items/copy", post(copy_items))
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    name: String,
    email: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdateUserRequest {
    name: Option<String>,
    role: Option<Role>,
}

#[derive(Debug, Deserialize)]
struct CopyItemsRequest {
    source_user_id: i64,
    target_user_id: i64,
}

async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserModel>>> {
    Ok(Json(user::list_users(&state.db).await?))
}

async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserModel>)> {
    let created = user::create_user(
        &state.db,
        NewUser {
            name: request.name,
            email: request.email,
            password: request.password,
            role: request.role.unwrap_or(Role::TeamMember),
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserModel>> {
    let found = user::get_user_by_id(&state.db, id)
        .await?
        .ok_or_else(|| Error::not_found("User", id))?;
    Ok(Json(found))
}

async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserModel>> {
    let updated = user::update_user(
        &state.db,
        id,
        UserChanges {
            name: request.name,
            role: request.role,
        },
    )
    .await?;
    Ok(Json(updated))
}

async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>> {
    user::delete_user(&state.db, admin.0.id, id).await?;
    Ok(Json(json!({ "deleted": id })))
}

async fn list_user_items(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<ItemModel>>> {
    if user::get_user_by_id(&state.db, id).await?.is_none() {
        return Err(Error::not_found("User", id));
    }
    Ok(Json(item::list_items_for_user(&state.db, id).await?))
}

async fn copy_items(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(request): ApiJson<CopyItemsRequest>,
) -> Result<Json<Value>> {
    let copied =
        item::copy_items_between_users(&state.db, request.source_user_id, request.target_user_id)
            .await?;
    Ok(Json(json!({ "copied": copied })))
}
