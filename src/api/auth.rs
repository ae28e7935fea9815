use crate::api::{
    AppState,
    error::{ApiJson, ApiPath},
    extract::CurrentUser,
};
use crate::core::user::{self, NewUser};
use crate::entities::{Role, UserModel};
use crate::errors::{Error, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sign-up, login and OAuth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/oauth/:provider", post(oauth_sign_in))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct OAuthRequest {
    id_token: String,
}

/// Token plus the user it was issued for
#[derive(Debug, Serialize)]
struct SessionResponse {
    token: String,
    expires_at: DateTime<Utc>,
    user: UserModel,
}

fn session_for(state: &AppState, user: UserModel) -> Result<SessionResponse> {
    let issued = state.tokens.issue(&user)?;
    Ok(SessionResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user,
    })
}

async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    // Self sign-up never grants admin
    let user = user::create_user(
        &state.db,
        NewUser {
            name: request.name,
            email: request.email,
            password: Some(request.password),
            role: Role::TeamMember,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(session_for(&state, user)?)))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = user::authenticate(&state.db, &request.email, &request.password).await?;
    Ok(Json(session_for(&state, user)?))
}

async fn oauth_sign_in(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiJson(request): ApiJson<OAuthRequest>,
) -> Result<Json<SessionResponse>> {
    let verifier = state
        .identity_verifiers
        .get(provider.as_str())
        .cloned()
        .ok_or_else(|| Error::not_found("Identity provider", &provider))?;
    let identity = verifier.verify(&request.id_token).await?;
    let user = user::sign_in_with_oauth(&state.db, &identity).await?;
    Ok(Json(session_for(&state, user)?))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserModel> {
    Json(user)
}
