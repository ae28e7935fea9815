//! JSON error responses.
//!
//! Every [`Error`] becomes `{"error": <message>, "status": <code>}`. Server
//! errors get a generic message; their underlying text is added as
//! `"detail"` only when the service runs with `expose_error_details`.

use crate::api::AppState;
use crate::errors::Error;
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Request, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Server-side error text carried from the error to the detail middleware
#[derive(Debug, Clone)]
struct ErrorDetail {
    message: String,
    detail: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthorized { reason } => {
                tracing::info!("Unauthorized: {}", reason);
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            Self::Forbidden { reason } => {
                tracing::warn!("Forbidden: {}", reason);
                (StatusCode::FORBIDDEN, reason.clone())
            }
            Self::NotFound { .. } => {
                tracing::info!("{}", self);
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Self::Validation { message } => {
                tracing::info!("Rejected input: {}", message);
                (StatusCode::BAD_REQUEST, message.clone())
            }
            Self::Conflict { message } => {
                tracing::info!("Conflict: {}", message);
                (StatusCode::CONFLICT, message.clone())
            }
            Self::IdentityProvider { .. } => {
                tracing::error!("{}", self);
                (
                    StatusCode::BAD_GATEWAY,
                    "Identity provider unavailable".to_string(),
                )
            }
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Token(_)
            | Self::PasswordHash { .. } => {
                tracing::error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));
        let mut response = (status, body).into_response();
        if status.is_server_error() {
            response.extensions_mut().insert(ErrorDetail {
                message,
                detail: self.to_string(),
            });
        }
        response
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// `Json` whose rejection is a 400 in the service's error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejection is a 400 in the service's error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

/// `Query` whose rejection is a 400 in the service's error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

/// Rewrites server error bodies to include `"detail"` when enabled.
pub async fn attach_error_detail(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.expose_error_details {
        return response;
    }
    let Some(ErrorDetail { message, detail }) = response.extensions().get::<ErrorDetail>().cloned()
    else {
        return response;
    };

    let status = response.status();
    let body = Json(json!({
        "error": message,
        "status": status.as_u16(),
        "detail": detail,
    }));
    (status, body).into_response()
}
