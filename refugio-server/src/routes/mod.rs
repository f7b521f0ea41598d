pub mod admin;
pub mod availability;
pub mod bookings;
pub mod feeds;
pub mod sync;
pub mod webhooks;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use refugio_core::RefugioError;
use refugio_core::payment::signature::constant_time_eq;
use serde::Serialize;
use tracing::{error, warn};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(feeds::router())
        .merge(availability::router())
        .merge(bookings::router())
        .merge(webhooks::router())
        .merge(sync::router())
        .merge(admin::router())
        .with_state(state)
}

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error already reduced to what the caller may see.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        AppError {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Collaborator details stay in the log; callers get a short message.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        let Some(core) = err.downcast_ref::<RefugioError>() else {
            error!(error = %err, "Unhandled error");
            return AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        };

        match core {
            RefugioError::Validation(msg) => AppError::invalid(msg.clone()),
            RefugioError::InvalidInterval(msg) | RefugioError::FeedParse(msg) => {
                AppError::invalid(msg.clone())
            }
            RefugioError::UnitNotFound(id) => {
                AppError::new(StatusCode::NOT_FOUND, format!("unknown unit '{}'", id))
            }
            RefugioError::Signature(msg) => {
                warn!(reason = %msg, "Rejected webhook signature");
                AppError::new(StatusCode::UNAUTHORIZED, "invalid signature")
            }
            RefugioError::FeedFetch(msg) => {
                warn!(error = %msg, "Feed fetch failed");
                AppError::new(StatusCode::BAD_GATEWAY, "the calendar feed could not be fetched")
            }
            RefugioError::Store(_) | RefugioError::Payment(_) => {
                error!(error = %core, "Collaborator unavailable");
                AppError::new(StatusCode::BAD_GATEWAY, "temporary error, please try again")
            }
            RefugioError::Config(_) | RefugioError::Io(_) | RefugioError::Serialization(_) => {
                error!(error = %core, "Internal error");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

/// Require `Authorization: Bearer <token>`. With no token configured the
/// protected routes are closed.
pub fn require_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected.filter(|t| !t.is_empty()) else {
        warn!("Protected route called but no sync.token is configured");
        return Err(AppError::unauthorized());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(AppError::unauthorized()),
    }
}
