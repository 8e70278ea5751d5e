//! Typed failures of the portal endpoints and their JSON rendering.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use super::validation::FieldError;

pub const MSG_INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const MSG_RATE_LIMITED: &str = "Too many login attempts. Please try again later.";
pub const MSG_ACCESS_DENIED: &str = "Access denied. Please log in to continue.";
pub const MSG_SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
pub const MSG_SERVER_ERROR: &str = "Server error. Please try again later.";

/// Body of every failed request.
#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Field-level failures; `message` is already worded for the form.
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
    #[error("{MSG_INVALID_CREDENTIALS}")]
    Authentication,
    #[error("{MSG_RATE_LIMITED}")]
    RateLimited { retry_after_seconds: u64 },
    #[error("{MSG_ACCESS_DENIED}")]
    AccessDenied,
    #[error("{MSG_SESSION_EXPIRED}")]
    SessionExpired,
    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),
    #[error("internal failure: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication | Self::AccessDenied | Self::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    /// Internals are logged server-side; the client only sees a generic message.
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors, retry_after_seconds) = match self {
            Self::Validation { message, errors } => (message, errors, None),
            Self::RateLimited {
                retry_after_seconds,
            } => (MSG_RATE_LIMITED.to_string(), Vec::new(), Some(retry_after_seconds)),
            Self::Persistence(err) => {
                error!("Persistence failure: {err:#}");
                (MSG_SERVER_ERROR.to_string(), Vec::new(), None)
            }
            Self::Internal(err) => {
                error!("Unexpected failure: {err:#}");
                (MSG_SERVER_ERROR.to_string(), Vec::new(), None)
            }
            other => (other.to_string(), Vec::new(), None),
        };

        let body = Json(ErrorBody {
            success: false,
            message,
            errors,
            retry_after_seconds,
        });

        let mut response = (status, body).into_response();
        if let Some(seconds) = retry_after_seconds {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}
