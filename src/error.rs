// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Errors coming back from the auth provider carry a provider code
//! (`auth/email-already-exists`, `permission-denied`, ...). Those codes are
//! translated into a small fixed set of user-facing messages before they
//! leave the API; anything unmapped gets the generic message.

use crate::services::attendance_policy::DateRejection;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Message returned for provider codes with no specific translation.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Provider error code -> user-facing message.
const ERROR_MESSAGES: &[(&str, &str)] = &[
    (
        "auth/email-already-exists",
        "An account with this email already exists.",
    ),
    ("auth/invalid-email", "The email address is not valid."),
    ("auth/user-not-found", "No account found for this email."),
    ("auth/wrong-password", "Incorrect email or password."),
    ("auth/invalid-credential", "Incorrect email or password."),
    (
        "auth/weak-password",
        "Password must be at least 6 characters.",
    ),
    (
        "auth/too-many-requests",
        "Too many attempts. Please try again later.",
    ),
    (
        "permission-denied",
        "You do not have permission to perform this action.",
    ),
    ("not-found", "The requested record was not found."),
    (
        "unavailable",
        "Service is temporarily unavailable. Please try again.",
    ),
];

/// Translate a provider error code into a user-facing message.
pub fn user_message(code: &str) -> &'static str {
    ERROR_MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
        .unwrap_or(GENERIC_ERROR_MESSAGE)
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Date not allowed: {0}")]
    DateNotAllowed(DateRejection),

    #[error("Auth provider error: {code}")]
    Identity { code: String },

    #[error("WhatsApp API error: {0}")]
    WhatsApp(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Build an auth provider error from a normalized provider code.
    pub fn identity(code: impl Into<String>) -> Self {
        AppError::Identity { code: code.into() }
    }

    /// Provider code for auth errors, if this is one.
    pub fn identity_code(&self) -> Option<&str> {
        match self {
            AppError::Identity { code } => Some(code),
            _ => None,
        }
    }
}

fn identity_status(code: &str) -> StatusCode {
    match code {
        "auth/email-already-exists" => StatusCode::CONFLICT,
        "auth/invalid-email" | "auth/weak-password" => StatusCode::BAD_REQUEST,
        "auth/user-not-found" | "auth/wrong-password" | "auth/invalid-credential" => {
            StatusCode::UNAUTHORIZED
        }
        "auth/too-many-requests" => StatusCode::TOO_MANY_REQUESTS,
        "permission-denied" => StatusCode::FORBIDDEN,
        "not-found" => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                Some(errors.to_string()),
            ),
            AppError::DateNotAllowed(rejection) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "date_not_allowed",
                Some(rejection.to_string()),
            ),
            AppError::Identity { code } => {
                tracing::warn!(code = %code, "Auth provider rejected request");
                (
                    identity_status(code),
                    "auth_provider_error",
                    Some(user_message(code).to_string()),
                )
            }
            AppError::WhatsApp(msg) => {
                tracing::error!(error = %msg, "WhatsApp API error");
                (StatusCode::BAD_GATEWAY, "whatsapp_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
