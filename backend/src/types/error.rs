//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::playback::PlaybackError;
use crate::upload::UploadError;

/// API error response envelope returned by every upload action
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Always `false`
    success: bool,
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                success: false,
                allow_retry: retry,
                error: ErrorBody { code, message: msg },
            },
        }
    }

    /// HTTP status of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.error.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert upload errors to application errors
impl From<UploadError> for AppError {
    #[allow(clippy::cognitive_complexity)]
    fn from(err: UploadError) -> Self {
        match &err {
            UploadError::InvalidInput(msg) => {
                tracing::warn!("Invalid upload input: {msg}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_input",
                    "Invalid input provided",
                    false,
                )
            }
            UploadError::Completion { upload_id, source } => {
                tracing::warn!("Completion of {upload_id} failed: {source}");
                Self::new(
                    StatusCode::CONFLICT,
                    "completion_failed",
                    "Upload could not be completed",
                    false,
                )
            }
            UploadError::SessionNotFound(upload_id) => {
                tracing::debug!("Unknown upload session: {upload_id}");
                Self::new(
                    StatusCode::NOT_FOUND,
                    "upload_not_found",
                    "Upload session not found",
                    false,
                )
            }
            // Sessions only move through the state machine inside the
            // coordinator, so reaching this is a server bug
            UploadError::InvalidTransition { .. } => {
                tracing::error!("{err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
            UploadError::StorageUnavailable(source) => {
                tracing::error!(error_kind = %source.kind(), "Storage unavailable: {source}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage_unavailable",
                    "Storage service temporarily unavailable",
                    true,
                )
            }
        }
    }
}

/// Convert playback errors to application errors
impl From<PlaybackError> for AppError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::EmptyPath => Self::new(
                StatusCode::BAD_REQUEST,
                "invalid_input",
                "Stored path is empty",
                false,
            ),
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
