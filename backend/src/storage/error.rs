//! Error types for object store operations

use aws_sdk_s3::{
    config::http::HttpResponse,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
};
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Result type for object store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during object store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Bucket, key or upload session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store unreachable, credentials rejected or 5xx from the store
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Store understood the request and refused it
    #[error("Request rejected by store: {0}")]
    Rejected(String),

    /// Presigning configuration could not be built
    #[error("Presign error: {0}")]
    Presign(String),
}

/// Coarse classification of a [`StoreError`], kept for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StoreErrorKind {
    /// See [`StoreError::NotFound`]
    NotFound,
    /// See [`StoreError::Unavailable`]
    Unavailable,
    /// See [`StoreError::Rejected`]
    Rejected,
    /// See [`StoreError::Presign`]
    Presign,
}

impl StoreError {
    /// Returns the error classification
    #[must_use]
    pub const fn kind(&self) -> StoreErrorKind {
        match self {
            Self::NotFound(_) => StoreErrorKind::NotFound,
            Self::Unavailable(_) => StoreErrorKind::Unavailable,
            Self::Rejected(_) => StoreErrorKind::Rejected,
            Self::Presign(_) => StoreErrorKind::Presign,
        }
    }

    /// Classifies an AWS SDK error by the HTTP status the store answered with
    ///
    /// Anything that never reached a service response (DNS, TLS, timeouts,
    /// credential resolution) is treated as the store being unavailable.
    pub(crate) fn from_sdk<E>(operation: &str, error: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        match &error {
            SdkError::ServiceError(service_err) => {
                let status = service_err.raw().status().as_u16();
                let code = service_err.err().code().unwrap_or("Unknown");
                let message = service_err.err().message().unwrap_or_default();
                let detail = format!("{operation}: {code} ({status}) {message}");

                match status {
                    404 => Self::NotFound(detail),
                    401 | 403 => Self::Unavailable(detail),
                    s if s >= 500 => Self::Unavailable(detail),
                    _ => Self::Rejected(detail),
                }
            }
            _ => Self::Unavailable(format!("{operation}: {}", DisplayErrorContext(&error))),
        }
    }
}
