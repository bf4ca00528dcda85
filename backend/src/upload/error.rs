//! Error types for upload orchestration

use thiserror::Error;

use super::UploadStatus;
use crate::storage::StoreError;

/// Result type for upload operations
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors surfaced by the coordinator and the issuer
#[derive(Error, Debug)]
pub enum UploadError {
    /// Caller input failed validation before reaching the store
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The store could not be reached or refused the credentials
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),

    /// The part list was invalid or the store refused to assemble the object
    #[error("Completion of upload {upload_id} failed: {source}")]
    Completion {
        /// Session that failed to complete
        upload_id: String,
        /// Why it failed
        #[source]
        source: CompletionError,
    },

    /// The store does not know the session (already completed, aborted or expired)
    #[error("Upload session not found: {0}")]
    SessionNotFound(String),

    /// Session status change that the state machine does not allow
    #[error("Upload {upload_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Session being transitioned
        upload_id: String,
        /// Current status
        from: UploadStatus,
        /// Requested status
        to: UploadStatus,
    },
}

/// Reasons a completion request is refused
#[derive(Error, Debug)]
pub enum CompletionError {
    /// No parts were submitted
    #[error("No parts submitted")]
    EmptyPartList,

    /// Part number outside `1..=10000`
    #[error("Part number {0} is out of range")]
    PartOutOfRange(i32),

    /// The same part number was submitted twice
    #[error("Duplicate part number {0}")]
    DuplicatePart(i32),

    /// Part numbers are not contiguous
    #[error("Missing part number {0}")]
    MissingPart(i32),

    /// A part was submitted without its ETag
    #[error("Part {0} has an empty ETag")]
    EmptyETag(i32),

    /// The store rejected the completion request
    #[error("Store rejected completion: {0}")]
    Store(#[from] StoreError),
}
