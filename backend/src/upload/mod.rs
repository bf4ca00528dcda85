//! Multipart and single-object upload orchestration
//!
//! The store is the only source of truth for session state; the types here are
//! views handed back to callers, so concurrent uploads never share anything.
mod coordinator;
mod error;
mod issuer;
mod session;

use std::time::Duration;

pub use coordinator::MultipartCoordinator;
pub use error::{CompletionError, UploadError, UploadResult};
pub use issuer::{PresignedUrl, PresignedUrlIssuer};
pub use session::{CompletedObject, PartDescriptor, UploadSession, UploadStatus, UploadedPart};

/// Lifetime of every presigned `UploadPart` URL
pub const PART_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Lifetime of a presigned single-object `PutObject` URL
pub const SINGLE_OBJECT_URL_TTL: Duration = Duration::from_secs(10 * 60);

/// Highest part number S3 accepts
pub const MAX_PARTS: i32 = 10_000;

/// Longest object key S3 accepts, in bytes
pub const MAX_KEY_BYTES: usize = 1024;

/// Checks that `key` is a non-empty, relative, traversal-free object path
///
/// # Errors
///
/// Returns `UploadError::InvalidInput` describing the first problem found
pub fn validate_object_key(key: &str) -> UploadResult<()> {
    if key.is_empty() {
        return Err(UploadError::InvalidInput("object key is empty".to_string()));
    }

    if key.len() > MAX_KEY_BYTES {
        return Err(UploadError::InvalidInput(format!(
            "object key is {} bytes (max {MAX_KEY_BYTES})",
            key.len()
        )));
    }

    if key.starts_with('/') {
        return Err(UploadError::InvalidInput(format!(
            "object key '{key}' must not start with '/'"
        )));
    }

    if key.chars().any(char::is_control) {
        return Err(UploadError::InvalidInput(
            "object key contains control characters".to_string(),
        ));
    }

    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(UploadError::InvalidInput(format!(
            "object key '{key}' contains an empty, '.' or '..' segment"
        )));
    }

    Ok(())
}

/// Checks that `content_type` parses as a MIME type
///
/// # Errors
///
/// Returns `UploadError::InvalidInput` if it does not
pub fn validate_content_type(content_type: &str) -> UploadResult<()> {
    content_type
        .parse::<mime::Mime>()
        .map(|_| ())
        .map_err(|e| UploadError::InvalidInput(format!("invalid content type '{content_type}': {e}")))
}

fn validate_bucket(bucket: &str) -> UploadResult<()> {
    if bucket.trim().is_empty() {
        return Err(UploadError::InvalidInput("bucket name is empty".to_string()));
    }
    Ok(())
}
