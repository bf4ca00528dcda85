//! Presigned URL issuance

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{
    validate_bucket, validate_content_type, validate_object_key, PartDescriptor, UploadError,
    UploadResult, PART_URL_TTL, SINGLE_OBJECT_URL_TTL,
};
use crate::storage::{ObjectAcl, ObjectStore};

/// ACL for direct uploads; these serve public-facing assets such as thumbnails
const SINGLE_OBJECT_ACL: ObjectAcl = ObjectAcl::PublicRead;

/// ACL for multipart sessions; assembled videos are only read through the proxy
pub(crate) const MULTIPART_ACL: ObjectAcl = ObjectAcl::Private;

/// Presigned URL with expiration information
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL for PUT operations
    pub url: String,
    /// UTC timestamp when the URL expires
    pub expires_at: DateTime<Utc>,
    /// ACL the object is written with
    pub acl: ObjectAcl,
    /// Signed headers the client must send with the PUT
    pub headers: BTreeMap<String, String>,
}

/// Issues time-boxed write URLs
///
/// The issuer records expiry times but does not track them; a URL used after
/// `expires_at` is refused by the store itself.
#[derive(Clone)]
pub struct PresignedUrlIssuer {
    store: Arc<dyn ObjectStore>,
}

impl PresignedUrlIssuer {
    /// Creates an issuer on top of `store`
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Presigns a direct, non-chunked PUT of a publicly readable object
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidInput` for an invalid bucket, key or content type
    /// Returns `UploadError::StorageUnavailable` if presigning fails
    #[instrument(skip(self))]
    pub async fn single_object_url(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> UploadResult<PresignedUrl> {
        validate_bucket(bucket)?;
        validate_object_key(key)?;
        validate_content_type(content_type)?;

        let issued_at = Utc::now();
        let request = self
            .store
            .presign_put_object(
                bucket,
                key,
                content_type,
                SINGLE_OBJECT_ACL,
                SINGLE_OBJECT_URL_TTL,
            )
            .await
            .map_err(UploadError::StorageUnavailable)?;

        debug!("Issued single-object upload URL");

        Ok(PresignedUrl {
            url: request.url,
            expires_at: issued_at + SINGLE_OBJECT_URL_TTL,
            acl: SINGLE_OBJECT_ACL,
            headers: request.headers,
        })
    }

    /// Presigns the upload of one part of an open multipart session
    ///
    /// `issued_at` is shared by every part of a batch so that all URLs of one
    /// session expire together.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::StorageUnavailable` if presigning fails
    pub async fn part_url(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        issued_at: DateTime<Utc>,
    ) -> UploadResult<PartDescriptor> {
        let request = self
            .store
            .presign_upload_part(bucket, key, upload_id, part_number, PART_URL_TTL)
            .await
            .map_err(UploadError::StorageUnavailable)?;

        Ok(PartDescriptor {
            part_number,
            url: request.url,
            expires_at: issued_at + PART_URL_TTL,
            headers: request.headers,
        })
    }
}
