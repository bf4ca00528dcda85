//! Three-phase multipart upload protocol: initiate, issue part URLs, complete

use std::sync::Arc;

use chrono::Utc;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{info, instrument, warn};

use super::issuer::MULTIPART_ACL;
use super::{
    validate_bucket, validate_content_type, validate_object_key, CompletedObject,
    CompletionError, PartDescriptor, PresignedUrlIssuer, UploadError, UploadResult,
    UploadSession, UploadStatus, UploadedPart, MAX_PARTS,
};
use crate::storage::{ObjectStore, StoreError};

/// Presign requests in flight at once while issuing part URLs
const PART_URL_CONCURRENCY: usize = 8;

/// Coordinates multipart uploads against an injected object store
#[derive(Clone)]
pub struct MultipartCoordinator {
    store: Arc<dyn ObjectStore>,
    issuer: PresignedUrlIssuer,
}

impl MultipartCoordinator {
    /// Creates a coordinator on top of `store`
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            issuer: PresignedUrlIssuer::new(store.clone()),
            store,
        }
    }

    /// Opens a private multipart upload session
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidInput` for an invalid bucket, key or content type
    /// Returns `UploadError::StorageUnavailable` if the store cannot open the session
    #[instrument(skip(self), fields(upload_id))]
    pub async fn initiate(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> UploadResult<UploadSession> {
        validate_bucket(bucket)?;
        validate_object_key(key)?;
        validate_content_type(content_type)?;

        let upload_id = self
            .store
            .create_multipart_upload(bucket, key, content_type, MULTIPART_ACL)
            .await
            .map_err(UploadError::StorageUnavailable)?;

        tracing::Span::current().record("upload_id", upload_id.as_str());
        info!("Multipart upload initiated");

        Ok(UploadSession::new(bucket, key, upload_id, content_type))
    }

    /// Issues one presigned URL per part, ordered by ascending part number
    ///
    /// All URLs share one issue timestamp and expire together. A failure part
    /// way through is not rolled back: URLs already issued stay valid until
    /// they expire, and the caller should start over with a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidInput` for an invalid bucket or key, or if
    /// `total_parts` is outside `1..=10000`
    /// Returns `UploadError::StorageUnavailable` if any presign request fails
    #[instrument(skip(self))]
    pub async fn issue_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        total_parts: i32,
    ) -> UploadResult<Vec<PartDescriptor>> {
        validate_bucket(bucket)?;
        validate_object_key(key)?;
        validate_total_parts(total_parts)?;
        if upload_id.is_empty() {
            return Err(UploadError::InvalidInput("upload id is empty".to_string()));
        }

        let issued_at = Utc::now();

        // `buffered` yields results in input order, so the output stays sorted
        let parts = stream::iter(1..=total_parts)
            .map(|part_number| {
                self.issuer
                    .part_url(bucket, key, upload_id, part_number, issued_at)
            })
            .buffered(PART_URL_CONCURRENCY)
            .try_collect::<Vec<PartDescriptor>>()
            .await
            .inspect_err(|e| warn!(error = %e, "Issuing part URLs failed"))?;

        info!(part_count = parts.len(), "Part URLs issued");

        Ok(parts)
    }

    /// Initiates a session and issues its part URLs in one step
    ///
    /// # Errors
    ///
    /// See [`Self::initiate`] and [`Self::issue_parts`]
    pub async fn start(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        total_parts: i32,
    ) -> UploadResult<(UploadSession, Vec<PartDescriptor>)> {
        // Checked up front so bad input never opens a session
        validate_total_parts(total_parts)?;

        let mut session = self.initiate(bucket, key, content_type).await?;
        let parts = self
            .issue_parts(bucket, key, &session.upload_id, total_parts)
            .await?;
        session.transition(UploadStatus::PartsIssued)?;

        Ok((session, parts))
    }

    /// Assembles the object from the caller-reported parts
    ///
    /// Parts are sorted by part number before submission, so the order in
    /// which the client reports them does not matter. The list must cover
    /// `1..=n` exactly once. A successful completion consumes the session.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Completion` if the part list is empty, has gaps or
    /// duplicates, or if the store rejects the request
    /// Returns `UploadError::StorageUnavailable` if the store cannot be reached
    #[instrument(skip(self, parts), fields(part_count = parts.len()))]
    pub async fn complete(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> UploadResult<CompletedObject> {
        validate_bucket(bucket)?;
        validate_object_key(key)?;

        let completion_error = |source: CompletionError| UploadError::Completion {
            upload_id: upload_id.to_string(),
            source,
        };

        let parts = prepare_parts(parts).map_err(completion_error)?;

        match self
            .store
            .complete_multipart_upload(bucket, key, upload_id, &parts)
            .await
        {
            Ok(object) => {
                info!(e_tag = %object.e_tag, "Multipart upload completed");
                Ok(object)
            }
            Err(err @ StoreError::Unavailable(_)) => Err(UploadError::StorageUnavailable(err)),
            Err(err) => {
                warn!(error = %err, error_kind = %err.kind(), "Store rejected completion");
                Err(completion_error(CompletionError::Store(err)))
            }
        }
    }

    /// Discards an open session and any parts uploaded to it
    ///
    /// Sessions that are never completed nor aborted are left to the bucket's
    /// own lifecycle rules.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::SessionNotFound` if the store does not know the session
    /// Returns `UploadError::StorageUnavailable` for any other store failure
    #[instrument(skip(self))]
    pub async fn abort(&self, bucket: &str, key: &str, upload_id: &str) -> UploadResult<()> {
        validate_bucket(bucket)?;
        validate_object_key(key)?;

        match self.store.abort_multipart_upload(bucket, key, upload_id).await {
            Ok(()) => {
                info!("Multipart upload aborted");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(UploadError::SessionNotFound(upload_id.to_string())),
            Err(err) => Err(UploadError::StorageUnavailable(err)),
        }
    }
}

fn validate_total_parts(total_parts: i32) -> UploadResult<()> {
    if !(1..=MAX_PARTS).contains(&total_parts) {
        return Err(UploadError::InvalidInput(format!(
            "total_parts must be between 1 and {MAX_PARTS}, got {total_parts}"
        )));
    }
    Ok(())
}

/// Sorts `parts` ascending and checks they form the sequence `1..=n`
fn prepare_parts(mut parts: Vec<UploadedPart>) -> Result<Vec<UploadedPart>, CompletionError> {
    if parts.is_empty() {
        return Err(CompletionError::EmptyPartList);
    }

    parts.sort_by_key(|part| part.part_number);

    for (expected, part) in (1..).zip(&parts) {
        if !(1..=MAX_PARTS).contains(&part.part_number) {
            return Err(CompletionError::PartOutOfRange(part.part_number));
        }
        if part.part_number < expected {
            return Err(CompletionError::DuplicatePart(part.part_number));
        }
        if part.part_number > expected {
            return Err(CompletionError::MissingPart(expected));
        }
        if part.e_tag.trim().is_empty() {
            return Err(CompletionError::EmptyETag(part.part_number));
        }
    }

    Ok(parts)
}
