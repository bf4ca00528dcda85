use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{Extension, Json};
use axum_valid::Valid;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::{
    media_storage::MediaStorage,
    playback::PlaybackReference,
    storage::ObjectAcl,
    types::AppError,
    upload::{PartDescriptor, UploadStatus, UploadedPart, MAX_KEY_BYTES, MAX_PARTS},
};

/// Key length bound in the integer type the `validator` derive expects
const MAX_KEY_LEN: u64 = MAX_KEY_BYTES as u64;

/// Request to open a multipart upload and receive its part URLs
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct StartMultipartRequest {
    /// Object key, e.g. `videos/rust-101/lesson-1.mp4`
    #[validate(length(min = 1, max = MAX_KEY_LEN))]
    pub key: String,
    /// MIME type of the assembled object
    #[validate(length(min = 1, max = 255))]
    pub content_type: String,
    /// Number of chunks the client splits the file into
    #[validate(range(min = 1, max = MAX_PARTS))]
    pub total_parts: i32,
}

/// Request to issue part URLs for an already open session
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct IssuePartsRequest {
    /// Object key the session was opened for
    #[validate(length(min = 1, max = MAX_KEY_LEN))]
    pub key: String,
    /// Upload id returned when the session was opened
    #[validate(length(min = 1))]
    pub upload_id: String,
    /// Number of chunks the client splits the file into
    #[validate(range(min = 1, max = MAX_PARTS))]
    pub total_parts: i32,
}

/// Request to assemble the uploaded parts
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CompleteMultipartRequest {
    /// Object key the session was opened for
    #[validate(length(min = 1, max = MAX_KEY_LEN))]
    pub key: String,
    /// Upload id returned when the session was opened
    #[validate(length(min = 1))]
    pub upload_id: String,
    /// Part numbers and ETags collected by the client, in any order
    pub parts: Vec<UploadedPart>,
}

/// Request to discard an open session
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct AbortMultipartRequest {
    /// Object key the session was opened for
    #[validate(length(min = 1, max = MAX_KEY_LEN))]
    pub key: String,
    /// Upload id returned when the session was opened
    #[validate(length(min = 1))]
    pub upload_id: String,
}

/// Request for a direct upload URL
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct PresignedUrlRequest {
    /// Object key, e.g. `thumbnails/rust-101.png`
    #[validate(length(min = 1, max = MAX_KEY_LEN))]
    pub key: String,
    /// MIME type of the object
    #[validate(length(min = 1, max = 255))]
    pub content_type: String,
}

/// Presigned URL for a single part
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PartUrlResponse {
    /// 1-based part number
    pub part_number: i32,
    /// Presigned URL to PUT the part to
    pub url: String,
    /// ISO-8601 UTC timestamp when the URL expires
    pub expires_at: String,
    /// Headers to send with the PUT
    pub headers: BTreeMap<String, String>,
}

impl From<PartDescriptor> for PartUrlResponse {
    fn from(part: PartDescriptor) -> Self {
        Self {
            part_number: part.part_number,
            url: part.url,
            expires_at: part.expires_at.to_rfc3339(),
            headers: part.headers,
        }
    }
}

/// Opened session with its part URLs
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StartMultipartResponse {
    /// Bucket the object is assembled in
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Session handle to pass back on completion
    pub upload_id: String,
    /// Session status
    pub status: UploadStatus,
    /// One URL per part, ordered by part number
    pub parts: Vec<PartUrlResponse>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IssuePartsResponse {
    /// One URL per part, ordered by part number
    pub parts: Vec<PartUrlResponse>,
}

/// Assembled object and where to play it back
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CompleteMultipartResponse {
    /// Bucket holding the object
    pub bucket: String,
    /// Object key
    pub key: String,
    /// ETag of the assembled object
    pub e_tag: String,
    /// Location reported by the store
    pub location: Option<String>,
    /// Video proxy path for playback
    pub playback_path: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AbortMultipartResponse {
    /// Session that was discarded
    pub upload_id: String,
    /// Always `aborted`
    pub status: UploadStatus,
}

/// Direct upload URL for a public-read object
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PresignedUrlResponse {
    /// Presigned URL to PUT the object to
    pub url: String,
    /// ISO-8601 UTC timestamp when the URL expires
    pub expires_at: String,
    /// ACL the object is written with
    pub acl: ObjectAcl,
    /// Headers to send with the PUT
    pub headers: BTreeMap<String, String>,
    /// Where the object can be read once uploaded, if public hosting is configured
    pub public_url: Option<String>,
}

/// Opens a multipart upload session and issues presigned URLs for every part
///
/// The client uploads each part directly to storage, collects the returned
/// ETags and submits them to the completion endpoint.
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Invalid key, content type or part count
/// - `503 SERVICE_UNAVAILABLE` - Storage unreachable
#[instrument(skip(media_storage, payload), fields(key = %payload.key, total_parts = payload.total_parts))]
pub async fn start_multipart_upload(
    Extension(media_storage): Extension<Arc<MediaStorage>>,
    Valid(Json(payload)): Valid<Json<StartMultipartRequest>>,
) -> Result<Json<StartMultipartResponse>, AppError> {
    let (session, parts) = media_storage
        .coordinator()
        .start(
            media_storage.upload_bucket(),
            &payload.key,
            &payload.content_type,
            payload.total_parts,
        )
        .await?;

    Ok(Json(StartMultipartResponse {
        status: session.status(),
        bucket: session.bucket,
        key: session.key,
        upload_id: session.upload_id,
        parts: parts.into_iter().map(Into::into).collect(),
    }))
}

/// Issues a fresh set of part URLs for an open session
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Invalid key or part count
/// - `503 SERVICE_UNAVAILABLE` - Storage unreachable
#[instrument(skip(media_storage, payload), fields(upload_id = %payload.upload_id))]
pub async fn issue_part_urls(
    Extension(media_storage): Extension<Arc<MediaStorage>>,
    Valid(Json(payload)): Valid<Json<IssuePartsRequest>>,
) -> Result<Json<IssuePartsResponse>, AppError> {
    let parts = media_storage
        .coordinator()
        .issue_parts(
            media_storage.upload_bucket(),
            &payload.key,
            &payload.upload_id,
            payload.total_parts,
        )
        .await?;

    Ok(Json(IssuePartsResponse {
        parts: parts.into_iter().map(Into::into).collect(),
    }))
}

/// Completes a multipart upload from the client-reported part list
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Invalid key
/// - `409 CONFLICT` - Empty, duplicated or non-contiguous parts, or the store
///   refused the completion (unknown, completed or aborted session)
/// - `503 SERVICE_UNAVAILABLE` - Storage unreachable
#[instrument(skip(media_storage, payload), fields(upload_id = %payload.upload_id))]
pub async fn complete_multipart_upload(
    Extension(media_storage): Extension<Arc<MediaStorage>>,
    Valid(Json(payload)): Valid<Json<CompleteMultipartRequest>>,
) -> Result<Json<CompleteMultipartResponse>, AppError> {
    let completed = media_storage
        .coordinator()
        .complete(
            media_storage.upload_bucket(),
            &payload.key,
            &payload.upload_id,
            payload.parts,
        )
        .await?;

    let playback = PlaybackReference::resolve(&completed.key)?;

    Ok(Json(CompleteMultipartResponse {
        bucket: completed.bucket,
        key: completed.key,
        e_tag: completed.e_tag,
        location: completed.location,
        playback_path: playback.proxied_path,
    }))
}

/// Aborts an open multipart upload and discards its parts
///
/// # Errors
///
/// - `404 NOT_FOUND` - Session unknown, already completed or aborted
/// - `503 SERVICE_UNAVAILABLE` - Storage unreachable
#[instrument(skip(media_storage, payload), fields(upload_id = %payload.upload_id))]
pub async fn abort_multipart_upload(
    Extension(media_storage): Extension<Arc<MediaStorage>>,
    Valid(Json(payload)): Valid<Json<AbortMultipartRequest>>,
) -> Result<Json<AbortMultipartResponse>, AppError> {
    media_storage
        .coordinator()
        .abort(
            media_storage.upload_bucket(),
            &payload.key,
            &payload.upload_id,
        )
        .await?;

    Ok(Json(AbortMultipartResponse {
        upload_id: payload.upload_id,
        status: UploadStatus::Aborted,
    }))
}

/// Creates a presigned URL for a direct, publicly readable upload
///
/// Meant for small assets such as thumbnails and course images. The URL is
/// valid for ten minutes.
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Invalid key or content type
/// - `503 SERVICE_UNAVAILABLE` - Storage unreachable
#[instrument(skip(media_storage, payload), fields(key = %payload.key))]
pub async fn create_presigned_upload_url(
    Extension(media_storage): Extension<Arc<MediaStorage>>,
    Valid(Json(payload)): Valid<Json<PresignedUrlRequest>>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    let presigned = media_storage
        .issuer()
        .single_object_url(
            media_storage.upload_bucket(),
            &payload.key,
            &payload.content_type,
        )
        .await?;

    Ok(Json(PresignedUrlResponse {
        url: presigned.url,
        expires_at: presigned.expires_at.to_rfc3339(),
        acl: presigned.acl,
        headers: presigned.headers,
        public_url: media_storage.public_url(&payload.key),
    }))
}
