//! Object store abstraction used by the upload and playback paths
mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod s3;

use std::collections::BTreeMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use error::{StoreError, StoreErrorKind, StoreResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryObjectStore, MemoryObject, RecordedPresign};
pub use s3::S3ObjectStore;

use crate::upload::{CompletedObject, UploadedPart};

/// Canned ACL applied to an object at write time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectAcl {
    /// Only the bucket owner can read the object
    Private,
    /// Anyone can read the object
    PublicRead,
}

impl ObjectAcl {
    /// Value sent in the `x-amz-acl` header
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
        }
    }
}

/// A signed request the client replays against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedRequest {
    /// Presigned URL
    pub url: String,
    /// Signed headers the client must send along with the request
    pub headers: BTreeMap<String, String>,
}

/// Byte stream of an object body
pub type ObjectBody = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Object fetched from the store
pub struct StoredObject {
    /// Content type reported by the store, if any
    pub content_type: Option<String>,
    /// Content length reported by the store, if any
    pub content_length: Option<u64>,
    /// Object payload
    pub body: ObjectBody,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Operations the service needs from an S3-compatible object store
///
/// Implementations must be safe to share between concurrent requests. All
/// session state lives in the store itself, keyed by upload id.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Opens a multipart upload session and returns the store-issued upload id
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: ObjectAcl,
    ) -> StoreResult<String>;

    /// Presigns a single `UploadPart` request
    async fn presign_upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StoreResult<PresignedRequest>;

    /// Assembles the object from `parts`, which must already be in ascending order
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> StoreResult<CompletedObject>;

    /// Discards a multipart upload session and its uploaded parts
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StoreResult<()>;

    /// Presigns a single `PutObject` request
    async fn presign_put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: ObjectAcl,
        expires_in: Duration,
    ) -> StoreResult<PresignedRequest>;

    /// Fetches an object
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject>;
}
