//! Media storage service shared by the HTTP handlers

use std::sync::Arc;

use tracing::debug;

use crate::storage::{ObjectStore, StoreResult, StoredObject};
use crate::upload::{MultipartCoordinator, PresignedUrlIssuer};

/// Bucket names the service reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBuckets {
    /// Bucket receiving client uploads
    pub uploads: String,
    /// Bucket holding processed media served by the video proxy
    pub processed: String,
}

/// Upload coordinator, URL issuer and playback reads over one object store
pub struct MediaStorage {
    store: Arc<dyn ObjectStore>,
    coordinator: MultipartCoordinator,
    issuer: PresignedUrlIssuer,
    buckets: MediaBuckets,
    public_asset_base_url: Option<String>,
}

impl MediaStorage {
    /// Creates a new media storage service
    ///
    /// # Arguments
    ///
    /// * `store` - Object store client, injected so tests can substitute it
    /// * `buckets` - Upload and processed-media bucket names
    /// * `public_asset_base_url` - Optional base URL public-read objects are served from
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        buckets: MediaBuckets,
        public_asset_base_url: Option<String>,
    ) -> Self {
        Self {
            coordinator: MultipartCoordinator::new(store.clone()),
            issuer: PresignedUrlIssuer::new(store.clone()),
            store,
            buckets,
            public_asset_base_url,
        }
    }

    /// Multipart upload coordinator
    #[must_use]
    pub const fn coordinator(&self) -> &MultipartCoordinator {
        &self.coordinator
    }

    /// Presigned URL issuer for direct uploads
    #[must_use]
    pub const fn issuer(&self) -> &PresignedUrlIssuer {
        &self.issuer
    }

    /// Bucket receiving client uploads
    #[must_use]
    pub fn upload_bucket(&self) -> &str {
        &self.buckets.uploads
    }

    /// Bucket the video proxy reads from
    #[must_use]
    pub fn processed_bucket(&self) -> &str {
        &self.buckets.processed
    }

    /// Public URL of a public-read object, when a public base URL is configured
    #[must_use]
    pub fn public_url(&self, key: &str) -> Option<String> {
        self.public_asset_base_url
            .as_deref()
            .map(|base| format!("{}/{key}", base.trim_end_matches('/')))
    }

    /// Fetches an object from the processed-media bucket
    ///
    /// # Errors
    ///
    /// Returns the store error unchanged so the caller can log its kind
    pub async fn fetch_processed(&self, key: &str) -> StoreResult<StoredObject> {
        debug!(bucket = %self.buckets.processed, key, "Fetching processed media");
        self.store.get_object(&self.buckets.processed, key).await
    }
}
