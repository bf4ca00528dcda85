//! `ObjectStore` backed by the AWS S3 SDK

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{
    presigning::{PresignedRequest as AwsPresignedRequest, PresigningConfig},
    types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl},
    Client as S3Client,
};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::{
    ObjectAcl, ObjectStore, PresignedRequest, StoreError, StoreResult, StoredObject,
};
use crate::upload::{CompletedObject, UploadedPart};

/// S3-compatible object store client
#[derive(Clone)]
pub struct S3ObjectStore {
    s3_client: Arc<S3Client>,
}

impl S3ObjectStore {
    /// Wraps a pre-configured S3 client
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>) -> Self {
        Self { s3_client }
    }

    fn presigning_config(expires_in: Duration) -> StoreResult<PresigningConfig> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|e| StoreError::Presign(format!("Failed to create presigning config: {e}")))
    }
}

impl From<ObjectAcl> for ObjectCannedAcl {
    fn from(acl: ObjectAcl) -> Self {
        match acl {
            ObjectAcl::Private => Self::Private,
            ObjectAcl::PublicRead => Self::PublicRead,
        }
    }
}

impl From<AwsPresignedRequest> for PresignedRequest {
    fn from(request: AwsPresignedRequest) -> Self {
        Self {
            url: request.uri().to_string(),
            headers: request
                .headers()
                .map(|(name, value)| (name.to_lowercase(), value.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: ObjectAcl,
    ) -> StoreResult<String> {
        let output = self
            .s3_client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .acl(acl.into())
            .send()
            .await
            .map_err(|e| StoreError::from_sdk("CreateMultipartUpload", e))?;

        let upload_id = output.upload_id().ok_or_else(|| {
            StoreError::Rejected("CreateMultipartUpload: no upload id returned".to_string())
        })?;

        debug!(bucket, key, upload_id, "Multipart upload created");

        Ok(upload_id.to_string())
    }

    async fn presign_upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StoreResult<PresignedRequest> {
        let presigned = self
            .s3_client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .presigned(Self::presigning_config(expires_in)?)
            .await
            .map_err(|e| StoreError::from_sdk("UploadPart", e))?;

        Ok(presigned.into())
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> StoreResult<CompletedObject> {
        let completed_parts = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(&part.e_tag)
                    .build()
            })
            .collect();

        let multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        let output = self
            .s3_client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(multipart_upload)
            .send()
            .await
            .map_err(|e| StoreError::from_sdk("CompleteMultipartUpload", e))?;

        Ok(CompletedObject {
            bucket: output.bucket().unwrap_or(bucket).to_string(),
            key: output.key().unwrap_or(key).to_string(),
            e_tag: output.e_tag().unwrap_or_default().to_string(),
            location: output.location().map(ToString::to_string),
        })
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StoreResult<()> {
        self.s3_client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| StoreError::from_sdk("AbortMultipartUpload", e))?;

        Ok(())
    }

    async fn presign_put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: ObjectAcl,
        expires_in: Duration,
    ) -> StoreResult<PresignedRequest> {
        let presigned = self
            .s3_client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .acl(acl.into())
            .presigned(Self::presigning_config(expires_in)?)
            .await
            .map_err(|e| StoreError::from_sdk("PutObject", e))?;

        Ok(presigned.into())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        let output = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::from_sdk("GetObject", e))?;

        let content_type = output.content_type().map(ToString::to_string);
        let content_length = output.content_length().and_then(|len| u64::try_from(len).ok());
        let body = ReaderStream::new(output.body.into_async_read());

        Ok(StoredObject {
            content_type,
            content_length,
            body: Box::pin(body),
        })
    }
}
