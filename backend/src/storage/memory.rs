//! In-process `ObjectStore` for tests
//!
//! Mirrors the parts of S3 multipart semantics the service depends on:
//! sessions are consumed by completion or abort, completion requires strictly
//! ascending part numbers whose ETags match uploaded parts.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::Mutex;

use super::{
    ObjectAcl, ObjectStore, PresignedRequest, StoreError, StoreResult, StoredObject,
};
use crate::upload::{CompletedObject, UploadedPart};

/// A presign call observed by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPresign {
    /// `UploadPart` or `PutObject`
    pub operation: &'static str,
    /// Target bucket
    pub bucket: String,
    /// Target key
    pub key: String,
    /// ACL signed into the request, if the operation carries one
    pub acl: Option<ObjectAcl>,
    /// Requested URL lifetime
    pub expires_in: Duration,
    /// Part number for `UploadPart`
    pub part_number: Option<i32>,
}

/// Object held by the store
#[derive(Debug, Clone)]
pub struct MemoryObject {
    /// Stored content type
    pub content_type: Option<String>,
    /// Object payload
    pub data: Bytes,
    /// Object ACL
    pub acl: ObjectAcl,
}

#[derive(Debug)]
struct Session {
    bucket: String,
    key: String,
    content_type: String,
    acl: ObjectAcl,
    parts: BTreeMap<i32, (String, Bytes)>,
}

#[derive(Debug, Default)]
struct State {
    sessions: HashMap<String, Session>,
    objects: HashMap<(String, String), MemoryObject>,
    presigns: Vec<RecordedPresign>,
    completions: Vec<Vec<i32>>,
    failing_part: Option<i32>,
}

/// Test double emulating an S3-compatible store in memory
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    state: Mutex<State>,
    next_upload_id: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryObjectStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes presigning of the given part number fail
    pub async fn fail_presign_for_part(&self, part_number: i32) {
        self.state.lock().await.failing_part = Some(part_number);
    }

    /// Stores an object directly, bypassing presigned URLs
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        data: impl Into<Bytes> + Send,
    ) {
        self.state.lock().await.objects.insert(
            (bucket.to_string(), key.to_string()),
            MemoryObject {
                content_type: content_type.map(ToString::to_string),
                data: data.into(),
                acl: ObjectAcl::Private,
            },
        );
    }

    /// Uploads a part the way a client would through its presigned URL
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the session does not exist
    pub async fn upload_part(
        &self,
        upload_id: &str,
        part_number: i32,
        data: impl Into<Bytes> + Send,
    ) -> StoreResult<String> {
        self.check_available()?;
        let data = data.into();
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::NotFound(format!("NoSuchUpload: {upload_id}")))?;

        let e_tag = format!("\"{upload_id}-{part_number}-{}\"", data.len());
        session.parts.insert(part_number, (e_tag.clone(), data));
        Ok(e_tag)
    }

    /// Presign calls observed so far
    pub async fn presigns(&self) -> Vec<RecordedPresign> {
        self.state.lock().await.presigns.clone()
    }

    /// ACL the session was opened with, if it is still open
    pub async fn session_acl(&self, upload_id: &str) -> Option<ObjectAcl> {
        self.state
            .lock()
            .await
            .sessions
            .get(upload_id)
            .map(|session| session.acl)
    }

    /// Number of sessions neither completed nor aborted
    pub async fn open_sessions(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Part numbers of each accepted completion, in submission order
    pub async fn completed_part_orders(&self) -> Vec<Vec<i32>> {
        self.state.lock().await.completions.clone()
    }

    /// Looks up a stored object
    pub async fn object(&self, bucket: &str, key: &str) -> Option<MemoryObject> {
        self.state
            .lock()
            .await
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "connection refused (in-memory store offline)".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: ObjectAcl,
    ) -> StoreResult<String> {
        self.check_available()?;
        let upload_id = format!(
            "mem-upload-{}",
            self.next_upload_id.fetch_add(1, Ordering::SeqCst) + 1
        );

        self.state.lock().await.sessions.insert(
            upload_id.clone(),
            Session {
                bucket: bucket.to_string(),
                key: key.to_string(),
                content_type: content_type.to_string(),
                acl,
                parts: BTreeMap::new(),
            },
        );

        Ok(upload_id)
    }

    async fn presign_upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StoreResult<PresignedRequest> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if state.failing_part == Some(part_number) {
            return Err(StoreError::Unavailable(format!(
                "UploadPart: presign failed for part {part_number}"
            )));
        }

        state.presigns.push(RecordedPresign {
            operation: "UploadPart",
            bucket: bucket.to_string(),
            key: key.to_string(),
            acl: None,
            expires_in,
            part_number: Some(part_number),
        });

        Ok(PresignedRequest {
            url: format!(
                "memory://{bucket}/{key}?partNumber={part_number}&uploadId={upload_id}&X-Amz-Expires={}",
                expires_in.as_secs()
            ),
            headers: BTreeMap::new(),
        })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> StoreResult<CompletedObject> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let session = state
            .sessions
            .get(upload_id)
            .filter(|session| session.bucket == bucket && session.key == key)
            .ok_or_else(|| StoreError::NotFound(format!("NoSuchUpload: {upload_id}")))?;

        if parts.is_empty() {
            return Err(StoreError::Rejected("MalformedXML: no parts".to_string()));
        }
        if parts
            .windows(2)
            .any(|pair| pair[0].part_number >= pair[1].part_number)
        {
            return Err(StoreError::Rejected("InvalidPartOrder".to_string()));
        }

        let mut data = BytesMut::new();
        for part in parts {
            match session.parts.get(&part.part_number) {
                Some((e_tag, bytes)) if *e_tag == part.e_tag => data.extend_from_slice(bytes),
                _ => {
                    return Err(StoreError::Rejected(format!(
                        "InvalidPart: part {} was not uploaded with that ETag",
                        part.part_number
                    )))
                }
            }
        }

        let object = MemoryObject {
            content_type: Some(session.content_type.clone()),
            data: data.freeze(),
            acl: session.acl,
        };

        state.sessions.remove(upload_id);
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), object);
        state
            .completions
            .push(parts.iter().map(|part| part.part_number).collect());

        Ok(CompletedObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            e_tag: format!("\"{upload_id}-{}\"", parts.len()),
            location: Some(format!("memory://{bucket}/{key}")),
        })
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let matches = state
            .sessions
            .get(upload_id)
            .is_some_and(|session| session.bucket == bucket && session.key == key);

        if !matches {
            return Err(StoreError::NotFound(format!("NoSuchUpload: {upload_id}")));
        }

        state.sessions.remove(upload_id);
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
        self.check_available()?;
        self.state.lock().await.presigns.push(RecordedPresign {
            operation: "PutObject",
            bucket: bucket.to_string(),
            key: key.to_string(),
            acl: Some(acl),
            expires_in,
            part_number: None,
        });

        let headers = BTreeMap::from([
            ("content-type".to_string(), content_type.to_string()),
            ("x-amz-acl".to_string(), acl.as_str().to_string()),
        ]);

        Ok(PresignedRequest {
            url: format!(
                "memory://{bucket}/{key}?X-Amz-Expires={}",
                expires_in.as_secs()
            ),
            headers,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        self.check_available()?;
        let object = self
            .object(bucket, key)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("NoSuchKey: {bucket}/{key}")))?;

        let content_length = u64::try_from(object.data.len()).ok();
        let body = futures::stream::iter(std::iter::once(Ok::<_, std::io::Error>(object.data)));

        Ok(StoredObject {
            content_type: object.content_type,
            content_length,
            body: Box::pin(body),
        })
    }
}
