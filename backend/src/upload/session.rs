//! Upload session data model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

use super::{UploadError, UploadResult};

/// Lifecycle status of a multipart upload session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UploadStatus {
    /// Session opened in the store
    Initiated,
    /// Presigned part URLs handed to the client
    PartsIssued,
    /// Object assembled; terminal
    Completed,
    /// Session discarded; terminal
    Aborted,
}

impl UploadStatus {
    /// Whether the state machine allows moving from `self` to `next`
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initiated, Self::PartsIssued)
                | (Self::Initiated | Self::PartsIssued, Self::Completed | Self::Aborted)
        )
    }

    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// A multipart upload session as seen by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Target bucket
    pub bucket: String,
    /// Target object key
    pub key: String,
    /// Opaque session handle issued by the store
    pub upload_id: String,
    /// Content type of the assembled object
    pub content_type: String,
    status: UploadStatus,
}

impl UploadSession {
    pub(crate) fn new(bucket: &str, key: &str, upload_id: String, content_type: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
            content_type: content_type.to_string(),
            status: UploadStatus::Initiated,
        }
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> UploadStatus {
        self.status
    }

    /// Moves the session to `next`
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidTransition` if the move is not allowed,
    /// in particular out of any terminal status
    pub fn transition(&mut self, next: UploadStatus) -> UploadResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(UploadError::InvalidTransition {
                upload_id: self.upload_id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Presigned URL for one part of a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    /// 1-based ordering key
    pub part_number: i32,
    /// Presigned `UploadPart` URL
    pub url: String,
    /// When the URL stops being accepted by the store
    pub expires_at: DateTime<Utc>,
    /// Signed headers the client must send with the part
    pub headers: BTreeMap<String, String>,
}

/// Part identifier reported by the client after uploading a part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UploadedPart {
    /// Part number the ETag belongs to
    pub part_number: i32,
    /// ETag returned by the store for the part
    #[serde(alias = "etag", alias = "ETag")]
    pub e_tag: String,
}

impl UploadedPart {
    /// Creates a part identifier
    pub fn new(part_number: i32, e_tag: impl Into<String>) -> Self {
        Self {
            part_number,
            e_tag: e_tag.into(),
        }
    }
}

/// Object assembled by a completed multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedObject {
    /// Bucket holding the object
    pub bucket: String,
    /// Object key
    pub key: String,
    /// ETag of the assembled object
    pub e_tag: String,
    /// Location URL reported by the store
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> UploadSession {
        UploadSession::new("bucket", "videos/a.mp4", "upload-1".to_string(), "video/mp4")
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut session = session();
        assert_eq!(session.status(), UploadStatus::Initiated);

        session.transition(UploadStatus::PartsIssued).unwrap();
        session.transition(UploadStatus::Completed).unwrap();
        assert_eq!(session.status(), UploadStatus::Completed);
        assert!(session.status().is_terminal());
    }

    #[test]
    fn test_abort_from_any_open_status() {
        let mut initiated = session();
        initiated.transition(UploadStatus::Aborted).unwrap();

        let mut issued = session();
        issued.transition(UploadStatus::PartsIssued).unwrap();
        issued.transition(UploadStatus::Aborted).unwrap();
        assert_eq!(issued.status(), UploadStatus::Aborted);
    }

    #[test]
    fn test_terminal_statuses_are_final() {
        let mut completed = session();
        completed.transition(UploadStatus::Completed).unwrap();

        for next in [
            UploadStatus::Initiated,
            UploadStatus::PartsIssued,
            UploadStatus::Completed,
            UploadStatus::Aborted,
        ] {
            let err = completed.transition(next).unwrap_err();
            assert!(matches!(
                err,
                UploadError::InvalidTransition {
                    from: UploadStatus::Completed,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_cannot_reissue_or_go_back() {
        let mut issued = session();
        issued.transition(UploadStatus::PartsIssued).unwrap();
        assert!(issued.transition(UploadStatus::PartsIssued).is_err());
        assert!(issued.transition(UploadStatus::Initiated).is_err());
    }

    #[test]
    fn test_uploaded_part_accepts_etag_aliases() {
        let part: UploadedPart =
            serde_json::from_str(r#"{"part_number": 2, "ETag": "\"abc\""}"#).unwrap();
        assert_eq!(part, UploadedPart::new(2, "\"abc\""));

        let part: UploadedPart =
            serde_json::from_str(r#"{"part_number": 3, "e_tag": "def"}"#).unwrap();
        assert_eq!(part.e_tag, "def");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(UploadStatus::PartsIssued.to_string(), "parts_issued");
    }
}
