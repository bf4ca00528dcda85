//! Maps stored object keys to routes on the video proxy

use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

/// Route prefix the video proxy is mounted under
pub const VIDEO_PROXY_PREFIX: &str = "/api/video";

/// Errors resolving a playback path
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlaybackError {
    /// Nothing left once leading separators are stripped
    #[error("Stored path is empty")]
    EmptyPath,
}

/// A stored key and the proxy path the browser should request instead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PlaybackReference {
    /// Object key in the processed-media bucket
    pub raw_key: String,
    /// Path served by the video proxy
    pub proxied_path: String,
}

impl PlaybackReference {
    /// Resolves `stored_path` to a proxy path
    ///
    /// Leading separators are ignored, so `/videos/a.mp4` and `videos/a.mp4`
    /// resolve to the same reference.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::EmptyPath` if no key remains
    pub fn resolve(stored_path: &str) -> Result<Self, PlaybackError> {
        let raw_key = stored_path.trim().trim_start_matches('/');
        if raw_key.is_empty() {
            return Err(PlaybackError::EmptyPath);
        }

        Ok(Self {
            raw_key: raw_key.to_string(),
            proxied_path: format!("{VIDEO_PROXY_PREFIX}/{raw_key}"),
        })
    }
}

/// Shorthand for [`PlaybackReference::resolve`] returning only the proxy path
///
/// # Errors
///
/// Returns `PlaybackError::EmptyPath` if no key remains
pub fn resolve_playback_url(stored_path: &str) -> Result<String, PlaybackError> {
    PlaybackReference::resolve(stored_path).map(|reference| reference.proxied_path)
}
