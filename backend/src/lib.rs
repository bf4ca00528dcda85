//! Course media upload backend

#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]

/// Media storage service shared by the handlers
pub mod media_storage;

/// Stored key to video proxy path resolution
pub mod playback;

/// HTTP routes
pub mod routes;

/// Server startup
pub mod server;

/// Object store abstraction and its S3 implementation
pub mod storage;

/// Environment configuration and API error types
pub mod types;

/// Multipart upload coordination and presigned URL issuance
pub mod upload;
