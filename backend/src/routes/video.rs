use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path},
    http::{
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use tracing::{instrument, warn};

use crate::media_storage::MediaStorage;

/// Cache directive sent with every proxied video
pub const VIDEO_CACHE_CONTROL: &str = "public, max-age=3600";

/// Streams an object from the processed-media bucket
///
/// Any failure, whether a missing key, a store outage or rejected
/// credentials, is answered with the same `404 {"error":"Not found"}`. The
/// actual error kind is only logged.
#[instrument(skip(media_storage))]
pub async fn proxy(
    Extension(media_storage): Extension<Arc<MediaStorage>>,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    let Path(path) = match path {
        Ok(path) => path,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable video path");
            return not_found();
        }
    };

    let key = path.trim_start_matches('/');
    if key.is_empty() {
        return not_found();
    }

    let object = match media_storage.fetch_processed(key).await {
        Ok(object) => object,
        Err(err) => {
            warn!(key, error_kind = %err.kind(), error = %err, "Video fetch failed");
            return not_found();
        }
    };

    let content_type = object
        .content_type
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CACHE_CONTROL, VIDEO_CACHE_CONTROL)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*");

    if let Some(content_length) = object.content_length {
        response = response.header(CONTENT_LENGTH, content_length);
    }

    response
        .body(Body::from_stream(object.body))
        .unwrap_or_else(|err| {
            warn!(key, error = %err, "Invalid response headers from store");
            not_found()
        })
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
