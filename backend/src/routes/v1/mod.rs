pub mod playback;
pub mod uploads;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};

/// Creates the v1 API router with all v1 handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/v1/uploads/multipart",
            post(uploads::start_multipart_upload),
        )
        .api_route("/v1/uploads/multipart/parts", post(uploads::issue_part_urls))
        .api_route(
            "/v1/uploads/multipart/complete",
            post(uploads::complete_multipart_upload),
        )
        .api_route(
            "/v1/uploads/multipart/abort",
            post(uploads::abort_multipart_upload),
        )
        .api_route(
            "/v1/uploads/presigned-url",
            post(uploads::create_presigned_upload_url),
        )
        .api_route("/v1/playback", get(playback::resolve_playback))
}
