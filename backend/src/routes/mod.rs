mod docs;
mod health;
pub mod v1;
pub mod video;

use aide::axum::{routing::get, ApiRouter};

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .merge(v1::handler())
        .route("/api/video/{*path}", axum::routing::get(video::proxy))
}
