use axum::{body::Body, http::Request, response::Response, Router};
use media_backend::{
    media_storage::{MediaBuckets, MediaStorage},
    server,
    storage::InMemoryObjectStore,
    types::Environment,
};
use std::sync::Arc;
use tower::ServiceExt;

pub const UPLOAD_BUCKET: &str = "test-course-uploads";
pub const PROCESSED_BUCKET: &str = "test-course-processed";
pub const PUBLIC_ASSET_BASE_URL: &str = "https://cdn.example.test";

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    // Load test environment variables
    dotenvy::from_path(".env.example").ok();

    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Router wired to an in-memory object store the test can inspect
pub struct TestSetup {
    pub router: Router,
    pub environment: Environment,
    pub store: Arc<InMemoryObjectStore>,
    pub media_storage: Arc<MediaStorage>,
}

impl TestSetup {
    pub fn new() -> Self {
        setup_test_env();

        let environment = Environment::Development;
        let store = Arc::new(InMemoryObjectStore::new());

        let media_storage = Arc::new(MediaStorage::new(
            store.clone(),
            MediaBuckets {
                uploads: UPLOAD_BUCKET.to_string(),
                processed: PROCESSED_BUCKET.to_string(),
            },
            Some(PUBLIC_ASSET_BASE_URL.to_string()),
        ));

        let router = server::router(environment, media_storage.clone());

        Self {
            router,
            environment,
            store,
            media_storage,
        }
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }
}
