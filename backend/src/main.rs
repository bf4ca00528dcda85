use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use media_backend::{
    media_storage::MediaStorage, server, storage::S3ObjectStore, types::Environment,
};
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env()?;

    // Staging/production export traces to Datadog, development logs to stdout
    let tracer = if environment.exports_traces() {
        // The guard must be kept alive for the duration of the program
        Some(datadog_tracing::init()?)
    } else {
        fmt()
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(
                        LevelFilter::from_level(environment.tracing_level()).into(),
                    )
                    .from_env_lossy(),
            )
            .init();
        None
    };

    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let media_storage = Arc::new(MediaStorage::new(
        Arc::new(S3ObjectStore::new(s3_client)),
        environment.media_buckets()?,
        environment.public_asset_base_url(),
    ));

    let result = server::start(environment, media_storage).await;

    if let Some((_guard, tracer_shutdown)) = tracer {
        tracer_shutdown.shutdown();
    }

    result
}
