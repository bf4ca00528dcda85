//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use anyhow::Context;
use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use tracing::Level;

use crate::media_storage::MediaBuckets;

/// LocalStack edge endpoint used in development
const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

/// Application environment configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack` unless `S3_ENDPOINT_URL` is set)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Errors
    ///
    /// Returns an error if `APP_ENV` contains an unknown value
    pub fn from_env() -> anyhow::Result<Self> {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => anyhow::bail!("Invalid environment: {env}"),
        }
    }

    /// Returns the bucket clients upload to
    ///
    /// # Errors
    ///
    /// Returns an error if `S3_UPLOAD_BUCKET` is not set outside development
    pub fn upload_bucket(&self) -> anyhow::Result<String> {
        self.bucket_var("S3_UPLOAD_BUCKET", "course-media-uploads")
    }

    /// Returns the bucket holding processed media for playback
    ///
    /// # Errors
    ///
    /// Returns an error if `S3_PROCESSED_BUCKET` is not set outside development
    pub fn processed_bucket(&self) -> anyhow::Result<String> {
        self.bucket_var("S3_PROCESSED_BUCKET", "course-media-processed")
    }

    /// Both bucket names
    ///
    /// # Errors
    ///
    /// See [`Self::upload_bucket`] and [`Self::processed_bucket`]
    pub fn media_buckets(&self) -> anyhow::Result<MediaBuckets> {
        Ok(MediaBuckets {
            uploads: self.upload_bucket()?,
            processed: self.processed_bucket()?,
        })
    }

    fn bucket_var(&self, name: &str, development_default: &str) -> anyhow::Result<String> {
        match self {
            Self::Production | Self::Staging => {
                env::var(name).with_context(|| format!("{name} environment variable is not set"))
            }
            Self::Development => {
                Ok(env::var(name).unwrap_or_else(|_| development_default.to_string()))
            }
        }
    }

    /// Base URL public-read assets are served from, if configured
    #[must_use]
    pub fn public_asset_base_url(&self) -> Option<String> {
        env::var("PUBLIC_ASSET_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Whether traces are exported through the Datadog agent
    #[must_use]
    pub const fn exports_traces(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Returns the endpoint URL to use for S3 instead of the AWS default
    #[must_use]
    pub fn override_s3_endpoint_url(&self) -> Option<String> {
        env::var("S3_ENDPOINT_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| match self {
                Self::Production | Self::Staging => None,
                Self::Development => Some(LOCALSTACK_ENDPOINT.to_string()),
            })
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config)
            .build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // S3-compatible stores (LocalStack, MinIO) need path-style addressing
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if let Some(endpoint_url) = self.override_s3_endpoint_url() {
            builder.set_endpoint_url(Some(endpoint_url));
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// Port the HTTP server binds to
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is set but not a valid port number
    pub fn port(&self) -> anyhow::Result<u16> {
        env::var("PORT").map_or(Ok(8002), |p| {
            p.parse().with_context(|| format!("Invalid PORT: {p}"))
        })
    }

    /// Time budget for producing a response
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        let secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(30);
        Duration::from_secs(secs)
    }

    /// Default log level, overridable with `TRACING_LEVEL`
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development => Level::DEBUG,
            })
    }
}
