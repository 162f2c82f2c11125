//! S3-compatible storage client
//!
//! Wraps the AWS SDK for S3-compatible storage access.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{http::HttpResponse, Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    operation::{get_object::GetObjectError, head_object::HeadObjectError},
    Client,
};
use chrono::DateTime;

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};

use super::traits::ObjectStore;
use super::types::{normalize_etag, ListOptions, ObjectList, ObjectMetadata, StorageObject};

/// S3-compatible storage client
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from configuration
    ///
    /// Static credentials are used when both keys are configured; otherwise
    /// the default AWS provider chain (environment, profile, IMDS) applies.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            builder = builder.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "estante",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            // MinIO and friends need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        let bucket = config.bucket.clone();
        match client.head_bucket().bucket(&bucket).send().await {
            Ok(_) => {
                tracing::info!("Connected to S3 bucket: {}", bucket);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not verify bucket {}: {}. Will attempt operations anyway.",
                    bucket,
                    DisplayErrorContext(&e)
                );
            }
        }

        Ok(Self { client, bucket })
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn head_object(&self, key: &str) -> Result<ObjectMetadata> {
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = matches!(e.as_service_error(), Some(HeadObjectError::NotFound(_)));
                classify_error(key, "head object", missing, &e)
            })?;

        Ok(ObjectMetadata {
            key: key.to_string(),
            size: response.content_length().unwrap_or(0),
            last_modified: response
                .last_modified()
                .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
            content_type: response.content_type().map(|s| s.to_string()),
            etag: response.e_tag().map(normalize_etag),
        })
    }

    async fn get_object(&self, key: &str) -> Result<StorageObject> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = matches!(e.as_service_error(), Some(GetObjectError::NoSuchKey(_)));
                classify_error(key, "get object", missing, &e)
            })?;

        let metadata = ObjectMetadata {
            key: key.to_string(),
            size: response.content_length().unwrap_or(0),
            last_modified: response
                .last_modified()
                .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
            content_type: response.content_type().map(|s| s.to_string()),
            etag: response.e_tag().map(normalize_etag),
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::SdkError(format!("Failed to read object body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(StorageObject { metadata, data })
    }

    async fn list_objects(&self, options: ListOptions) -> Result<ObjectList> {
        let mut request = self.client.list_objects_v2().bucket(&self.bucket);

        if let Some(prefix) = options.prefix {
            request = request.prefix(prefix);
        }

        if let Some(max_keys) = options.max_keys {
            request = request.max_keys(max_keys);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_error(&self.bucket, "list objects", false, &e))?;

        let objects: Vec<ObjectMetadata> = response
            .contents()
            .iter()
            .map(|obj| ObjectMetadata {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0),
                last_modified: obj
                    .last_modified()
                    .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                content_type: None, // Not available in list response
                etag: obj.e_tag().map(normalize_etag),
            })
            .collect();

        Ok(ObjectList {
            objects,
            is_truncated: response.is_truncated().unwrap_or(false),
        })
    }
}

/// Map an SDK failure onto the storage error taxonomy
fn classify_error<E>(
    key: &str,
    operation: &str,
    missing: bool,
    err: &SdkError<E, HttpResponse>,
) -> StorageError
where
    E: std::error::Error + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());

    if missing || status == Some(404) {
        return StorageError::ObjectNotFound(key.to_string());
    }

    let detail = format!("Failed to {} {}: {}", operation, key, DisplayErrorContext(err));
    match (err, status) {
        (_, Some(403)) => StorageError::AccessDenied(detail),
        (SdkError::DispatchFailure(_) | SdkError::TimeoutError(_), _) => {
            StorageError::ConnectionFailed(detail)
        }
        _ => StorageError::SdkError(detail),
    }
}
