//! Storage bucket API client
//!
//! Talks to a Supabase-style storage REST API (`/storage/v1/bucket`).

use std::time::Duration;

use async_trait::async_trait;
use ops_core::{BackendResult, BucketSpec, DomainError, LiveBucket, StorageBackend};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Storage API connection settings
#[derive(Debug, Clone)]
pub struct StorageClientConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    /// Service key sent as bearer token and `apikey` header
    pub service_key: String,
    pub timeout: Duration,
}

impl StorageClientConfig {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: service_key.into(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// HTTP implementation of StorageBackend
#[derive(Clone)]
pub struct StorageApiClient {
    client: Client,
    config: StorageClientConfig,
}

#[derive(Debug, Deserialize)]
struct BucketRow {
    name: String,
    #[serde(default)]
    public: bool,
    #[serde(default)]
    file_size_limit: Option<u64>,
}

#[derive(Debug, Serialize)]
struct BucketBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_size_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_mime_types: Option<&'a [String]>,
}

impl StorageApiClient {
    /// Create a new StorageApiClient
    pub fn new(config: StorageClientConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::StorageError(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| DomainError::StorageError(e.to_string()))
    }
}

/// Turn a non-success response into a domain error
async fn error_from(response: Response, bucket: &str) -> DomainError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let duplicate = status == StatusCode::CONFLICT
        || body.to_lowercase().contains("already exists")
        || body.contains("Duplicate");
    if duplicate {
        DomainError::AlreadyExists(format!("bucket {bucket}"))
    } else {
        DomainError::StorageError(format!("{status}: {body}"))
    }
}

#[async_trait]
impl StorageBackend for StorageApiClient {
    #[instrument(skip(self))]
    async fn list_buckets(&self) -> BackendResult<Vec<LiveBucket>> {
        let response = self.send(self.client.get(self.url("bucket"))).await?;
        if !response.status().is_success() {
            return Err(error_from(response, "*").await);
        }

        let rows: Vec<BucketRow> = response
            .json()
            .await
            .map_err(|e| DomainError::StorageError(e.to_string()))?;
        debug!(count = rows.len(), "Listed storage buckets");

        Ok(rows
            .into_iter()
            .map(|row| LiveBucket {
                name: row.name,
                public: row.public,
                file_size_limit: row.file_size_limit,
            })
            .collect())
    }

    #[instrument(skip(self, bucket), fields(bucket = %bucket.name))]
    async fn create_bucket(&self, bucket: &BucketSpec) -> BackendResult<()> {
        let body = BucketBody {
            id: Some(&bucket.name),
            name: Some(&bucket.name),
            public: bucket.public,
            file_size_limit: bucket.file_size_limit,
            allowed_mime_types: bucket.allowed_mime_types.as_deref(),
        };
        let response = self
            .send(self.client.post(self.url("bucket")).json(&body))
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from(response, &bucket.name).await)
        }
    }

    #[instrument(skip(self, bucket), fields(bucket = %bucket.name))]
    async fn update_bucket(&self, bucket: &BucketSpec) -> BackendResult<()> {
        let body = BucketBody {
            id: None,
            name: None,
            public: bucket.public,
            file_size_limit: bucket.file_size_limit,
            allowed_mime_types: bucket.allowed_mime_types.as_deref(),
        };
        let response = self
            .send(
                self.client
                    .put(self.url(&format!("bucket/{}", bucket.name)))
                    .json(&body),
            )
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from(response, &bucket.name).await)
        }
    }
}
