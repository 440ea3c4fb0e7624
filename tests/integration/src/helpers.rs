//! Test helpers for integration tests
//!
//! Provides a test server wired to in-memory and mocked backends, and
//! helpers for making authenticated HTTP requests against it.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ops_api::{create_app, AppState};
use ops_common::ApiToken;
use ops_providers::{
    GitHubClient, GitHubClientConfig, StaticEnvironment, StorageApiClient, StorageClientConfig,
};
use ops_service::{OpsSettings, ServiceContextBuilder};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixtures::{write_documents, MemoryDatabase, MemoryPlanStore};

/// Token every test server accepts
pub const TEST_TOKEN: &str = "integration-test-token";

/// Knobs for one test server
#[derive(Debug, Default)]
pub struct TestOptions {
    /// Environment variables visible to the auditors
    pub env: Vec<(String, String)>,
    pub allow_direct_apply: bool,
    pub persist_plans: bool,
    /// Wire a GitHub client against a mock server
    pub github: bool,
    pub database: MemoryDatabase,
}

impl TestOptions {
    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.env.push((name.to_string(), value.to_string()));
        self
    }
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub database: Arc<MemoryDatabase>,
    /// Mocked storage provider API; holds bucket `avatars` (private)
    pub storage_api: MockServer,
    /// Mocked GitHub API when requested
    pub github_api: Option<MockServer>,
    config_dir: TempDir,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default options
    pub async fn start() -> Result<Self> {
        Self::start_with(TestOptions::default()).await
    }

    /// Start a test server with custom options
    pub async fn start_with(options: TestOptions) -> Result<Self> {
        let config_dir = tempfile::tempdir()?;
        write_documents(config_dir.path())?;

        let storage_api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/bucket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "avatars", "public": false}
            ])))
            .mount(&storage_api)
            .await;

        let database = Arc::new(options.database);
        let storage = StorageApiClient::new(StorageClientConfig::new(
            storage_api.uri(),
            "service-key",
        ))?;
        let environment: StaticEnvironment = options.env.into_iter().collect();

        let mut builder = ServiceContextBuilder::new()
            .inspector(database.clone())
            .migration_runner(database.clone())
            .storage(Arc::new(storage))
            .environment(Arc::new(environment))
            .settings(OpsSettings {
                config_dir: config_dir.path().to_path_buf(),
                migrations_dir: config_dir.path().join("migrations"),
                allow_direct_apply: options.allow_direct_apply,
                persist_plans: options.persist_plans,
            });

        if options.persist_plans {
            builder = builder.plan_store(Arc::new(MemoryPlanStore::default()));
        }

        let github_api = if options.github {
            let server = MockServer::start().await;
            let client = GitHubClient::new(
                GitHubClientConfig::new("ghp_test", "acme", "platform", "main")
                    .with_api_url(server.uri()),
            )?;
            builder = builder.vcs(Arc::new(client));
            Some(server)
        } else {
            None
        };

        let state = AppState::new(builder.build()?, ApiToken::new(TEST_TOKEN));
        let app = create_app(state);

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            database,
            storage_api,
            github_api,
            config_dir,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Directory holding the documents and generated migrations
    pub fn config_dir(&self) -> &Path {
        self.config_dir.path()
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a GET request with the test token
    pub async fn get_auth(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).bearer_auth(TEST_TOKEN).send().await?)
    }

    /// Make a POST request with a JSON body and the given token
    pub async fn post_with_token<T: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &T,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// Make a POST request with the test token
    pub async fn post_auth<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        self.post_with_token(path, Some(TEST_TOKEN), body).await
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(response.json().await?)
}

/// Assert response status only
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(())
}
