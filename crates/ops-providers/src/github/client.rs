//! GitHub REST client
//!
//! Opening a migration pull request is four calls: resolve the base branch
//! head, create a branch at it, commit the file onto the branch, open the PR.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ops_core::{BackendResult, DomainError, MigrationPullRequest, PullRequest, VcsHost};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

const USER_AGENT: &str = concat!("ops-control-plane/", env!("CARGO_PKG_VERSION"));

/// GitHub repository settings
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
    /// API root, `https://api.github.com` unless on GitHub Enterprise
    pub api_url: String,
    pub timeout: Duration,
}

impl GitHubClientConfig {
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        base_branch: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            base_branch: base_branch.into(),
            api_url: "https://api.github.com".to_string(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

/// HTTP implementation of VcsHost
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubClientConfig,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
}

impl GitHubClient {
    /// Create a new GitHubClient
    pub fn new(config: GitHubClientConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DomainError::vcs("client", e.to_string()))?;
        Ok(Self { client, config })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn send(&self, step: &'static str, request: RequestBuilder) -> BackendResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| DomainError::vcs(step, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DomainError::vcs(step, format!("{status}: {body}")))
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        step: &'static str,
        request: RequestBuilder,
    ) -> BackendResult<T> {
        self.send(step, request)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::vcs(step, e.to_string()))
    }

    async fn base_sha(&self) -> BackendResult<String> {
        let url = self.repo_url(&format!("git/ref/heads/{}", self.config.base_branch));
        let head: GitRef = self.send_json("resolve_base", self.client.get(url)).await?;
        Ok(head.object.sha)
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> BackendResult<()> {
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": sha });
        self.send(
            "create_branch",
            self.client.post(self.repo_url("git/refs")).json(&body),
        )
        .await?;
        Ok(())
    }

    async fn commit_file(&self, request: &MigrationPullRequest) -> BackendResult<()> {
        let body = json!({
            "message": request.commit_message,
            "content": STANDARD.encode(request.content.as_bytes()),
            "branch": request.branch,
        });
        self.send(
            "commit_file",
            self.client
                .put(self.repo_url(&format!("contents/{}", request.file_path)))
                .json(&body),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VcsHost for GitHubClient {
    #[instrument(skip(self, request), fields(branch = %request.branch, file = %request.file_path))]
    async fn open_migration_pr(
        &self,
        request: &MigrationPullRequest,
    ) -> BackendResult<PullRequest> {
        let sha = self.base_sha().await?;
        self.create_branch(&request.branch, &sha).await?;
        self.commit_file(request).await?;

        let body = json!({
            "title": request.title,
            "head": request.branch,
            "base": self.config.base_branch,
            "body": request.body,
        });
        let pull: PullResponse = self
            .send_json("open_pull_request", self.client.post(self.repo_url("pulls")).json(&body))
            .await?;

        info!(number = pull.number, url = %pull.html_url, "Opened migration pull request");

        Ok(PullRequest {
            number: pull.number,
            url: pull.html_url,
            branch: request.branch.clone(),
        })
    }
}
