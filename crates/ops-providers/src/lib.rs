//! # ops-providers
//!
//! Adapters for the live backends reached over HTTP or the process:
//! the storage provider's bucket API, GitHub for migration pull requests,
//! and environment variable sources.

pub mod environment;
pub mod github;
pub mod storage;

pub use environment::{ProcessEnvironment, StaticEnvironment};
pub use github::{GitHubClient, GitHubClientConfig};
pub use storage::{StorageApiClient, StorageClientConfig};
